//! ticketscope library crate
//!
//! Exposes the fetch/classify/aggregate pipeline so the integration tests
//! (and any embedding tooling) can drive it without going through the CLI.

pub mod classify;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod testing;
pub mod ticket;
pub mod zendesk;
