//! LLM plumbing: prompt templates, the chat transport, and tolerant parsing
//! of model output back into the classification schemas.

pub mod client;
pub mod parse;
pub mod prompts;
pub mod template;
