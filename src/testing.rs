//! Test doubles for the pipeline seams.
//!
//! Kept in the library (not `#[cfg(test)]`) so both unit tests and the
//! integration suite can drive the pipeline without a network.

use crate::error::Error;
use crate::llm::client::ChatTransport;
use crate::pipeline::Sleep;
use crate::ticket::{Comment, Ticket};
use crate::zendesk::TicketApi;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Chat transport that replays a scripted list of responses in order.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<String, Error>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<String, Error>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt seen, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatTransport for ScriptedTransport {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("scripted transport exhausted".to_string())))
    }
}

/// Sleeper that records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleep {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleep for RecordingSleep {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Fixture-backed ticket API mirroring the mock helpdesk server: filters by
/// `created_after` and serves canned comment threads.
#[derive(Default)]
pub struct FixtureApi {
    tickets: Vec<Ticket>,
    comments: HashMap<u64, Vec<Comment>>,
    failing_comment_ids: HashSet<u64>,
    unauthorized: bool,
}

impl FixtureApi {
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            ..Self::default()
        }
    }

    /// An API that rejects every request with a 401-equivalent.
    pub fn unauthorized() -> Self {
        Self {
            unauthorized: true,
            ..Self::default()
        }
    }

    /// Serve `count` canned comments for the given ticket.
    pub fn with_comments(mut self, ticket_id: u64, count: usize) -> Self {
        let comments = (0..count)
            .map(|i| Comment {
                author_id: 200 + i as u64,
                created_at: Utc::now(),
                body: Some(format!("Comment {} on ticket {}", i + 1, ticket_id)),
                plain_body: None,
            })
            .collect();
        self.comments.insert(ticket_id, comments);
        self
    }

    /// Make the comment-thread fetch fail for the given ticket.
    pub fn failing_comments_for(mut self, ticket_id: u64) -> Self {
        self.failing_comment_ids.insert(ticket_id);
        self
    }

    /// Minimal ticket with a fixed RFC 3339 creation time.
    pub fn ticket(id: u64, created_at: &str) -> Ticket {
        Ticket {
            id,
            subject: format!("Ticket {}", id),
            description: format!("Description of ticket {}", id),
            status: "open".to_string(),
            priority: Some("normal".to_string()),
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .expect("fixture created_at must be RFC 3339"),
            comments: Vec::new(),
            classification: None,
        }
    }
}

impl TicketApi for FixtureApi {
    async fn list_tickets(&self, created_after: NaiveDate) -> Result<Vec<Ticket>, Error> {
        if self.unauthorized {
            return Err(Error::Auth("fixture rejects all credentials".to_string()));
        }
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.created_at.date_naive() >= created_after)
            .cloned()
            .collect())
    }

    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<Comment>, Error> {
        if self.unauthorized {
            return Err(Error::Auth("fixture rejects all credentials".to_string()));
        }
        if self.failing_comment_ids.contains(&ticket_id) {
            return Err(Error::Http {
                status: 500,
                body: "fixture comment failure".to_string(),
            });
        }
        Ok(self.comments.get(&ticket_id).cloned().unwrap_or_default())
    }
}
