//! Helpdesk API client: recent tickets and their comment threads.
//!
//! Fetching is independent of classification. The cutoff date travels as
//! `created_after=YYYY-MM-DD`; comment threads are pulled one ticket at a
//! time, and a single failed thread degrades to an empty comment list instead
//! of failing the whole fetch.

use crate::error::{truncate_str, Error};
use crate::ticket::{Comment, Ticket};
use base64::Engine as _;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const API_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Seam between the fetch logic and the wire. Production code uses
/// [`ZendeskClient`]; tests substitute fixture-backed implementations.
#[allow(async_fn_in_trait)]
pub trait TicketApi {
    /// List tickets created on or after the given date, without comments.
    async fn list_tickets(&self, created_after: NaiveDate) -> Result<Vec<Ticket>, Error>;

    /// Fetch the full comment thread for one ticket.
    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<Comment>, Error>;
}

/// Resolve the API base URL from the configured subdomain value.
///
/// An explicit `http(s)://` origin is used verbatim (mock-server support),
/// an empty value points at the local mock, anything else is treated as a
/// `*.zendesk.com` subdomain.
pub fn base_url(subdomain: &str) -> String {
    let trimmed = subdomain.trim();
    if trimmed.is_empty() || trimmed == "localhost" {
        return "http://localhost:3001".to_string();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        if let Ok(parsed) = url::Url::parse(trimmed) {
            return parsed.as_str().trim_end_matches('/').to_string();
        }
        return trimmed.trim_end_matches('/').to_string();
    }
    format!("https://{}.zendesk.com", trimmed)
}

/// Build the Basic auth payload for API-token authentication:
/// `base64(email/token:apiToken)`, per the upstream convention.
pub fn token_auth_header(email: &str, api_token: &str) -> String {
    let credentials = base64::engine::general_purpose::STANDARD
        .encode(format!("{}/token:{}", email, api_token));
    format!("Basic {}", credentials)
}

#[derive(Deserialize)]
struct TicketsEnvelope {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    #[serde(default)]
    comments: Vec<Comment>,
}

/// HTTP client for a Zendesk-compatible ticketing API.
pub struct ZendeskClient {
    http: reqwest::Client,
    base: String,
    auth_header: String,
}

impl ZendeskClient {
    pub fn new(subdomain: &str, email: &str, api_token: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            http,
            base: base_url(subdomain),
            auth_header: token_auth_header(email, api_token),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let response = self
            .http
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() == 401 {
            return Err(Error::Auth(
                "helpdesk rejected the credentials; check email and API token".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: truncate_str(&text, MAX_ERROR_BODY_CHARS).to_string(),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| Error::Shape(format!("unexpected helpdesk response: {}", e)))
    }
}

impl TicketApi for ZendeskClient {
    async fn list_tickets(&self, created_after: NaiveDate) -> Result<Vec<Ticket>, Error> {
        let url = format!(
            "{}/api/v2/tickets.json?created_after={}",
            self.base,
            created_after.format("%Y-%m-%d")
        );
        let envelope: TicketsEnvelope = self.get_json(&url).await?;
        Ok(envelope.tickets)
    }

    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<Comment>, Error> {
        let url = format!("{}/api/v2/tickets/{}/comments.json", self.base, ticket_id);
        let envelope: CommentsEnvelope = self.get_json(&url).await?;
        Ok(envelope.comments)
    }
}

/// Fetch tickets from the lookback window with comment threads embedded.
pub async fn fetch_recent<A: TicketApi>(api: &A, lookback_days: i64) -> Result<Vec<Ticket>, Error> {
    let cutoff = (Utc::now() - ChronoDuration::days(lookback_days)).date_naive();
    fetch_since(api, cutoff).await
}

/// Fetch tickets created on or after `cutoff`, then each comment thread in
/// turn. A failed thread is logged and leaves that ticket with no comments.
pub async fn fetch_since<A: TicketApi>(api: &A, cutoff: NaiveDate) -> Result<Vec<Ticket>, Error> {
    let mut tickets = api.list_tickets(cutoff).await?;
    for ticket in &mut tickets {
        match api.list_comments(ticket.id).await {
            Ok(comments) => ticket.comments = comments,
            Err(err) => {
                eprintln!(
                    "  Warning: failed to fetch comments for ticket {}: {}",
                    ticket.id, err
                );
                ticket.comments = Vec::new();
            }
        }
    }
    Ok(tickets)
}
