//! Core data model: tickets, comment threads, classifications, topic clusters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A support ticket as returned by the helpdesk API.
///
/// Fetched verbatim; the only field we ever attach locally is
/// `classification`. Unknown API fields are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// One entry in a ticket's comment thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub plain_body: Option<String>,
}

impl Comment {
    /// Comment text, preferring the rich body over the plain one.
    pub fn text(&self) -> &str {
        self.body
            .as_deref()
            .or(self.plain_body.as_deref())
            .unwrap_or("")
    }
}

/// LLM-derived judgment attached to one ticket.
///
/// Always fully populated: malformed model output is normalized into this
/// shape with fallback defaults rather than stored partially filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// 1-3 short type labels. Sets persisted before the field rename used
    /// `topics`; the alias keeps them readable, writes are always canonical.
    #[serde(alias = "topics")]
    pub ticket_types: Vec<String>,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub summary: String,
}

impl Classification {
    /// Summary text stored when the model response could not be parsed.
    pub const FALLBACK_SUMMARY: &'static str = "Summary unavailable (unparseable model response)";

    /// The record stored when model output yields no usable JSON at all.
    pub fn fallback() -> Self {
        Self {
            ticket_types: vec!["Unknown".to_string()],
            sentiment: Sentiment::Neutral,
            summary: Self::FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// Overall customer sentiment for one ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// The aggregate produced by the second-stage LLM call.
///
/// Replaced wholesale after each classification batch. `ticket_ids` inside
/// the clusters are weak references: they may point at tickets that were
/// since cleared, and are not validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topics: Vec<TopicCluster>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

/// One aggregated theme spanning multiple tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ticket_ids: Vec<u64>,
    #[serde(default)]
    pub priority: ClusterPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl ClusterPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterPriority::High => "high",
            ClusterPriority::Medium => "medium",
            ClusterPriority::Low => "low",
        }
    }
}
