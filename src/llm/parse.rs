//! Parsing of free-form model output into the fixed classification schemas.
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences or
//! prose. The per-ticket path never fails: anything unusable collapses to the
//! fallback record so one bad response cannot abort a batch. The aggregate
//! path has no safe default and surfaces `Error::Parse` to its caller.

use crate::error::{truncate_str, Error};
use crate::ticket::{Classification, ClusterPriority, Sentiment, TopicCluster, TopicSummary};
use serde::Deserialize;
use serde_json::Value;

/// Maximum number of type labels kept per classification.
const MAX_TICKET_TYPES: usize = 3;

/// Strip markdown code fences from a response.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// Find the first syntactically balanced `{...}` span in the text.
///
/// Brace counting is string-aware so braces inside JSON string values (or in
/// surrounding prose quotes) do not unbalance the scan. A greedy
/// first-`{`-to-last-`}` match breaks on responses that contain several
/// JSON-like fragments; this does not.
fn find_balanced_object(text: &str) -> Option<&str> {
    let mut depth: i32 = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Fix common JSON issues in LLM responses: trailing commas, smart quotes,
/// stray control characters.
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();

    fixed = fixed.replace(",]", "]");
    fixed = fixed.replace(",}", "}");

    fixed = fixed.replace('\u{201C}', "\"");
    fixed = fixed.replace('\u{201D}', "\"");
    fixed = fixed.replace('\u{2018}', "'");
    fixed = fixed.replace('\u{2019}', "'");

    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Extract and parse the first balanced JSON object in a response.
fn parse_embedded_object(response: &str) -> Result<Value, Error> {
    let clean = strip_markdown_fences(response);
    let json_str = find_balanced_object(clean)
        .ok_or_else(|| Error::Parse("no JSON object found in response".to_string()))?;

    match serde_json::from_str(json_str) {
        Ok(value) => Ok(value),
        Err(initial_error) => {
            let fixed = fix_json_issues(json_str);
            serde_json::from_str(&fixed).map_err(|_| {
                Error::Parse(format!(
                    "{} (response preview: {})",
                    initial_error,
                    truncate_str(response, 200)
                ))
            })
        }
    }
}

/// Parse a per-ticket classification response.
///
/// Never fails: an unusable response yields the fallback record, and a
/// parseable object is normalized field by field so a bad sentiment string or
/// missing summary does not discard the labels the model did produce.
pub fn parse_classification(response: &str) -> Classification {
    let value = match parse_embedded_object(response) {
        Ok(value) => value,
        Err(_) => {
            eprintln!(
                "  Warning: unparseable classification response: {}",
                truncate_str(response, 120)
            );
            return Classification::fallback();
        }
    };

    let ticket_types = value
        .get("ticket_types")
        .or_else(|| value.get("topics"))
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .take(MAX_TICKET_TYPES)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let ticket_types = if ticket_types.is_empty() {
        vec!["Unknown".to_string()]
    } else {
        ticket_types
    };

    let sentiment = match value.get("sentiment").and_then(Value::as_str) {
        Some("positive") => Sentiment::Positive,
        Some("negative") => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    Classification {
        ticket_types,
        sentiment,
        summary,
    }
}

#[derive(Deserialize)]
struct TopicSummaryJson {
    topics: Vec<TopicClusterJson>,
}

#[derive(Deserialize)]
struct TopicClusterJson {
    topic: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ticket_ids: Vec<u64>,
    #[serde(default)]
    priority: String,
}

/// Parse an aggregate topic-summary response.
///
/// Unlike the per-ticket path this propagates failure: a defaulted aggregate
/// would silently overwrite real clusters, so the caller reports it instead.
pub fn parse_topic_summary(response: &str) -> Result<TopicSummary, Error> {
    let value = parse_embedded_object(response)?;
    let parsed: TopicSummaryJson = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("topic summary did not match schema: {}", e)))?;

    let topics = parsed
        .topics
        .into_iter()
        .map(|t| {
            let priority = match t.priority.as_str() {
                "high" => ClusterPriority::High,
                "low" => ClusterPriority::Low,
                _ => ClusterPriority::Medium,
            };
            TopicCluster {
                topic: t.topic,
                description: t.description,
                ticket_ids: t.ticket_ids,
                priority,
            }
        })
        .collect();

    Ok(TopicSummary {
        topics,
        generated_at: Some(chrono::Utc::now()),
    })
}
