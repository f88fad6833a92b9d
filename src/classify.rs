//! Single-ticket classification: prompt assembly, one LLM call, tolerant parse.

use crate::error::Error;
use crate::llm::client::ChatTransport;
use crate::llm::{parse, template};
use crate::ticket::{Classification, Ticket};

/// Value substituted for `{{ticket_comments}}` when a ticket has no thread.
const NO_COMMENTS: &str = "No comments";

/// Concatenate a ticket's comment thread as `[timestamp] body` blocks
/// separated by blank lines.
fn comments_text(ticket: &Ticket) -> String {
    let joined = ticket
        .comments
        .iter()
        .map(|c| format!("[{}] {}", c.created_at.to_rfc3339(), c.text()))
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.is_empty() {
        NO_COMMENTS.to_string()
    } else {
        joined
    }
}

/// Classify one ticket through the given transport.
///
/// Fails on transport or HTTP problems; malformed model *content* instead
/// comes back as the parser's fallback record. Attaching the result to the
/// ticket is the caller's job.
pub async fn classify<T: ChatTransport>(
    transport: &T,
    ticket: &Ticket,
    prompt_template: &str,
) -> Result<Classification, Error> {
    let comments = comments_text(ticket);
    let prompt = template::render(
        prompt_template,
        &[
            ("ticket_subject", ticket.subject.as_str()),
            ("ticket_description", ticket.description.as_str()),
            ("ticket_comments", comments.as_str()),
        ],
    );

    let content = transport.complete(&prompt).await?;
    Ok(parse::parse_classification(&content))
}
