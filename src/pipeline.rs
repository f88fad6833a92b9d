//! Batch classification and topic aggregation.
//!
//! The runner walks the stored ticket set sequentially, one LLM call per
//! ticket, pacing requests to stay under the provider's rate limit. A ticket
//! whose call fails keeps `classification: None`; the batch continues.
//! Aggregation then condenses the per-ticket summaries into topic clusters.

use crate::classify;
use crate::error::Error;
use crate::llm::client::ChatTransport;
use crate::llm::{parse, template};
use crate::store::{KvStore, TicketStore};
use crate::ticket::{Ticket, TopicSummary};
use anyhow::Result;
use std::time::Duration;

/// Maximum LLM requests per second during a batch.
pub const RATE_LIMIT_PER_SEC: u64 = 5;

/// Pause inserted between consecutive classification requests.
pub const INTER_REQUEST_DELAY: Duration = Duration::from_millis(1000 / RATE_LIMIT_PER_SEC);

/// Clock seam so tests can observe pacing without waiting it out.
#[allow(async_fn_in_trait)]
pub trait Sleep {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleep;

impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Progress of a running batch, reported after each ticket completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based index of the ticket just processed.
    pub index: usize,
    pub total: usize,
    /// Whole-number percentage, rounded.
    pub percent: u8,
}

impl BatchProgress {
    fn new(index: usize, total: usize) -> Self {
        let percent = ((index as f64 / total as f64) * 100.0).round() as u8;
        Self {
            index,
            total,
            percent,
        }
    }
}

/// Tally of a completed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub classified: usize,
    pub failed: usize,
}

/// Classify every stored ticket, in order, persisting the results once at the
/// end. Holds the store's batch slot for the duration; a concurrent batch
/// against the same store fails fast with [`Error::BatchInProgress`].
pub async fn run_batch<T, K, S, F>(
    transport: &T,
    store: &mut TicketStore<K>,
    sleeper: &S,
    mut on_progress: F,
) -> Result<BatchOutcome>
where
    T: ChatTransport,
    K: KvStore,
    S: Sleep,
    F: FnMut(BatchProgress),
{
    let _guard = store.begin_batch()?;
    let prompt_template = store.classification_prompt();
    let total = store.tickets().len();
    let mut outcome = BatchOutcome::default();

    for i in 0..total {
        // Clone out of the store so the mutable write below cannot alias the
        // ticket being classified.
        let ticket = store.tickets()[i].clone();
        match classify::classify(transport, &ticket, &prompt_template).await {
            Ok(classification) => {
                store.tickets_mut()[i].classification = Some(classification);
                outcome.classified += 1;
            }
            Err(err) => {
                eprintln!("  Warning: failed to classify ticket {}: {}", ticket.id, err);
                outcome.failed += 1;
            }
        }
        on_progress(BatchProgress::new(i + 1, total));

        if i + 1 < total {
            sleeper.sleep(INTER_REQUEST_DELAY).await;
        }
    }

    store.persist()?;
    Ok(outcome)
}

/// Render the classified tickets as one summary line each, the form the
/// aggregation prompt consumes. Tickets without a usable summary are skipped.
pub fn summaries_block(tickets: &[Ticket]) -> String {
    tickets
        .iter()
        .filter_map(|t| {
            let c = t.classification.as_ref()?;
            if c.summary.is_empty() {
                return None;
            }
            Some(format!(
                "[Ticket #{}] {} (Sentiment: {}, Types: {})",
                t.id,
                c.summary,
                c.sentiment.as_str(),
                c.ticket_types.join(", ")
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the aggregation call over whatever classified summaries exist.
///
/// Returns `Ok(None)` without touching the LLM when nothing has been
/// classified yet. A successful summary is persisted before returning.
pub async fn aggregate<T, K>(
    transport: &T,
    store: &mut TicketStore<K>,
) -> Result<Option<TopicSummary>>
where
    T: ChatTransport,
    K: KvStore,
{
    let block = summaries_block(store.tickets());
    if block.is_empty() {
        return Ok(None);
    }

    let prompt = template::render(
        &store.aggregation_prompt(),
        &[("ticket_summaries", block.as_str())],
    );
    let content = transport.complete(&prompt).await?;
    let summary = parse::parse_topic_summary(&content)?;
    store.save_topic_summary(&summary)?;
    Ok(Some(summary))
}

/// Full pipeline: classify the batch, then aggregate.
///
/// An aggregation failure is reported but never discards the classification
/// work, which has already been persisted by the batch runner.
pub async fn classify_and_summarize<T, K, S, F>(
    transport: &T,
    store: &mut TicketStore<K>,
    sleeper: &S,
    on_progress: F,
) -> Result<(BatchOutcome, Option<TopicSummary>)>
where
    T: ChatTransport,
    K: KvStore,
    S: Sleep,
    F: FnMut(BatchProgress),
{
    let outcome = run_batch(transport, store, sleeper, on_progress).await?;
    let summary = match aggregate(transport, store).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("  Warning: topic aggregation failed: {}", err);
            None
        }
    };
    Ok((outcome, summary))
}
