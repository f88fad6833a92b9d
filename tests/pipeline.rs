//! End-to-end pipeline tests: fetch through a fixture API, classify through a
//! scripted transport, aggregate, and read the results back from the store.

use chrono::NaiveDate;
use std::time::Duration;
use ticketscope::error::Error;
use ticketscope::pipeline::{self, BatchProgress};
use ticketscope::store::{MemoryKvStore, TicketStore};
use ticketscope::testing::{FixtureApi, RecordingSleep, ScriptedTransport};
use ticketscope::ticket::{ClusterPriority, Sentiment};
use ticketscope::zendesk;

/// The twelve-ticket fixture the local mock helpdesk serves, ids 1..=12 with
/// one creation date per day counting back from 2026-01-15.
fn mock_helpdesk() -> FixtureApi {
    let dates = [
        "2026-01-15T09:23:00Z",
        "2026-01-14T11:45:00Z",
        "2026-01-13T08:15:00Z",
        "2026-01-12T14:30:00Z",
        "2026-01-11T07:20:00Z",
        "2026-01-10T10:00:00Z",
        "2026-01-09T13:45:00Z",
        "2026-01-08T09:30:00Z",
        "2026-01-07T15:00:00Z",
        "2026-01-06T11:20:00Z",
        "2026-01-05T14:10:00Z",
        "2026-01-04T16:45:00Z",
    ];
    let tickets = dates
        .iter()
        .enumerate()
        .map(|(i, created_at)| FixtureApi::ticket(i as u64 + 1, created_at))
        .collect();
    FixtureApi::with_tickets(tickets)
        .with_comments(1, 3)
        .with_comments(2, 1)
}

#[tokio::test]
async fn fetch_filters_by_cutoff_date() {
    let api = mock_helpdesk();
    let cutoff = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();

    let tickets = zendesk::fetch_since(&api, cutoff).await.unwrap();

    // Tickets created on the cutoff day itself are included.
    assert_eq!(tickets.len(), 6);
    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(tickets[0].comments.len(), 3);
    assert_eq!(tickets[1].comments.len(), 1);
    assert!(tickets[2].comments.is_empty());
}

#[tokio::test]
async fn fetch_classify_aggregate_roundtrip() {
    // Fetch two tickets through the API seam.
    let api = FixtureApi::with_tickets(vec![
        FixtureApi::ticket(1, "2026-01-15T09:23:00Z"),
        FixtureApi::ticket(2, "2026-01-14T11:45:00Z"),
    ])
    .with_comments(1, 2);
    let cutoff = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
    let fetched = zendesk::fetch_since(&api, cutoff).await.unwrap();
    assert_eq!(fetched.len(), 2);

    let mut store = TicketStore::load(MemoryKvStore::new());
    store.replace_all(fetched);
    store.persist().unwrap();

    // Two classification calls, then one aggregation call.
    let transport = ScriptedTransport::new(vec![
        Ok(r#"{"ticket_types": ["Bug Report"], "sentiment": "negative", "summary": "Export is broken since the update."}"#.to_string()),
        Ok(r#"{"ticket_types": ["Feature Request"], "sentiment": "positive", "summary": "Customer asks for CSV export and likes the product."}"#.to_string()),
        Ok(r#"{"topics": [{"topic": "Export", "description": "Both tickets concern the export feature.", "ticket_ids": [1, 2], "priority": "high"}]}"#.to_string()),
    ]);
    let sleeper = RecordingSleep::new();
    let mut progress: Vec<BatchProgress> = Vec::new();

    let (outcome, summary) =
        pipeline::classify_and_summarize(&transport, &mut store, &sleeper, |p| progress.push(p))
            .await
            .unwrap();

    assert_eq!(outcome.classified, 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(transport.calls(), 3);

    // One pause between the two tickets, none before aggregation.
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(200)]);
    assert_eq!(progress.last().map(|p| p.percent), Some(100));

    let sentiments: Vec<Sentiment> = store
        .tickets()
        .iter()
        .map(|t| t.classification.as_ref().unwrap().sentiment)
        .collect();
    assert_eq!(sentiments, vec![Sentiment::Negative, Sentiment::Positive]);

    let summary = summary.unwrap();
    assert_eq!(summary.topics.len(), 1);
    assert_eq!(summary.topics[0].ticket_ids, vec![1, 2]);
    assert_eq!(summary.topics[0].priority, ClusterPriority::High);

    // Everything survives a reload from the same backing store.
    let reloaded = TicketStore::load(store.into_kv());
    assert_eq!(reloaded.tickets().len(), 2);
    assert!(reloaded.tickets().iter().all(|t| t.classification.is_some()));
    let stored_summary = reloaded.topic_summary().unwrap();
    assert_eq!(stored_summary.topics[0].topic, "Export");
    assert!(stored_summary.generated_at.is_some());
}

#[tokio::test]
async fn unparseable_classification_becomes_fallback_not_failure() {
    let mut store = TicketStore::load(MemoryKvStore::new());
    store.replace_all(vec![FixtureApi::ticket(1, "2026-01-15T09:23:00Z")]);

    let transport = ScriptedTransport::new(vec![Ok(
        "I'm sorry, I can't produce JSON for that.".to_string()
    )]);
    let outcome = pipeline::run_batch(&transport, &mut store, &RecordingSleep::new(), |_| {})
        .await
        .unwrap();

    // The ticket still counts as classified, just with the fallback record.
    assert_eq!(outcome.classified, 1);
    let c = store.tickets()[0].classification.as_ref().unwrap();
    assert_eq!(c.ticket_types, vec!["Unknown"]);
    assert_eq!(c.sentiment, Sentiment::Neutral);
}

#[tokio::test]
async fn refetch_replaces_prior_classifications() {
    let mut store = TicketStore::load(MemoryKvStore::new());
    store.replace_all(vec![FixtureApi::ticket(1, "2026-01-15T09:23:00Z")]);

    let transport = ScriptedTransport::new(vec![Ok(
        r#"{"ticket_types": ["Billing"], "sentiment": "neutral", "summary": "s"}"#.to_string(),
    )]);
    pipeline::run_batch(&transport, &mut store, &RecordingSleep::new(), |_| {})
        .await
        .unwrap();
    assert!(store.tickets()[0].classification.is_some());

    let api = mock_helpdesk();
    let cutoff = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    let fresh = zendesk::fetch_since(&api, cutoff).await.unwrap();
    store.replace_all(fresh);
    store.persist().unwrap();

    assert_eq!(store.tickets().len(), 2);
    assert!(store.tickets().iter().all(|t| t.classification.is_none()));
}

#[tokio::test]
async fn unauthorized_fetch_surfaces_auth_error() {
    let api = FixtureApi::unauthorized();
    let cutoff = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
    let err = zendesk::fetch_since(&api, cutoff).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}
