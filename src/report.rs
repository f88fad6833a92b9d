//! Aggregate views over the stored ticket set: sentiment distribution and
//! per-type frequencies. Pure functions; the CLI renders them.

use crate::ticket::{Sentiment, Ticket};
use std::collections::HashMap;

/// Sentiment distribution across a ticket set, with unclassified counted
/// separately.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unclassified: usize,
}

impl SentimentCounts {
    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative + self.unclassified
    }
}

pub fn sentiment_counts(tickets: &[Ticket]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for ticket in tickets {
        match ticket.classification.as_ref().map(|c| c.sentiment) {
            Some(Sentiment::Positive) => counts.positive += 1,
            Some(Sentiment::Neutral) => counts.neutral += 1,
            Some(Sentiment::Negative) => counts.negative += 1,
            None => counts.unclassified += 1,
        }
    }
    counts
}

/// Count how many tickets carry each type label, most frequent first.
/// Ties break alphabetically so the ordering is stable.
pub fn type_frequencies(tickets: &[Ticket]) -> Vec<(String, usize)> {
    let mut map: HashMap<&str, usize> = HashMap::new();
    for ticket in tickets {
        if let Some(c) = &ticket.classification {
            for label in &c.ticket_types {
                *map.entry(label.as_str()).or_insert(0) += 1;
            }
        }
    }
    let mut frequencies: Vec<(String, usize)> = map
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixtureApi;
    use crate::ticket::Classification;

    fn classified(id: u64, types: &[&str], sentiment: Sentiment) -> Ticket {
        let mut ticket = FixtureApi::ticket(id, "2026-01-12T10:00:00Z");
        ticket.classification = Some(Classification {
            ticket_types: types.iter().map(|s| s.to_string()).collect(),
            sentiment,
            summary: "s".to_string(),
        });
        ticket
    }

    #[test]
    fn test_sentiment_counts_include_unclassified() {
        let tickets = vec![
            classified(1, &["Billing"], Sentiment::Negative),
            classified(2, &["Bug Report"], Sentiment::Negative),
            classified(3, &["Feature Request"], Sentiment::Positive),
            FixtureApi::ticket(4, "2026-01-12T10:00:00Z"),
        ];
        let counts = sentiment_counts(&tickets);
        assert_eq!(counts.positive, 1);
        assert_eq!(counts.neutral, 0);
        assert_eq!(counts.negative, 2);
        assert_eq!(counts.unclassified, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_type_frequencies_sorted_by_count_then_name() {
        let tickets = vec![
            classified(1, &["Billing", "Bug Report"], Sentiment::Negative),
            classified(2, &["Billing"], Sentiment::Neutral),
            classified(3, &["Performance"], Sentiment::Negative),
            FixtureApi::ticket(4, "2026-01-12T10:00:00Z"),
        ];
        let frequencies = type_frequencies(&tickets);
        assert_eq!(
            frequencies,
            vec![
                ("Billing".to_string(), 2),
                ("Bug Report".to_string(), 1),
                ("Performance".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_empty_set_reports_nothing() {
        assert_eq!(sentiment_counts(&[]).total(), 0);
        assert!(type_frequencies(&[]).is_empty());
    }
}
