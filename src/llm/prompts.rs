//! Built-in prompt templates. Both are user-editable; these are the defaults
//! the store falls back to (and the `prompt --reset` targets).

pub const DEFAULT_CLASSIFICATION_PROMPT: &str = r#"Analyze the following support ticket and classify it.

TICKET SUBJECT: {{ticket_subject}}

TICKET DESCRIPTION:
{{ticket_description}}

COMMENTS:
{{ticket_comments}}

Please respond with a JSON object containing:
1. "ticket_types": An array of 1-3 type labels that best describe this ticket (e.g., "Bug Report", "Feature Request", "Billing", "Technical Support", "Onboarding", "UI/UX", "Performance")
2. "sentiment": One of "positive", "negative", or "neutral" based on the overall customer sentiment
3. "summary": One sentence summarizing the ticket and its current state

Respond ONLY with the JSON object, no additional text.

Example response:
{"ticket_types": ["Bug Report", "Performance"], "sentiment": "negative", "summary": "Customer reports the dashboard loads slowly since the update; a fix is in progress."}"#;

pub const DEFAULT_AGGREGATION_PROMPT: &str = r#"You are reviewing one-line summaries of every classified support ticket from the last few weeks.

TICKET SUMMARIES:
{{ticket_summaries}}

Group these tickets into the major recurring topics. Respond with a JSON object containing:
1. "topics": An array of topic clusters, most significant first. Each cluster has:
   - "topic": A short name for the theme
   - "description": 1-2 sentences describing what these tickets have in common
   - "ticket_ids": The ticket numbers belonging to this cluster
   - "priority": "high", "medium", or "low" based on customer impact and sentiment

Respond ONLY with the JSON object, no additional text.

Example response:
{"topics": [{"topic": "Checkout Failures", "description": "Multiple customers cannot complete payment since Tuesday.", "ticket_ids": [101, 104, 109], "priority": "high"}]}"#;
