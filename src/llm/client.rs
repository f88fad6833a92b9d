//! Chat-completions transport for the configured LLM endpoint.
//!
//! One user-role message in, assistant text out. The endpoint is whatever the
//! user configured (OpenAI-compatible or a flat `content` responder), so the
//! response adapter tries the known shapes in order instead of assuming one.

use crate::error::{truncate_str, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed sampling temperature for every classification call.
pub const TEMPERATURE: f32 = 0.3;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Seam between the pipeline and the network. Production code uses
/// [`LlmClient`]; tests substitute scripted transports.
#[allow(async_fn_in_trait)]
pub trait ChatTransport {
    /// Send one user-role message and return the assistant text.
    async fn complete(&self, prompt: &str) -> Result<String, Error>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response envelope covering both known endpoint shapes.
#[derive(Deserialize)]
struct ChatResponse {
    /// OpenAI-style: `choices[0].message.content`.
    #[serde(default)]
    choices: Vec<Choice>,
    /// Flat shape: a top-level `content` string.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

/// Extract assistant text, trying the known response shapes in order.
fn extract_content(response: ChatResponse) -> Result<String, Error> {
    if let Some(choice) = response.choices.into_iter().next() {
        return Ok(choice.message.content);
    }
    if let Some(content) = response.content {
        return Ok(content);
    }
    Err(Error::Shape(
        "response carried neither choices[0].message.content nor a flat content field".to_string(),
    ))
}

/// HTTP client for the configured chat-completions endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: Option<String>,
}

impl LlmClient {
    pub fn new(endpoint: &str, api_key: &str, model: Option<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model,
        })
    }
}

impl ChatTransport for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: self.model.as_deref(),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() == 401 {
            return Err(Error::Auth(
                "LLM endpoint rejected the API key".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: truncate_str(&text, MAX_ERROR_BODY_CHARS).to_string(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Shape(format!("response was not a JSON object: {}", e)))?;
        extract_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_openai_shape() {
        let json = r#"{"choices": [{"message": {"content": "hello"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_content(response).unwrap(), "hello");
    }

    #[test]
    fn test_extract_content_flat_shape() {
        let json = r#"{"content": "hello"}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_content(response).unwrap(), "hello");
    }

    #[test]
    fn test_extract_content_prefers_choices_over_flat() {
        let json = r#"{"choices": [{"message": {"content": "from choices"}}], "content": "flat"}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_content(response).unwrap(), "from choices");
    }

    #[test]
    fn test_extract_content_unknown_shape_is_typed_error() {
        let json = r#"{"output": "something else"}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let err = extract_content(response).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: Some("gpt-4o-mini"),
            messages: vec![Message {
                role: "user",
                content: "classify this",
            }],
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"gpt-4o-mini\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"temperature\":0.3"));
    }

    #[test]
    fn test_chat_request_omits_missing_model() {
        let request = ChatRequest {
            model: None,
            messages: vec![],
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("model"));
    }
}
