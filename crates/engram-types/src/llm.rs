//! LLM request/response types for Engram.
//!
//! These types model the data shapes for LLM provider interactions:
//! completion requests, structured-output configuration, usage tracking,
//! and error handling. The engine only performs blocking (non-streaming)
//! completions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request to an LLM provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Structured output configuration. When present, constrains the
    /// response to match the given JSON schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_config: Option<OutputConfig>,
}

/// Response from an LLM provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

/// Reason why the LLM stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
            StopReason::StopSequence => write!(f, "stop_sequence"),
        }
    }
}

impl FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "end_turn" => Ok(StopReason::EndTurn),
            "max_tokens" => Ok(StopReason::MaxTokens),
            "stop_sequence" => Ok(StopReason::StopSequence),
            other => Err(format!("invalid stop reason: '{other}'")),
        }
    }
}

/// Token usage for a completion request/response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Structured output configuration for a completion request.
///
/// Constrains the model's response to a JSON schema. The schema is
/// generated from a Rust type via `schemars` and tightened with
/// [`add_additional_properties_false`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// The output format block inside an [`OutputConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFormat {
    #[serde(rename = "type")]
    pub type_field: String,
    pub json_schema: OutputJsonSchema,
}

/// A named JSON schema for structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputJsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Recursively set `additionalProperties: false` on every object schema.
///
/// Strict structured output requires closed object schemas; schemars does
/// not emit the key by default. Existing `additionalProperties` values are
/// left untouched.
pub fn add_additional_properties_false(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            let is_object_schema = map.get("type").and_then(|t| t.as_str()) == Some("object")
                || map.contains_key("properties");
            if is_object_schema && !map.contains_key("additionalProperties") {
                map.insert(
                    "additionalProperties".to_string(),
                    serde_json::Value::Bool(false),
                );
            }
            for v in map.values_mut() {
                add_additional_properties_false(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr {
                add_additional_properties_false(v);
            }
        }
        _ => {}
    }
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,
}

impl LlmError {
    /// Whether a retry with backoff could plausibly succeed.
    ///
    /// Authentication failures are permanent; everything else (provider
    /// hiccups, rate limits, overload, malformed output) is transient.
    pub fn is_transient(&self) -> bool {
        !matches!(self, LlmError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
        ] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_stop_reason_roundtrip() {
        for reason in [
            StopReason::EndTurn,
            StopReason::MaxTokens,
            StopReason::StopSequence,
        ] {
            let s = reason.to_string();
            let parsed: StopReason = s.parse().unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_completion_request_skips_absent_fields() {
        let request = CompletionRequest {
            model: "test-model".to_string(),
            messages: vec![Message {
                role: MessageRole::User,
                content: "hi".to_string(),
            }],
            system: None,
            max_tokens: 100,
            temperature: None,
            output_config: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("system"));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("output_config"));
    }

    #[test]
    fn test_add_additional_properties_false_nested() {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": {
                "facts": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "text": { "type": "string" } }
                    }
                }
            }
        });
        add_additional_properties_false(&mut schema);

        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
        assert_eq!(
            schema["properties"]["facts"]["items"]["additionalProperties"],
            serde_json::json!(false)
        );
        // Non-object schemas are untouched
        assert!(
            schema["properties"]["facts"]["items"]["properties"]["text"]
                .get("additionalProperties")
                .is_none()
        );
    }

    #[test]
    fn test_add_additional_properties_false_preserves_existing() {
        let mut schema = serde_json::json!({
            "type": "object",
            "additionalProperties": true,
            "properties": {}
        });
        add_additional_properties_false(&mut schema);
        assert_eq!(schema["additionalProperties"], serde_json::json!(true));
    }

    #[test]
    fn test_llm_error_transience() {
        assert!(!LlmError::AuthenticationFailed.is_transient());
        assert!(
            LlmError::Provider {
                message: "boom".to_string()
            }
            .is_transient()
        );
        assert!(
            LlmError::RateLimited {
                retry_after_ms: Some(100)
            }
            .is_transient()
        );
        assert!(LlmError::Deserialization("bad json".to_string()).is_transient());
    }
}
