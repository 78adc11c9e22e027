//! Schema-constrained LLM calls with bounded retry.
//!
//! `StructuredClient` wraps a [`BoxLlmProvider`] and turns "prompt in,
//! typed value out" into one call: it generates a JSON schema from the
//! target type via schemars, sends it as the request's `output_config`,
//! and parses the response content.
//!
//! Transient failures (provider errors, rate limits, overload) and
//! schema-invalid output are retried with exponential backoff under a
//! [`RetryPolicy`]; the last error surfaces only after the attempt budget
//! is exhausted. Authentication failures are never retried.

use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use engram_types::config::RetryPolicy;
use engram_types::llm::{
    CompletionRequest, LlmError, Message, MessageRole, OutputConfig, OutputFormat,
    OutputJsonSchema, add_additional_properties_false,
};

use super::box_provider::BoxLlmProvider;

/// LLM client for structured (JSON-schema-constrained) calls.
pub struct StructuredClient {
    provider: BoxLlmProvider,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl StructuredClient {
    /// Create a new structured client.
    pub fn new(provider: BoxLlmProvider, model: String, max_tokens: u32, retry: RetryPolicy) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            retry,
        }
    }

    /// The name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Call the model with a system prompt and user message, constraining
    /// the output to the schema of `T`, and parse the response into `T`.
    ///
    /// Runs at temperature 0.0. Retries per the configured [`RetryPolicy`];
    /// returns the last error once attempts are exhausted.
    pub async fn call<T>(
        &self,
        schema_name: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<T, LlmError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: MessageRole::User,
                content: user_message.to_string(),
            }],
            system: Some(system_prompt.to_string()),
            max_tokens: self.max_tokens,
            temperature: Some(0.0),
            output_config: Some(output_config_for::<T>(schema_name)),
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = LlmError::Provider {
            message: "no attempts made".to_string(),
        };

        for attempt in 1..=max_attempts {
            let delay = self.retry.delay_ms(attempt);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.provider.complete(&request).await {
                Ok(response) => match serde_json::from_str::<T>(&response.content) {
                    Ok(parsed) => return Ok(parsed),
                    Err(e) => {
                        tracing::warn!(
                            schema = schema_name,
                            attempt,
                            error = %e,
                            "structured response failed to parse"
                        );
                        last_error = LlmError::Deserialization(format!(
                            "failed to parse {schema_name}: {e}"
                        ));
                    }
                },
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        schema = schema_name,
                        attempt,
                        error = %e,
                        "structured call failed, will retry"
                    );
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

/// Build an [`OutputConfig`] from the JSON schema of `T`.
fn output_config_for<T: JsonSchema>(name: &str) -> OutputConfig {
    let schema = schemars::schema_for!(T);
    let mut schema_value =
        serde_json::to_value(schema).expect("schema serialization should not fail");
    add_additional_properties_false(&mut schema_value);

    OutputConfig {
        format: OutputFormat {
            type_field: "json_schema".to_string(),
            json_schema: OutputJsonSchema {
                name: name.to_string(),
                schema: schema_value,
                strict: Some(true),
            },
        },
    }
}
