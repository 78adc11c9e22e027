//! OpenAiEmbedder -- concrete [`Embedder`] implementation over the OpenAI
//! embeddings API.
//!
//! Sends batched requests to `/v1/embeddings` (default model
//! `text-embedding-3-small`, 1536 dimensions). The response carries an
//! index per vector; output is sorted by index so it is always aligned
//! with the input order. Transient failures are retried with the same
//! bounded backoff policy the structured LLM calls use.
//!
//! [`Embedder`]: engram_core::memory::embedder::Embedder

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use engram_core::memory::embedder::Embedder;
use engram_types::config::RetryPolicy;
use engram_types::error::EmbeddingError;

/// Default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Output dimensionality of the default model.
const DEFAULT_DIMENSION: usize = 1536;

/// OpenAI embeddings client.
///
/// Does NOT derive Debug: the API key is a [`SecretString`] and the struct
/// omits Debug entirely for defense-in-depth.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedder with the default model and retry policy.
    pub fn new(api_key: SecretString, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            retry,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(EmbeddingError::AuthenticationFailed);
            }
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                message: format!("HTTP {status}: {error_body}"),
            });
        }

        let parsed: EmbeddingResponse =
            response.json().await.map_err(|e| EmbeddingError::Provider {
                message: format!("failed to parse response: {e}"),
            })?;

        collect_vectors(parsed.data, texts.len(), self.dimension)
    }
}

/// Order the response vectors by index and validate count and dimension.
fn collect_vectors(
    mut data: Vec<EmbeddingDatum>,
    requested: usize,
    expected_dim: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != requested {
        return Err(EmbeddingError::CountMismatch {
            requested,
            received: data.len(),
        });
    }

    data.sort_by_key(|d| d.index);
    let mut vectors = Vec::with_capacity(data.len());
    for datum in data {
        if datum.embedding.len() != expected_dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: expected_dim,
                received: datum.embedding.len(),
            });
        }
        vectors.push(datum.embedding);
    }
    Ok(vectors)
}

impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = EmbeddingError::Provider {
            message: "no attempts made".to_string(),
        };

        for attempt in 1..=max_attempts {
            let delay = self.retry.delay_ms(attempt);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.request(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() => {
                    tracing::warn!(attempt, error = %e, "embedding call failed, will retry");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(index: usize, embedding: Vec<f32>) -> EmbeddingDatum {
        EmbeddingDatum { index, embedding }
    }

    #[test]
    fn test_collect_vectors_restores_input_order() {
        let data = vec![
            datum(2, vec![2.0, 2.0]),
            datum(0, vec![0.0, 0.0]),
            datum(1, vec![1.0, 1.0]),
        ];
        let vectors = collect_vectors(data, 3, 2).unwrap();
        assert_eq!(vectors[0], vec![0.0, 0.0]);
        assert_eq!(vectors[1], vec![1.0, 1.0]);
        assert_eq!(vectors[2], vec![2.0, 2.0]);
    }

    #[test]
    fn test_collect_vectors_count_mismatch() {
        let data = vec![datum(0, vec![0.0, 0.0])];
        let result = collect_vectors(data, 2, 2);
        assert!(matches!(
            result,
            Err(EmbeddingError::CountMismatch {
                requested: 2,
                received: 1
            })
        ));
    }

    #[test]
    fn test_collect_vectors_dimension_mismatch() {
        let data = vec![datum(0, vec![0.0, 0.0, 0.0])];
        let result = collect_vectors(data, 1, 2);
        assert!(matches!(
            result,
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                received: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_embed_empty_input_short_circuits() {
        // No network call happens for an empty batch.
        let embedder = OpenAiEmbedder::new(
            SecretString::from("test-key-not-real"),
            RetryPolicy::default(),
        )
        .with_base_url("http://localhost:1".to_string());

        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_defaults() {
        let embedder = OpenAiEmbedder::new(
            SecretString::from("test-key-not-real"),
            RetryPolicy::default(),
        );
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
        assert_eq!(embedder.dimension(), 1536);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 0, "embedding": [0.1, 0.2]},
                {"object": "embedding", "index": 1, "embedding": [0.3, 0.4]}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1].embedding, vec![0.3, 0.4]);
    }
}
