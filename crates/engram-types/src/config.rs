//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default similarity floor for memory search (strictly greater-than).
const DEFAULT_MIN_SIMILARITY: f32 = 0.70;

/// Default per-fact cap on similar memories.
const DEFAULT_TOP_K: usize = 3;

/// Tuning knobs for the extraction pipeline.
///
/// Loaded from `{data_dir}/config.toml`; every field has a default so a
/// missing or partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Memories with similarity at or below this value are not considered
    /// matches.
    pub min_similarity: f32,
    /// Maximum number of similar memories returned per fact.
    pub top_k: usize,
    /// Model id used for both structured calls (extraction and merge).
    pub model: String,
    /// Token ceiling per structured call.
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            top_k: DEFAULT_TOP_K,
            model: "claude-3-5-haiku-latest".to_string(),
            max_tokens: 2048,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry with exponential backoff for external calls.
///
/// Applied to both model calls and embedding calls. The delay before
/// attempt `n` (1-based) is `base_delay_ms * 2^(n-2)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay in milliseconds before the given 1-based attempt.
    ///
    /// Attempt 1 has no delay; attempt 2 waits `base_delay_ms`, attempt 3
    /// twice that, and so on.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        if attempt <= 1 {
            return 0;
        }
        self.base_delay_ms.saturating_mul(1u64 << (attempt - 2).min(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.min_similarity - 0.70).abs() < f32::EPSILON);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 500);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("top_k = 5").unwrap();
        assert_eq!(config.top_k, 5);
        assert!((config.min_similarity - 0.70).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
        };
        assert_eq!(policy.delay_ms(1), 0);
        assert_eq!(policy.delay_ms(2), 100);
        assert_eq!(policy.delay_ms(3), 200);
        assert_eq!(policy.delay_ms(4), 400);
    }
}
