use crate::breaker::BreakerConfig;
use crate::cache::CacheConfig;
use crate::cost::CostConfig;
use ensemble_core::{EnsembleError, EnsembleResult};
use serde::{Deserialize, Serialize};

/// Backoff schedule for retried task attempts.
///
/// The delay before retry *n* is `backoff_base_ms * 2^n`, capped at
/// `backoff_max_ms`. The retry budget itself is per-task (`max_retries`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl RetryPolicy {
    /// A zero-delay policy, useful in tests that exercise retries.
    pub fn instant() -> Self {
        Self {
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }
}

/// Top-level orchestrator configuration.
///
/// Constructed once and passed into the orchestrator; there is no ambient
/// global configuration. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently executing tasks within a stage.
    pub max_workers: usize,
    /// Tasks with priority at or below this are critical: their failure
    /// aborts remaining stages.
    pub critical_priority: u8,
    /// A failed task with at least this many dependents also aborts
    /// remaining stages.
    pub critical_dependents: usize,
    /// Retry backoff schedule.
    pub retry: RetryPolicy,
    /// Circuit breaker tuning.
    pub breaker: BreakerConfig,
    /// Result cache tuning.
    pub cache: CacheConfig,
    /// Cost budget.
    pub cost: CostConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            critical_priority: 2,
            critical_dependents: 2,
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
            cache: CacheConfig::default(),
            cost: CostConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> EnsembleResult<Self> {
        toml::from_str(text).map_err(|e| EnsembleError::Config(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.critical_priority, 2);
        assert_eq!(config.critical_dependents, 2);
        assert_eq!(config.retry.backoff_base_ms, 1_000);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.cache.capacity, 100);
        assert!((config.cost.limit - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            max_workers = 8

            [breaker]
            failure_threshold = 5

            [cost]
            limit = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.success_threshold, 2);
        assert!((config.cost.limit - 2.5).abs() < f64::EPSILON);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = OrchestratorConfig::from_toml_str("max_workers = \"many\"").unwrap_err();
        assert!(matches!(err, EnsembleError::Config(_)));
    }

    #[test]
    fn test_instant_retry_policy_has_no_delay() {
        let policy = RetryPolicy::instant();
        assert_eq!(policy.backoff_base_ms, 0);
        assert_eq!(policy.backoff_max_ms, 0);
    }
}
