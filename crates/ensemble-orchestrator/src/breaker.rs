use ensemble_core::AgentCategory;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that trip a closed circuit open.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long an open circuit blocks dispatch before probing again.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive half-open successes required to close the circuit.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            timeout_ms: default_timeout_ms(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl BreakerConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Observable state of one category's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Dispatch allowed; failures are being counted.
    Closed,
    /// Dispatch blocked until the cooldown elapses.
    Open,
    /// Cooldown elapsed; probing requests are allowed through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct CategoryRecord {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

impl Default for CategoryRecord {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
        }
    }
}

/// Per-category fault tracker that stops dispatching work to a repeatedly
/// failing category until a cooldown elapses.
///
/// All transitions for a category serialize through one mutex guarding the
/// whole record map; the critical sections never await.
pub struct CircuitBreaker {
    config: BreakerConfig,
    records: Mutex<HashMap<AgentCategory, CategoryRecord>>,
}

impl CircuitBreaker {
    /// Create a breaker with the given tuning.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Whether dispatch to this category is currently permitted.
    ///
    /// An open circuit whose cooldown has elapsed transitions to half-open
    /// here, and this probing call is the one let through.
    pub fn allow(&self, category: AgentCategory) -> bool {
        let mut records = self.records.lock();
        let record = records.entry(category).or_default();

        match record.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = record
                    .last_failure
                    .is_some_and(|at| at.elapsed() > self.config.timeout());
                if cooled_down {
                    record.state = CircuitState::HalfOpen;
                    record.success_count = 0;
                    info!(category = %category, "circuit half-open, probing");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful dispatch outcome for this category.
    pub fn on_success(&self, category: AgentCategory) {
        let mut records = self.records.lock();
        let record = records.entry(category).or_default();

        match record.state {
            CircuitState::HalfOpen => {
                record.success_count += 1;
                if record.success_count >= self.config.success_threshold {
                    record.state = CircuitState::Closed;
                    record.failure_count = 0;
                    info!(category = %category, "circuit closed");
                }
            }
            CircuitState::Closed => {
                record.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed dispatch outcome for this category.
    pub fn on_failure(&self, category: AgentCategory) {
        let mut records = self.records.lock();
        let record = records.entry(category).or_default();

        match record.state {
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                record.last_failure = Some(Instant::now());
                warn!(category = %category, "circuit re-opened from half-open");
            }
            CircuitState::Closed => {
                record.failure_count += 1;
                if record.failure_count >= self.config.failure_threshold {
                    record.state = CircuitState::Open;
                    record.last_failure = Some(Instant::now());
                    warn!(
                        category = %category,
                        failures = record.failure_count,
                        "circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Snapshot of a category's current state (closed for unseen categories).
    pub fn state(&self, category: AgentCategory) -> CircuitState {
        self.records
            .lock()
            .get(&category)
            .map(|r| r.state)
            .unwrap_or(CircuitState::Closed)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
