use ensemble_core::AgentCategory;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Cost budget tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Run budget; dispatch is vetoed once cumulative spend reaches it.
    #[serde(default = "default_limit")]
    pub limit: f64,
}

fn default_limit() -> f64 {
    1.0
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    current: f64,
    charges: u64,
    by_category: HashMap<AgentCategory, f64>,
}

/// Snapshot of spend against the budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cumulative spend so far.
    pub total: f64,
    /// Budget left, clamped at zero.
    pub remaining: f64,
    /// Spend attributed to each category.
    pub by_category: HashMap<AgentCategory, f64>,
    /// Mean spend per charged task.
    pub average_per_task: f64,
}

/// Tracks cumulative spend against a budget and vetoes dispatch once the
/// budget is exhausted.
///
/// This is a soft budget: `can_proceed` is a point-in-time check, not a
/// reservation, so concurrent tasks that both pass it before either records
/// its cost may overshoot by up to one task's spend each.
pub struct CostController {
    limit: f64,
    ledger: Mutex<Ledger>,
}

impl CostController {
    /// Create a controller with the given budget.
    pub fn new(config: &CostConfig) -> Self {
        Self {
            limit: config.limit,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Whether spend is still below the budget.
    pub fn can_proceed(&self) -> bool {
        self.ledger.lock().current < self.limit
    }

    /// Record spend for a category. Monotonic within a run.
    pub fn add_cost(&self, amount: f64, category: AgentCategory) {
        let mut ledger = self.ledger.lock();
        ledger.current += amount;
        ledger.charges += 1;
        *ledger.by_category.entry(category).or_insert(0.0) += amount;

        if ledger.current >= self.limit {
            warn!(
                spent = ledger.current,
                limit = self.limit,
                "cost budget exhausted"
            );
        }
    }

    /// Cumulative spend so far.
    pub fn current(&self) -> f64 {
        self.ledger.lock().current
    }

    /// Budget left, clamped at zero.
    pub fn remaining(&self) -> f64 {
        (self.limit - self.ledger.lock().current).max(0.0)
    }

    /// Detailed spend snapshot.
    pub fn breakdown(&self) -> CostBreakdown {
        let ledger = self.ledger.lock();
        CostBreakdown {
            total: ledger.current,
            remaining: (self.limit - ledger.current).max(0.0),
            by_category: ledger.by_category.clone(),
            average_per_task: if ledger.charges > 0 {
                ledger.current / ledger.charges as f64
            } else {
                0.0
            },
        }
    }
}
