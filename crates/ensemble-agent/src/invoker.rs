use async_trait::async_trait;
use ensemble_core::{AgentCategory, EnsembleResult};
use serde::{Deserialize, Serialize};

/// The response from one agent invocation.
///
/// Cost and token figures are whatever the underlying agent reports; the
/// orchestrator records them verbatim and never substitutes estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// The agent's output payload.
    pub output: String,
    /// Spend for this invocation, in the invoker's currency unit.
    pub cost: f64,
    /// Tokens consumed by this invocation.
    pub tokens: u64,
}

impl Invocation {
    /// Create an invocation response.
    pub fn new(output: impl Into<String>, cost: f64, tokens: u64) -> Self {
        Self {
            output: output.into(),
            cost,
            tokens,
        }
    }
}

/// Capability interface for whatever executes a task.
///
/// Implementations must be pure with respect to orchestrator state: the
/// invoker reads its inputs and produces an [`Invocation`] (or fails), with
/// side effects only through its own declared external interface.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Execute the given prompt as the specified category of agent.
    async fn invoke(&self, category: AgentCategory, prompt: &str) -> EnsembleResult<Invocation>;
}
