use crate::invoker::AgentInvoker;
use ensemble_core::{AgentCategory, EnsembleError, EnsembleResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each agent category to its configured invoker instance.
///
/// Built once before a run starts; the orchestrator only reads it.
#[derive(Default, Clone)]
pub struct InvokerRegistry {
    invokers: HashMap<AgentCategory, Arc<dyn AgentInvoker>>,
}

impl InvokerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that routes every category to the same invoker.
    pub fn uniform(invoker: Arc<dyn AgentInvoker>) -> Self {
        let mut registry = Self::new();
        for category in AgentCategory::ALL {
            registry.invokers.insert(category, Arc::clone(&invoker));
        }
        registry
    }

    /// Install an invoker for a category, replacing any existing one.
    pub fn with_invoker(mut self, category: AgentCategory, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.invokers.insert(category, invoker);
        self
    }

    /// Look up the invoker for a category.
    pub fn get(&self, category: AgentCategory) -> EnsembleResult<Arc<dyn AgentInvoker>> {
        self.invokers
            .get(&category)
            .cloned()
            .ok_or_else(|| EnsembleError::Invoker(format!("no invoker for category: {category}")))
    }

    /// Number of registered categories.
    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    /// Whether the registry has no invokers.
    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }
}
