use crate::invoker::{AgentInvoker, Invocation};
use async_trait::async_trait;
use ensemble_core::{AgentCategory, EnsembleError, EnsembleResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// One scripted outcome for a [`ScriptedInvoker`].
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this invocation immediately.
    Success(Invocation),
    /// Fail with an invoker error carrying this message.
    Failure(String),
    /// Sleep for the given duration, then return the invocation. Paired with
    /// a shorter task timeout this exercises the timeout path.
    Delay(Duration, Invocation),
}

/// A deterministic [`AgentInvoker`] for tests and demos.
///
/// Responses are scripted per category and consumed in order; once a
/// category's queue is drained the fallback response is used. A call counter
/// makes "the agent was never invoked" assertions possible.
pub struct ScriptedInvoker {
    script: Mutex<HashMap<AgentCategory, VecDeque<ScriptedResponse>>>,
    fallback: ScriptedResponse,
    calls: AtomicU32,
}

impl ScriptedInvoker {
    /// An invoker that answers every call with the same invocation.
    pub fn always(invocation: Invocation) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            fallback: ScriptedResponse::Success(invocation),
            calls: AtomicU32::new(0),
        }
    }

    /// An invoker that fails every call with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            fallback: ScriptedResponse::Failure(message.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue a scripted response for a category. Queued responses are
    /// consumed in order before the fallback applies.
    pub fn with_response(self, category: AgentCategory, response: ScriptedResponse) -> Self {
        self.script
            .lock()
            .entry(category)
            .or_default()
            .push_back(response);
        self
    }

    /// Total number of `invoke` calls received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self, category: AgentCategory) -> ScriptedResponse {
        let mut script = self.script.lock();
        script
            .get_mut(&category)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, category: AgentCategory, _prompt: &str) -> EnsembleResult<Invocation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_response(category) {
            ScriptedResponse::Success(invocation) => Ok(invocation),
            ScriptedResponse::Failure(message) => Err(EnsembleError::Invoker(message)),
            ScriptedResponse::Delay(duration, invocation) => {
                tokio::time::sleep(duration).await;
                Ok(invocation)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_returns_fallback() {
        let invoker = ScriptedInvoker::always(Invocation::new("steady", 0.01, 5));
        for _ in 0..3 {
            let result = invoker.invoke(AgentCategory::Research, "go").await.unwrap();
            assert_eq!(result.output, "steady");
        }
        assert_eq!(invoker.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_responses_consumed_in_order() {
        let invoker = ScriptedInvoker::always(Invocation::new("fallback", 0.0, 0))
            .with_response(
                AgentCategory::Analysis,
                ScriptedResponse::Failure("first call fails".into()),
            )
            .with_response(
                AgentCategory::Analysis,
                ScriptedResponse::Success(Invocation::new("second call", 0.02, 40)),
            );

        assert!(invoker.invoke(AgentCategory::Analysis, "p").await.is_err());
        let ok = invoker.invoke(AgentCategory::Analysis, "p").await.unwrap();
        assert_eq!(ok.output, "second call");
        // Queue drained; fallback applies.
        let third = invoker.invoke(AgentCategory::Analysis, "p").await.unwrap();
        assert_eq!(third.output, "fallback");
    }

    #[tokio::test]
    async fn test_script_is_per_category() {
        let invoker = ScriptedInvoker::always(Invocation::new("fallback", 0.0, 0)).with_response(
            AgentCategory::Review,
            ScriptedResponse::Failure("review down".into()),
        );

        // Other categories are unaffected by the review script.
        let ok = invoker.invoke(AgentCategory::Writing, "p").await.unwrap();
        assert_eq!(ok.output, "fallback");
        assert!(invoker.invoke(AgentCategory::Review, "p").await.is_err());
    }
}
