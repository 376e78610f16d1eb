use crate::breaker::CircuitBreaker;
use crate::cache::ResultCache;
use crate::config::{OrchestratorConfig, RetryPolicy};
use crate::cost::CostController;
use crate::metrics::{ExecutionMetrics, MetricsSnapshot};
use crate::scheduler;
use ensemble_agent::{default_profiles, AgentInvoker, InvokerRegistry, ProfileSet};
use ensemble_core::{EnsembleResult, ExecutionPlan, Task, TaskError, TaskErrorKind, TaskResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Overall outcome of one plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every task succeeded.
    Completed,
    /// Execution finished or aborted with a mix of outcomes.
    Partial,
    /// Every task was dispatched and failed on its own account.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A failed task and why it failed, listed in stage-then-task order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    /// The task id.
    pub id: String,
    /// The typed failure.
    pub error: TaskError,
}

/// The synthesized outcome of one plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Overall status.
    pub status: RunStatus,
    /// Successful outputs concatenated in stage-then-task order.
    pub output: String,
    /// Per-task results, keyed by task id. Tasks in stages skipped by an
    /// early abort have no entry.
    pub results: HashMap<String, TaskResult>,
    /// Successes divided by tasks attempted (1.0 for an empty plan).
    pub success_rate: f64,
    /// Failed tasks with their errors, in stage-then-task order.
    pub failed: Vec<FailedTask>,
    /// Spend across this run, excluding cache hits.
    pub total_cost: f64,
    /// Tokens across this run, excluding cache hits.
    pub total_tokens: u64,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// Execution counters at the end of the run.
    pub metrics: MetricsSnapshot,
}

/// The composition root: schedules a plan into stages and executes each
/// stage concurrently, gating every task through the result cache, circuit
/// breaker, and cost controller, with retry and backoff around the invoker.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: InvokerRegistry,
    profiles: ProfileSet,
    cache: Arc<ResultCache>,
    breaker: Arc<CircuitBreaker>,
    cost: Arc<CostController>,
    metrics: Arc<ExecutionMetrics>,
}

impl Orchestrator {
    /// Create an orchestrator with the default invoker profiles.
    pub fn new(config: OrchestratorConfig, registry: InvokerRegistry) -> Self {
        let cache = Arc::new(ResultCache::new(&config.cache));
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        let cost = Arc::new(CostController::new(&config.cost));
        Self {
            config,
            registry,
            profiles: ProfileSet::new(default_profiles()),
            cache,
            breaker,
            cost,
            metrics: Arc::new(ExecutionMetrics::new()),
        }
    }

    /// Replace the invoker profiles.
    pub fn with_profiles(mut self, profiles: ProfileSet) -> Self {
        self.profiles = profiles;
        self
    }

    /// Replace the result cache, e.g. with one loaded from disk.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The cost controller.
    pub fn cost(&self) -> &CostController {
        &self.cost
    }

    /// The execution counters.
    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    /// Execute a plan to completion (or early abort) and synthesize the
    /// outcome.
    ///
    /// Fails fast with a structural error — duplicate ids, unknown
    /// dependency, cycle — before any task is dispatched. Everything after
    /// that point is captured per task; sibling tasks never interrupt each
    /// other.
    pub async fn execute(&self, plan: &ExecutionPlan) -> EnsembleResult<ExecutionSummary> {
        let started = Instant::now();
        let stages = scheduler::stage(&plan.tasks, plan.strategy)?;

        info!(
            tasks = plan.tasks.len(),
            stages = stages.len(),
            strategy = ?plan.strategy,
            "executing plan"
        );

        let mut dependents: HashMap<&str, usize> = HashMap::new();
        for task in &plan.tasks {
            for dep in &task.dependencies {
                *dependents.entry(dep.as_str()).or_insert(0) += 1;
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut results: HashMap<String, TaskResult> = HashMap::with_capacity(plan.tasks.len());
        let mut aborted = false;

        for (stage_idx, stage_tasks) in stages.iter().enumerate() {
            info!(stage = stage_idx + 1, tasks = stage_tasks.len(), "starting stage");

            let mut handles: Vec<(String, tokio::task::JoinHandle<TaskResult>)> = Vec::new();

            for task in stage_tasks {
                // Dependency gate first: a blocked task must not report a
                // cached success from an earlier run.
                let blocker = task
                    .dependencies
                    .iter()
                    .find(|dep| !results.get(*dep).is_some_and(|r| r.success));
                if let Some(dep) = blocker {
                    warn!(task = %task.id, dependency = %dep, "skipping task, dependency failed");
                    results.insert(
                        task.id.clone(),
                        TaskResult::failure(
                            TaskError::new(
                                TaskErrorKind::BlockedByDependency,
                                format!("dependency '{dep}' did not succeed"),
                            ),
                            0,
                        ),
                    );
                    continue;
                }

                if self.config.cache.enabled {
                    if let Some(mut hit) = self.cache.get(task) {
                        info!(task = %task.id, "cache hit");
                        self.metrics.record_cache_hit();
                        hit.from_cache = true;
                        results.insert(task.id.clone(), hit);
                        continue;
                    }
                    self.metrics.record_cache_miss();
                }

                if !self.breaker.allow(task.category) {
                    warn!(task = %task.id, category = %task.category, "skipping task, circuit open");
                    self.metrics.record_breaker_skip();
                    results.insert(
                        task.id.clone(),
                        TaskResult::failure(
                            TaskError::new(
                                TaskErrorKind::BreakerOpen,
                                format!("circuit open for category '{}'", task.category),
                            ),
                            0,
                        ),
                    );
                    continue;
                }

                if !self.cost.can_proceed() {
                    warn!(task = %task.id, "skipping task, budget exhausted");
                    self.metrics.record_budget_skip();
                    results.insert(
                        task.id.clone(),
                        TaskResult::failure(
                            TaskError::new(TaskErrorKind::BudgetExceeded, "cost limit reached"),
                            0,
                        ),
                    );
                    continue;
                }

                let invoker = match self.registry.get(task.category) {
                    Ok(invoker) => invoker,
                    Err(e) => {
                        results.insert(
                            task.id.clone(),
                            TaskResult::failure(
                                TaskError::new(TaskErrorKind::Invocation, e.to_string()),
                                0,
                            ),
                        );
                        continue;
                    }
                };

                let prompt = self.build_prompt(task, &results);
                let shared = DispatchShared {
                    breaker: Arc::clone(&self.breaker),
                    cost: Arc::clone(&self.cost),
                    cache: Arc::clone(&self.cache),
                    metrics: Arc::clone(&self.metrics),
                    semaphore: Arc::clone(&semaphore),
                    retry: self.config.retry,
                    cache_enabled: self.config.cache.enabled,
                };
                handles.push((
                    task.id.clone(),
                    tokio::spawn(dispatch(task.clone(), prompt, invoker, shared)),
                ));
            }

            // Stage barrier: wait for every in-flight task before moving on.
            for (id, handle) in handles {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!(task = %id, error = %e, "task worker terminated abnormally");
                        TaskResult::failure(
                            TaskError::new(
                                TaskErrorKind::Invocation,
                                format!("worker terminated: {e}"),
                            ),
                            0,
                        )
                    }
                };
                results.insert(id, result);
            }

            let critical_failure = stage_tasks.iter().any(|t| {
                results.get(&t.id).is_some_and(|r| !r.success)
                    && (t.priority <= self.config.critical_priority
                        || dependents.get(t.id.as_str()).copied().unwrap_or(0)
                            >= self.config.critical_dependents)
            });
            if critical_failure && stage_idx + 1 < stages.len() {
                warn!(
                    stage = stage_idx + 1,
                    "critical task failed, aborting remaining stages"
                );
                aborted = true;
                break;
            }
        }

        Ok(self.synthesize(plan, &stages, results, aborted, started))
    }

    fn build_prompt(&self, task: &Task, results: &HashMap<String, TaskResult>) -> String {
        let preamble = self.profiles.preamble_for(task.category);
        let context = build_context(task, results);

        let mut prompt = String::new();
        if !preamble.is_empty() {
            prompt.push_str(preamble);
            prompt.push_str("\n\n");
        }
        if !context.is_empty() {
            prompt.push_str("Context from completed tasks:\n");
            prompt.push_str(&context);
            prompt.push_str("\n\n");
        }
        prompt.push_str("Task: ");
        prompt.push_str(&task.description);
        prompt
    }

    fn synthesize(
        &self,
        plan: &ExecutionPlan,
        stages: &[Vec<Task>],
        results: HashMap<String, TaskResult>,
        aborted: bool,
        started: Instant,
    ) -> ExecutionSummary {
        let attempted = results.len();
        let successes = results.values().filter(|r| r.success).count();

        let blocked = results.values().any(|r| {
            r.error
                .as_ref()
                .is_some_and(|e| e.kind == TaskErrorKind::BlockedByDependency)
        });
        let status = if successes == plan.tasks.len() {
            RunStatus::Completed
        } else if successes == 0 && attempted > 0 && !aborted && !blocked {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        };

        let mut outputs: Vec<&str> = Vec::new();
        let mut failed: Vec<FailedTask> = Vec::new();
        for stage_tasks in stages {
            for task in stage_tasks {
                match results.get(&task.id) {
                    Some(r) if r.success => outputs.push(&r.output),
                    Some(r) => failed.push(FailedTask {
                        id: task.id.clone(),
                        error: r.error.clone().unwrap_or_else(|| {
                            TaskError::new(TaskErrorKind::Invocation, "unknown failure")
                        }),
                    }),
                    None => {} // stage never ran due to early abort
                }
            }
        }

        let total_cost = results
            .values()
            .filter(|r| !r.from_cache)
            .map(|r| r.cost)
            .sum();
        let total_tokens = results
            .values()
            .filter(|r| !r.from_cache)
            .map(|r| r.tokens)
            .sum();

        let summary = ExecutionSummary {
            status,
            output: outputs.join("\n\n"),
            success_rate: if attempted == 0 {
                1.0
            } else {
                successes as f64 / attempted as f64
            },
            failed,
            total_cost,
            total_tokens,
            duration_ms: started.elapsed().as_millis() as u64,
            metrics: self.metrics.snapshot(),
            results,
        };

        info!(
            status = %summary.status,
            success_rate = summary.success_rate,
            total_cost = summary.total_cost,
            duration_ms = summary.duration_ms,
            "run complete"
        );
        summary
    }
}

struct DispatchShared {
    breaker: Arc<CircuitBreaker>,
    cost: Arc<CostController>,
    cache: Arc<ResultCache>,
    metrics: Arc<ExecutionMetrics>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
    cache_enabled: bool,
}

/// Execute one task: bounded by the worker pool, timed out per attempt,
/// retried with exponential backoff, with breaker/cost/cache side effects
/// applied to the final outcome.
async fn dispatch(
    task: Task,
    prompt: String,
    invoker: Arc<dyn AgentInvoker>,
    shared: DispatchShared,
) -> TaskResult {
    let _permit = match Arc::clone(&shared.semaphore).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return TaskResult::failure(
                TaskError::new(TaskErrorKind::Invocation, "worker pool closed"),
                0,
            )
        }
    };

    // Re-check the budget now that a worker slot is held; tasks ahead in the
    // queue may have spent the rest of it.
    if !shared.cost.can_proceed() {
        shared.metrics.record_budget_skip();
        return TaskResult::failure(
            TaskError::new(TaskErrorKind::BudgetExceeded, "cost limit reached"),
            0,
        );
    }

    shared.metrics.record_dispatch();
    let started = Instant::now();
    let mut last_error = TaskError::new(TaskErrorKind::Invocation, "not attempted");

    for attempt in 0..=task.max_retries {
        match tokio::time::timeout(task.timeout(), invoker.invoke(task.category, &prompt)).await {
            Ok(Ok(invocation)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                shared.cost.add_cost(invocation.cost, task.category);
                shared.breaker.on_success(task.category);
                shared.metrics.record_success();

                let result = TaskResult::success(invocation.output, attempt + 1).with_usage(
                    invocation.cost,
                    duration_ms,
                    invocation.tokens,
                );
                if shared.cache_enabled {
                    shared.cache.put(&task, &result);
                }
                info!(task = %task.id, attempts = attempt + 1, duration_ms, "task completed");
                return result;
            }
            Ok(Err(e)) => {
                last_error = TaskError::new(TaskErrorKind::Invocation, e.to_string());
            }
            Err(_) => {
                last_error = TaskError::new(
                    TaskErrorKind::Timeout,
                    format!("attempt exceeded {}ms", task.timeout_ms),
                );
            }
        }

        if attempt < task.max_retries {
            let delay = compute_backoff(&shared.retry, attempt);
            shared.metrics.record_retry();
            info!(
                task = %task.id,
                attempt = attempt + 1,
                delay_ms = delay,
                error = %last_error,
                "retrying after backoff"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    shared.breaker.on_failure(task.category);
    shared.metrics.record_failure();
    error!(task = %task.id, error = %last_error, "task failed after all attempts");
    TaskResult::failure(last_error, task.max_retries + 1).with_usage(0.0, duration_ms, 0)
}

fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

fn build_context(task: &Task, results: &HashMap<String, TaskResult>) -> String {
    let parts: Vec<String> = task
        .dependencies
        .iter()
        .filter_map(|dep| {
            results
                .get(dep)
                .filter(|r| r.success)
                .map(|r| format!("[{dep}]: {}", truncate_output(&r.output)))
        })
        .collect();
    parts.join("\n\n")
}

// Long dependency outputs are summarized head-and-tail to keep prompts small.
fn truncate_output(output: &str) -> String {
    const LIMIT: usize = 1000;
    const HEAD: usize = 500;
    const TAIL: usize = 300;

    let total = output.chars().count();
    if total <= LIMIT {
        return output.to_string();
    }
    let head: String = output.chars().take(HEAD).collect();
    let tail: String = output.chars().skip(total - TAIL).collect();
    format!("{head}\n...[truncated]...\n{tail}")
}
