use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category of specialized agent a task is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    /// Gathers information and compiles findings.
    Research,
    /// Interprets findings and produces insights.
    Analysis,
    /// Transforms analysis into structured prose.
    Writing,
    /// Checks output for quality and consistency.
    Review,
}

impl AgentCategory {
    /// All categories, in canonical order.
    pub const ALL: [AgentCategory; 4] = [
        AgentCategory::Research,
        AgentCategory::Analysis,
        AgentCategory::Writing,
        AgentCategory::Review,
    ];
}

impl std::fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCategory::Research => write!(f, "research"),
            AgentCategory::Analysis => write!(f, "analysis"),
            AgentCategory::Writing => write!(f, "writing"),
            AgentCategory::Review => write!(f, "review"),
        }
    }
}

impl std::str::FromStr for AgentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(AgentCategory::Research),
            "analysis" => Ok(AgentCategory::Analysis),
            "writing" => Ok(AgentCategory::Writing),
            "review" => Ok(AgentCategory::Review),
            other => Err(format!("unknown agent category: {other}")),
        }
    }
}

/// One unit of work within an execution plan.
///
/// Tasks are created by the caller before a run starts and are never mutated
/// by the orchestrator; results are tracked separately, keyed by task id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within one plan.
    pub id: String,
    /// Natural-language instruction passed to the agent invoker.
    pub description: String,
    /// Which specialized invoker handles this task.
    pub category: AgentCategory,
    /// Ids of tasks that must complete successfully before this one runs.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Lower = more critical. Failures at or below the configured critical
    /// threshold abort remaining stages.
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Max wall-clock duration allowed for one execution attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Number of additional attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_priority() -> u8 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

impl Task {
    /// Create a task with default priority, timeout, and retry budget.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        category: AgentCategory,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category,
            dependencies: Vec::new(),
            priority: default_priority(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }

    /// Set the ids this task depends on.
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Set the priority (lower = more critical).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the retry budget (additional attempts after the first failure).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Why a task failed or was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// The circuit breaker for the task's category was open.
    BreakerOpen,
    /// The run's cost budget was exhausted before dispatch.
    BudgetExceeded,
    /// The agent invoker returned an error on every attempt.
    Invocation,
    /// An attempt exceeded the task's timeout on every attempt.
    Timeout,
    /// A dependency of this task failed, so it was never dispatched.
    BlockedByDependency,
}

impl std::fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskErrorKind::BreakerOpen => write!(f, "breaker_open"),
            TaskErrorKind::BudgetExceeded => write!(f, "budget_exceeded"),
            TaskErrorKind::Invocation => write!(f, "invocation_error"),
            TaskErrorKind::Timeout => write!(f, "timeout_error"),
            TaskErrorKind::BlockedByDependency => write!(f, "blocked_by_dependency"),
        }
    }
}

/// A typed per-task failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// The failure family.
    pub kind: TaskErrorKind,
    /// Human-readable detail (last invoker error, blocking dependency id, ...).
    pub message: String,
}

impl TaskError {
    /// Create a task error.
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The outcome of one task within a run.
///
/// Written exactly once by the orchestrator, then read by later stages as
/// dependency context and by the synthesis step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task produced a usable output.
    pub success: bool,
    /// Result payload on success, empty otherwise.
    pub output: String,
    /// Failure description on failure.
    pub error: Option<TaskError>,
    /// Number of attempts made (0 for tasks never dispatched).
    pub attempts: u32,
    /// Spend attributed to this task, as reported by the invoker.
    pub cost: f64,
    /// Wall-clock execution time measured by the engine.
    pub duration_ms: u64,
    /// Token usage, as reported by the invoker.
    pub tokens: u64,
    /// True when the result was served from the result cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl TaskResult {
    /// Build a successful result.
    pub fn success(output: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            attempts,
            cost: 0.0,
            duration_ms: 0,
            tokens: 0,
            from_cache: false,
        }
    }

    /// Build a failed result.
    pub fn failure(error: TaskError, attempts: u32) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error),
            attempts,
            cost: 0.0,
            duration_ms: 0,
            tokens: 0,
            from_cache: false,
        }
    }

    /// Attach resource-usage figures.
    pub fn with_usage(mut self, cost: f64, duration_ms: u64, tokens: u64) -> Self {
        self.cost = cost;
        self.duration_ms = duration_ms;
        self.tokens = tokens;
        self
    }
}

/// How the orchestrator should schedule a plan's tasks.
///
/// `Parallel` and `Hybrid` schedule identically — the dependency graph
/// already encodes all exploitable independence. `Sequential` forces one
/// task per stage, preserving dependency order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// One task at a time, in dependency order.
    Sequential,
    /// Dependency-leveled stages with intra-stage parallelism.
    Parallel,
    /// Same schedule as `Parallel`; the default hint from plan sources.
    #[default]
    Hybrid,
}

/// A set of tasks plus a strategy hint, consumed once by the orchestrator.
///
/// The orchestrator validates only structural integrity (unique ids, known
/// dependency ids, no cycles); where the plan comes from is not its concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Tasks to execute.
    pub tasks: Vec<Task>,
    /// Scheduling hint.
    #[serde(default)]
    pub strategy: ExecutionStrategy,
}

impl ExecutionPlan {
    /// Create a plan with the default (`Hybrid`) strategy.
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Override the strategy hint.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
