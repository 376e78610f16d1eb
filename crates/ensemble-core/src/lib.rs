//! Core types and error definitions for the Ensemble orchestration framework.
//!
//! This crate provides the foundational types shared across all Ensemble
//! crates: the task data model, execution plans, per-task results, and the
//! unified error enum.
//!
//! # Main types
//!
//! - [`EnsembleError`] — Unified error enum for fatal, pre-execution failures.
//! - [`EnsembleResult`] — Convenience alias for `Result<T, EnsembleError>`.
//! - [`Task`] — Immutable description of one unit of work.
//! - [`TaskResult`] — Outcome of one task within a run, success or failure.
//! - [`ExecutionPlan`] — A set of tasks plus a scheduling strategy hint.
//! - [`AgentCategory`] — The closed set of specialized agent kinds.
//!
//! Per-task failures during a run are regular data ([`TaskResult`] with a
//! typed [`TaskError`]), not `Err` values: only structural problems that
//! prevent a run from starting at all surface through [`EnsembleError`].

/// Task data model: tasks, results, plans, and agent categories.
pub mod task;

pub use task::{
    AgentCategory, ExecutionPlan, ExecutionStrategy, Task, TaskError, TaskErrorKind, TaskResult,
};

// --- Error types ---

/// Top-level error type for the Ensemble framework.
///
/// These are fatal errors: an `Err` of this type means the run (or the
/// operation) could not proceed at all. Failures of individual tasks are
/// captured in [`TaskResult`] instead and never abort sibling tasks.
#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    /// The task graph contains a dependency cycle.
    #[error("Dependency cycle: {0}")]
    Cycle(String),

    /// A task depends on an id that does not exist in the plan.
    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),

    /// Two tasks in the same plan share an id.
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error raised by an agent invoker, or a category with no invoker.
    #[error("Invoker error: {0}")]
    Invoker(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`EnsembleError`].
pub type EnsembleResult<T> = Result<T, EnsembleError>;
