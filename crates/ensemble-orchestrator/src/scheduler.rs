use ensemble_core::{EnsembleError, EnsembleResult, ExecutionStrategy, Task};
use std::collections::HashSet;

/// Order tasks into execution stages.
///
/// A task is assigned to stage *n* exactly when all of its dependencies are
/// assigned to stages before *n*; tasks within one stage have no dependency
/// relationship and may run concurrently. Within a stage, tasks are ordered
/// by ascending priority, then id, so schedules are reproducible.
///
/// The `Sequential` strategy flattens the leveled stages into one task per
/// stage, preserving dependency order; `Parallel` and `Hybrid` schedule
/// identically since the dependency graph already encodes independence.
///
/// Fails before any execution on duplicate ids, dependencies on unknown
/// ids, or cycles (a self-dependency is a cycle of length one).
pub fn stage(tasks: &[Task], strategy: ExecutionStrategy) -> EnsembleResult<Vec<Vec<Task>>> {
    validate(tasks)?;

    let mut stages: Vec<Vec<Task>> = Vec::new();
    let mut staged: HashSet<String> = HashSet::with_capacity(tasks.len());

    while staged.len() < tasks.len() {
        let mut current: Vec<Task> = tasks
            .iter()
            .filter(|t| !staged.contains(&t.id))
            .filter(|t| t.dependencies.iter().all(|d| staged.contains(d)))
            .cloned()
            .collect();

        if current.is_empty() {
            // No progress with all ids known means a dependency cycle.
            let mut stuck: Vec<&str> = tasks
                .iter()
                .filter(|t| !staged.contains(&t.id))
                .map(|t| t.id.as_str())
                .collect();
            stuck.sort_unstable();
            return Err(EnsembleError::Cycle(format!(
                "tasks cannot be ordered: {}",
                stuck.join(", ")
            )));
        }

        current.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        for task in &current {
            staged.insert(task.id.clone());
        }
        stages.push(current);
    }

    if strategy == ExecutionStrategy::Sequential {
        stages = stages
            .into_iter()
            .flatten()
            .map(|t| vec![t])
            .collect();
    }

    Ok(stages)
}

fn validate(tasks: &[Task]) -> EnsembleResult<()> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !ids.insert(&task.id) {
            return Err(EnsembleError::DuplicateTask(task.id.clone()));
        }
    }
    for task in tasks {
        for dep in &task.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(EnsembleError::InvalidDependency(format!(
                    "task '{}' depends on unknown id '{}'",
                    task.id, dep
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::AgentCategory;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task::new(id, format!("work on {id}"), AgentCategory::Research)
            .with_dependencies(deps.iter().map(|d| (*d).to_string()).collect())
    }

    #[test]
    fn test_empty_plan_yields_no_stages() {
        let stages = stage(&[], ExecutionStrategy::Hybrid).unwrap();
        assert!(stages.is_empty());
    }

    #[test]
    fn test_independent_tasks_share_one_stage() {
        let tasks = vec![task("a", &[]), task("b", &[]), task("c", &[])];
        let stages = stage(&tasks, ExecutionStrategy::Hybrid).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].len(), 3);
    }

    #[test]
    fn test_stage_index_strictly_above_dependencies() {
        // Diamond: a -> {b, c} -> d
        let tasks = vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ];
        let stages = stage(&tasks, ExecutionStrategy::Hybrid).unwrap();
        assert_eq!(stages.len(), 3);

        let stage_of = |id: &str| {
            stages
                .iter()
                .position(|s| s.iter().any(|t| t.id == id))
                .unwrap()
        };
        for t in &tasks {
            for dep in &t.dependencies {
                assert!(stage_of(&t.id) > stage_of(dep), "{} must follow {dep}", t.id);
            }
        }
    }

    #[test]
    fn test_ties_broken_by_priority_then_id() {
        let tasks = vec![
            task("zeta", &[]).with_priority(1),
            task("beta", &[]).with_priority(2),
            task("alpha", &[]).with_priority(2),
        ];
        let stages = stage(&tasks, ExecutionStrategy::Hybrid).unwrap();
        let order: Vec<&str> = stages[0].iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn test_sequential_strategy_flattens_stages() {
        let tasks = vec![task("a", &[]), task("b", &[]), task("c", &["a", "b"])];
        let stages = stage(&tasks, ExecutionStrategy::Sequential).unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages.iter().all(|s| s.len() == 1));
        // c still comes after both of its dependencies.
        let order: Vec<&str> = stages.iter().map(|s| s[0].id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let err = stage(&tasks, ExecutionStrategy::Hybrid).unwrap_err();
        assert!(matches!(err, EnsembleError::Cycle(_)));
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![task("a", &["a"])];
        let err = stage(&tasks, ExecutionStrategy::Hybrid).unwrap_err();
        assert!(matches!(err, EnsembleError::Cycle(_)));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let tasks = vec![task("a", &["ghost"])];
        let err = stage(&tasks, ExecutionStrategy::Hybrid).unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidDependency(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        let err = stage(&tasks, ExecutionStrategy::Hybrid).unwrap_err();
        assert!(matches!(err, EnsembleError::DuplicateTask(_)));
    }

    #[test]
    fn test_chain_produces_one_stage_per_task() {
        let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])];
        let stages = stage(&tasks, ExecutionStrategy::Parallel).unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2][0].id, "c");
    }
}
