//! Memory-Based Plan Adaptation
//!
//! The fast path for complex tasks: when a sufficiently similar past plan
//! succeeded, its agent sequence and dependency shape are preserved and each
//! step's task text is rewritten around the current query. No LLM call is
//! involved, so the result is deterministic for identical inputs.

use maestro_kernel::plan::{ExecutionPlan, Step};
use maestro_kernel::store::PlanMemoryEntry;

/// Verb used when rewriting a step task for the given agent.
pub fn role_verb(agent: &str) -> &'static str {
    match agent {
        "architect" => "Design the architecture",
        "codesmith" => "Implement",
        "reviewer" => "Review the implementation",
        "fixer" => "Fix the issues found",
        "research" => "Research",
        "docbot" => "Document",
        "orchestrator" => "Coordinate",
        "opus_arbitrator" => "Arbitrate the conflict",
        _ => "Work on",
    }
}

/// Adapt a stored decomposition to `query`.
///
/// Positional dependencies (0-based) are converted back to step ids, which
/// reproduces the original dependency shape exactly.
pub fn adapt(entry: &PlanMemoryEntry, query: &str) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();

    for shape in &entry.decomposition {
        let dependencies: Vec<u32> = shape
            .dependencies
            .iter()
            .filter(|pos| **pos < plan.len())
            .map(|pos| *pos as u32 + 1)
            .collect();

        let step = Step::new(
            shape.agent.clone(),
            format!("{}: {}", role_verb(&shape.agent), query),
        )
        .with_dependencies(dependencies);

        plan = plan.append(step);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_kernel::plan::StepShape;

    fn entry_with(shapes: Vec<StepShape>) -> PlanMemoryEntry {
        PlanMemoryEntry::new("Build a chess webapp", shapes, true, 120.0, None)
    }

    fn shape(agent: &str, dependencies: Vec<usize>) -> StepShape {
        StepShape {
            agent: agent.to_string(),
            dependencies,
        }
    }

    #[test]
    fn adaptation_preserves_sequence_and_shape() {
        let entry = entry_with(vec![
            shape("architect", vec![]),
            shape("codesmith", vec![0]),
            shape("reviewer", vec![1]),
        ]);

        let plan = adapt(&entry, "Build a sudoku webapp");

        let agents: Vec<&str> = plan.steps.iter().map(|s| s.agent.as_str()).collect();
        assert_eq!(agents, vec!["architect", "codesmith", "reviewer"]);
        assert_eq!(plan.steps[1].dependencies, vec![1]);
        assert_eq!(plan.steps[2].dependencies, vec![2]);
    }

    #[test]
    fn tasks_are_rewritten_for_the_new_query() {
        let entry = entry_with(vec![shape("codesmith", vec![])]);
        let plan = adapt(&entry, "Build a sudoku webapp");

        assert_eq!(plan.steps[0].task, "Implement: Build a sudoku webapp");
        // Nothing from the original task text leaks through.
        assert!(!plan.steps[0].task.contains("chess"));
    }

    #[test]
    fn adaptation_is_deterministic() {
        let entry = entry_with(vec![
            shape("architect", vec![]),
            shape("codesmith", vec![0]),
        ]);

        let a = adapt(&entry, "Build a kanban board");
        let b = adapt(&entry, "Build a kanban board");
        assert_eq!(a, b);
    }

    #[test]
    fn forward_references_are_dropped() {
        // A shape whose dependency points at itself or a later position
        // cannot be represented in an append-only plan.
        let entry = entry_with(vec![shape("codesmith", vec![2]), shape("reviewer", vec![0])]);
        let plan = adapt(&entry, "task");
        assert_eq!(plan.steps[0].dependencies, Vec::<u32>::new());
        assert_eq!(plan.steps[1].dependencies, vec![1]);
    }
}
