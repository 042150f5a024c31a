//! Execution Plan Model
//!
//! An execution plan is an append-only sequence of steps, each assigned to a
//! named agent. Step ids are assigned as `len + 1` at append time and are
//! never reused, so ids are strictly increasing in insertion order.
//! Re-planning only ever appends; graph reordering is not supported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Step Status
// ---------------------------------------------------------------------------

/// Status of a single plan step during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting to be executed.
    #[default]
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Failed with an error recorded in the workflow state.
    Failed,
    /// Skipped by a guard; never dispatched.
    Skipped,
}

impl StepStatus {
    /// Returns `true` if the step has reached a terminal state.
    ///
    /// Terminal statuses are monotonic: once reached, the step is never
    /// mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns `true` if the step completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

// ---------------------------------------------------------------------------
// Step Guard
// ---------------------------------------------------------------------------

/// Runtime guard evaluated immediately before a step is dispatched.
///
/// Guards let templates include conditional steps (e.g. a fixer that only
/// runs when the reviewer found issues) without removing steps from the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepGuard {
    /// Mark the step `Skipped` unless the workflow context holds a truthy
    /// value under `key`.
    SkipUnlessContext { key: String },
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Positive id, assigned as `len + 1` when appended to a plan.
    pub id: u32,

    /// Registry name of the agent that executes this step.
    pub agent: String,

    /// Free-form task text handed to the agent.
    pub task: String,

    /// Current execution status.
    #[serde(default)]
    pub status: StepStatus,

    /// Ids of steps that must be `Completed` before this step is eligible.
    /// An empty list means immediately eligible.
    #[serde(default)]
    pub dependencies: Vec<u32>,

    /// Optional dispatch guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<StepGuard>,

    /// Value produced by the agent on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// When the step entered `InProgress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the step reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    /// Create a step draft. The id is assigned by [`ExecutionPlan::append`].
    pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: 0,
            agent: agent.into(),
            task: task.into(),
            status: StepStatus::Pending,
            dependencies: Vec::new(),
            guard: None,
            result: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Set the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<u32>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Attach a dispatch guard.
    pub fn with_guard(mut self, guard: StepGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Transition `Pending -> InProgress`. Returns `false` if the step was
    /// not pending (terminal steps are never mutated).
    pub fn begin(&mut self) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.status = StepStatus::InProgress;
        self.started_at = Some(Utc::now());
        true
    }

    /// Transition into `Completed` with a result. No-op on terminal steps.
    pub fn complete(&mut self, result: Value) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = StepStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition into `Failed`. No-op on terminal steps.
    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = StepStatus::Failed;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition a pending step into `Skipped`. No-op otherwise.
    pub fn skip(&mut self) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.status = StepStatus::Skipped;
        self.completed_at = Some(Utc::now());
        true
    }
}

// ---------------------------------------------------------------------------
// Step Shape
// ---------------------------------------------------------------------------

/// Positional shape of one step, used when a plan is stored in memory and
/// later adapted to a new task. Dependencies are 0-based positions into the
/// decomposition so that id assignment stays monotonic on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepShape {
    /// Agent name.
    pub agent: String,
    /// 0-based positions of prerequisite steps.
    #[serde(default)]
    pub dependencies: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Execution Plan
// ---------------------------------------------------------------------------

/// Ordered, append-only sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Steps in insertion order. `steps[i].id == i + 1` always holds.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Set when the plan source declared independent steps safe to run
    /// concurrently. Purely an optimization hint; sequential execution is
    /// always conforming.
    #[serde(default)]
    pub parallel_hint: bool,
}

impl ExecutionPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new plan with `step` appended and its id assigned as
    /// `len + 1`. The receiver is left untouched so callers can swap the
    /// plan object wholesale, which keeps state-change detection trivial.
    #[must_use]
    pub fn append(&self, mut step: Step) -> Self {
        let mut plan = self.clone();
        step.id = plan.steps.len() as u32 + 1;
        plan.steps.push(step);
        plan
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step by id.
    pub fn get(&self, id: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: u32) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    fn dependencies_met(&self, step: &Step) -> bool {
        step.dependencies.iter().all(|dep| {
            self.get(*dep)
                .map(|s| s.status.is_success())
                .unwrap_or(false)
        })
    }

    /// Earliest pending step whose dependencies are all completed.
    /// Ties are broken by smallest id, which is insertion order.
    pub fn next_eligible(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Pending && self.dependencies_met(s))
    }

    /// Earliest step currently in progress, if any.
    pub fn first_in_progress(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::InProgress)
    }

    /// Returns `true` iff any step is `InProgress`.
    pub fn any_in_progress(&self) -> bool {
        self.first_in_progress().is_some()
    }

    /// Returns `true` iff any step is `Pending`.
    pub fn any_pending(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Pending)
    }

    /// Returns `true` when at least one pending step can be dispatched now.
    pub fn has_eligible(&self) -> bool {
        self.next_eligible().is_some()
    }

    /// Returns `true` when every step has reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// Pending steps that can never run because a dependency failed, was
    /// skipped, or does not exist. Used to build deadlock diagnostics.
    pub fn blocked_steps(&self) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending && !self.dependencies_met(s))
            .collect()
    }

    /// Positional shape of this plan for memory storage. Dependency ids are
    /// converted to 0-based positions; dangling ids are dropped.
    pub fn shape(&self) -> Vec<StepShape> {
        self.steps
            .iter()
            .map(|s| StepShape {
                agent: s.agent.clone(),
                dependencies: s
                    .dependencies
                    .iter()
                    .filter(|dep| **dep >= 1 && (**dep as usize) <= self.steps.len())
                    .map(|dep| (*dep - 1) as usize)
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_status_terminal_states() {
        assert!(StepStatus::Completed.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(StepStatus::Skipped.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::InProgress.is_terminal());
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let plan = ExecutionPlan::new()
            .append(Step::new("architect", "Design"))
            .append(Step::new("codesmith", "Implement"))
            .append(Step::new("reviewer", "Review"));

        let ids: Vec<u32> = plan.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // Strictly increasing regardless of how many appends happen.
        for window in plan.steps.windows(2) {
            assert!(window[0].id < window[1].id);
        }
    }

    #[test]
    fn append_leaves_original_untouched() {
        let plan = ExecutionPlan::new().append(Step::new("fixer", "Fix"));
        let extended = plan.append(Step::new("reviewer", "Re-review"));

        assert_eq!(plan.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.steps[1].id, 2);
    }

    #[test]
    fn next_eligible_respects_dependencies() {
        let mut plan = ExecutionPlan::new()
            .append(Step::new("architect", "Design"))
            .append(Step::new("codesmith", "Implement").with_dependencies(vec![1]));

        assert_eq!(plan.next_eligible().map(|s| s.id), Some(1));

        plan.get_mut(1).unwrap().begin();
        assert!(plan.any_in_progress());
        assert!(plan.next_eligible().is_none());

        plan.get_mut(1).unwrap().complete(json!("done"));
        assert_eq!(plan.next_eligible().map(|s| s.id), Some(2));
    }

    #[test]
    fn eligibility_ties_break_by_smallest_id() {
        let plan = ExecutionPlan::new()
            .append(Step::new("research", "Research A"))
            .append(Step::new("research", "Research B"));

        assert_eq!(plan.next_eligible().map(|s| s.id), Some(1));
    }

    #[test]
    fn failed_dependency_blocks_dependent() {
        let mut plan = ExecutionPlan::new()
            .append(Step::new("fixer", "Fix"))
            .append(Step::new("reviewer", "Review").with_dependencies(vec![1]));

        plan.get_mut(1).unwrap().begin();
        plan.get_mut(1).unwrap().fail();

        assert!(plan.any_pending());
        assert!(plan.next_eligible().is_none());
        assert_eq!(plan.blocked_steps().len(), 1);
    }

    #[test]
    fn dangling_dependency_blocks_step() {
        let plan = ExecutionPlan::new()
            .append(Step::new("codesmith", "Implement"))
            .append(Step::new("reviewer", "Review").with_dependencies(vec![3]));

        assert_eq!(plan.next_eligible().map(|s| s.id), Some(1));
        let blocked = plan.blocked_steps();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].id, 2);
    }

    #[test]
    fn terminal_steps_are_never_mutated() {
        let mut step = Step::new("reviewer", "Review");
        step.id = 1;

        assert!(step.begin());
        assert!(step.complete(json!("ok")));

        // Every further transition is refused.
        assert!(!step.fail());
        assert!(!step.begin());
        assert!(!step.complete(json!("again")));
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.result, Some(json!("ok")));
    }

    #[test]
    fn skip_only_applies_to_pending() {
        let mut step = Step::new("fixer", "Fix");
        assert!(step.skip());
        assert_eq!(step.status, StepStatus::Skipped);

        let mut running = Step::new("fixer", "Fix");
        running.begin();
        assert!(!running.skip());
    }

    #[test]
    fn shape_uses_positional_dependencies() {
        let plan = ExecutionPlan::new()
            .append(Step::new("architect", "Design"))
            .append(Step::new("codesmith", "Implement").with_dependencies(vec![1]))
            .append(Step::new("reviewer", "Review").with_dependencies(vec![2]));

        let shape = plan.shape();
        assert_eq!(shape.len(), 3);
        assert_eq!(shape[0].dependencies, Vec::<usize>::new());
        assert_eq!(shape[1].dependencies, vec![0]);
        assert_eq!(shape[2].dependencies, vec![1]);
    }

    #[test]
    fn plan_serialization_roundtrip() {
        let plan = ExecutionPlan::new()
            .append(Step::new("architect", "Design the architecture"))
            .append(
                Step::new("fixer", "Fix issues")
                    .with_dependencies(vec![1])
                    .with_guard(StepGuard::SkipUnlessContext {
                        key: "review_issues".to_string(),
                    }),
            );

        let json = serde_json::to_string(&plan).unwrap();
        let decoded: ExecutionPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, plan);
    }
}
