//! Router
//!
//! A pure, total function from workflow state to the next node label. All
//! state transitions happen in nodes; the router only reads. Decision order
//! matters and is fixed:
//!
//! 1. terminal status -> `End`
//! 2. `needs_replan` -> `Planner`
//! 3. `Planning` status -> `Planner` (initial plan synthesis)
//! 4. waiting on approval -> `Approval`
//! 5. a step in progress -> that step's agent (guards against premature
//!    termination when a step started but its completion write has not landed)
//! 6. pending steps: next eligible by smallest id, or `Deadlock` when none
//!    can ever become eligible
//! 7. otherwise -> `End`

use maestro_kernel::state::{WorkflowState, WorkflowStatus};

/// Next node label. `Deadlock` is "END with error": the engine records the
/// deadlock before terminating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Run the planner node (initial planning or a replan request).
    Planner,
    /// Suspend on the approval gate.
    Approval,
    /// Dispatch the named agent.
    Agent(String),
    /// Pending steps exist but none can ever become eligible.
    Deadlock,
    /// Nothing left to do.
    End,
}

/// Compute the next node for `state`. Stateless and side-effect-free.
pub fn route(state: &WorkflowState) -> Route {
    if state.status.is_terminal() {
        return Route::End;
    }

    if state.needs_replan {
        return Route::Planner;
    }

    if state.status == WorkflowStatus::Planning {
        return Route::Planner;
    }

    if state.status == WorkflowStatus::WaitingArchitectureApproval {
        return Route::Approval;
    }

    let plan = &state.execution_plan;

    if let Some(step) = plan.first_in_progress() {
        return Route::Agent(step.agent.clone());
    }

    if plan.any_pending() {
        return match plan.next_eligible() {
            Some(step) => Route::Agent(step.agent.clone()),
            None => Route::Deadlock,
        };
    }

    Route::End
}
