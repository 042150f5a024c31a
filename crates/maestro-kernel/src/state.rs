//! Workflow State
//!
//! The single mutable object threaded through every node of a workflow.
//! Nodes receive the state, return an updated copy, and the engine
//! checkpoints it after every node boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plan::ExecutionPlan;

/// Version stamp written into every persisted state record. Loading a record
/// with a different version yields `StoreError::Unavailable` so the caller
/// rebuilds rather than misinterprets old layouts.
pub const SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Workflow Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created; the planner has not produced a plan yet.
    #[default]
    Planning,
    /// Steps are being executed.
    Executing,
    /// Suspended on a human approval decision.
    WaitingArchitectureApproval,
    /// All steps terminal, workflow succeeded.
    Completed,
    /// Workflow ended with an error.
    Failed,
}

impl WorkflowStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::WaitingArchitectureApproval => "waiting_architecture_approval",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Step Failure
// ---------------------------------------------------------------------------

/// One recorded failure. `step_id` is `None` for workflow-level failures
/// (planner failure, deadlock, cancellation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<u32>,
    pub agent: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Workflow Metadata
// ---------------------------------------------------------------------------

/// Timing and token accounting for a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Cumulative prompt tokens reported by agent executors.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Cumulative completion tokens reported by agent executors.
    #[serde(default)]
    pub completion_tokens: u64,
}

impl WorkflowMetadata {
    fn now() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// Wall-clock duration, if the workflow has ended.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// Workflow State
// ---------------------------------------------------------------------------

/// Full state of one workflow, persisted at every node boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Persistence layout version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,

    /// Opaque id, unique per client request.
    pub workflow_id: String,

    /// Original request text.
    pub user_query: String,

    /// Workspace directory handed to agent executors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,

    /// Agent currently executing or just executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<String>,

    /// The append-only plan of steps.
    #[serde(default)]
    pub execution_plan: ExecutionPlan,

    pub status: WorkflowStatus,

    /// Collaboration flag: an agent requested that another agent be
    /// inserted into the plan.
    #[serde(default)]
    pub needs_replan: bool,

    /// Agent the replan should target. Must be registered or the replan is
    /// rejected and the flags cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_agent: Option<String>,

    /// Task text for the replan step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_query: Option<String>,

    /// Replans applied so far; bounded by `replan_loop_guard`.
    #[serde(default)]
    pub replan_count: u32,

    /// Set by the client; observed by the engine between nodes.
    #[serde(default)]
    pub cancel_requested: bool,

    #[serde(default)]
    pub errors: Vec<StepFailure>,

    /// Open key/value map for cross-step data passing
    /// (`previous_step_result`, `implementation`, ...).
    #[serde(default)]
    pub context: serde_json::Map<String, Value>,

    pub metadata: WorkflowMetadata,
}

impl WorkflowState {
    /// Create a fresh state in `Planning` status.
    pub fn new(
        workflow_id: impl Into<String>,
        user_query: impl Into<String>,
        workspace_path: Option<String>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            workflow_id: workflow_id.into(),
            user_query: user_query.into(),
            workspace_path,
            current_agent: None,
            execution_plan: ExecutionPlan::new(),
            status: WorkflowStatus::Planning,
            needs_replan: false,
            suggested_agent: None,
            suggested_query: None,
            replan_count: 0,
            cancel_requested: false,
            errors: Vec::new(),
            context: serde_json::Map::new(),
            metadata: WorkflowMetadata::now(),
        }
    }

    /// Returns `true` for terminal workflow statuses.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a failure entry.
    pub fn record_error(
        &mut self,
        step_id: Option<u32>,
        agent: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(StepFailure {
            step_id,
            agent: agent.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Insert a context value.
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    /// Truthiness check used by step guards: missing keys, `null`, `false`,
    /// `0` and empty strings all read as false.
    pub fn context_truthy(&self, key: &str) -> bool {
        match self.context.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    /// Set the collaboration flags requesting a replan.
    pub fn set_replan_request(
        &mut self,
        agent: impl Into<String>,
        query: impl Into<String>,
    ) {
        self.needs_replan = true;
        self.suggested_agent = Some(agent.into());
        self.suggested_query = Some(query.into());
    }

    /// Clear all collaboration flags.
    pub fn clear_replan_flags(&mut self) {
        self.needs_replan = false;
        self.suggested_agent = None;
        self.suggested_query = None;
    }

    /// Move into a terminal status and stamp the end time.
    pub fn finish(&mut self, status: WorkflowStatus) {
        self.status = status;
        self.metadata.ended_at = Some(Utc::now());
    }
}
