//! Workflow Events
//!
//! Events emitted to the client surface while a workflow executes. The core
//! does not frame or transport them; any carrier (WebSocket JSON, channels,
//! logs) can serialize this enum directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::StepFailure;

/// Maximum length of a result summary carried in an event.
const SUMMARY_MAX_CHARS: usize = 200;

/// Truncate `text` to the event summary budget.
pub fn summarize(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    format!("{}…", truncated)
}

/// Observable workflow lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    PlanningStarted {
        workflow_id: String,
    },
    PlanCreated {
        workflow_id: String,
        /// Agent names in step order.
        agents: Vec<String>,
    },
    StepStarted {
        workflow_id: String,
        step_id: u32,
        agent: String,
    },
    StepCompleted {
        workflow_id: String,
        step_id: u32,
        result_summary: String,
    },
    StepFailed {
        workflow_id: String,
        step_id: u32,
        error: String,
    },
    StepSkipped {
        workflow_id: String,
        step_id: u32,
    },
    /// A collaboration flag led to a new step being appended.
    ReplanApplied {
        workflow_id: String,
        step_id: u32,
        agent: String,
    },
    /// Blocking until an external decision arrives.
    ApprovalRequired {
        workflow_id: String,
        action_type: String,
        payload: Value,
    },
    WorkflowCompleted {
        workflow_id: String,
        summary: String,
    },
    WorkflowFailed {
        workflow_id: String,
        errors: Vec<StepFailure>,
    },
}

impl WorkflowEvent {
    /// The workflow this event belongs to.
    pub fn workflow_id(&self) -> &str {
        match self {
            Self::PlanningStarted { workflow_id }
            | Self::PlanCreated { workflow_id, .. }
            | Self::StepStarted { workflow_id, .. }
            | Self::StepCompleted { workflow_id, .. }
            | Self::StepFailed { workflow_id, .. }
            | Self::StepSkipped { workflow_id, .. }
            | Self::ReplanApplied { workflow_id, .. }
            | Self::ApprovalRequired { workflow_id, .. }
            | Self::WorkflowCompleted { workflow_id, .. }
            | Self::WorkflowFailed { workflow_id, .. } => workflow_id,
        }
    }
}
