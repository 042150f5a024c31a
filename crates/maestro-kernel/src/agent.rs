//! Agent Executor Contract
//!
//! Agents are external collaborators: each one is a named executor with a
//! uniform call signature. The engine dispatches by name through the
//! [`AgentRegistry`](crate::registry::AgentRegistry) and merges the returned
//! output (result text, context updates, collaboration hints) back into the
//! workflow state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::approval::ApprovalRequest;
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Input handed to an agent executor for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Free-form task text from the plan step.
    pub task: String,
    /// Snapshot of the workflow context at dispatch time.
    #[serde(default)]
    pub context: serde_json::Map<String, Value>,
    /// Workspace directory the agent may operate in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,
}

impl AgentTask {
    /// Create a task with an empty context.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            context: serde_json::Map::new(),
            workspace_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Success or failure of one agent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Error,
}

/// Cooperative scheduling flags an agent can attach to its output to request
/// that another agent be inserted into the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationHints {
    #[serde(default)]
    pub needs_replan: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_query: Option<String>,
}

impl CollaborationHints {
    /// Request that `agent` be appended to the plan with `query` as its task.
    pub fn replan(agent: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            needs_replan: true,
            suggested_agent: Some(agent.into()),
            suggested_query: Some(query.into()),
        }
    }
}

/// Result of one agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Primary result text, stored as the step result.
    pub content: String,

    pub status: AgentStatus,

    /// Executor-specific metadata. Token counts are read from the
    /// `prompt_tokens` / `completion_tokens` keys.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Key/value updates merged into the workflow context after the step.
    #[serde(default)]
    pub context: HashMap<String, Value>,

    /// Optional collaboration hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<CollaborationHints>,

    /// Set when the output requires a human decision before the workflow
    /// may continue (the approval gate).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRequest>,
}

impl AgentOutput {
    /// Successful output with the given content.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: AgentStatus::Success,
            metadata: HashMap::new(),
            context: HashMap::new(),
            hints: None,
            approval: None,
        }
    }

    /// Failed output with the given error text.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Error,
            ..Self::success(content)
        }
    }

    /// Attach a context update.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach collaboration hints.
    pub fn with_hints(mut self, hints: CollaborationHints) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Attach an approval request.
    pub fn with_approval(mut self, approval: ApprovalRequest) -> Self {
        self.approval = Some(approval);
        self
    }

    fn metadata_u64(&self, key: &str) -> u64 {
        self.metadata.get(key).and_then(Value::as_u64).unwrap_or(0)
    }

    /// Prompt tokens reported by the executor, if any.
    pub fn prompt_tokens(&self) -> u64 {
        self.metadata_u64("prompt_tokens")
    }

    /// Completion tokens reported by the executor, if any.
    pub fn completion_tokens(&self) -> u64 {
        self.metadata_u64("completion_tokens")
    }
}

// ---------------------------------------------------------------------------
// Executor trait
// ---------------------------------------------------------------------------

/// Uniform agent contract.
///
/// Implementations live outside the core (LLM callers, file writers,
/// browser testers); the engine only depends on this trait. Executors should
/// report domain failures through [`AgentOutput::error`] rather than `Err`;
/// an `Err` return is treated like an agent crash and fails the step.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Execute one task.
    async fn execute(&self, task: &AgentTask) -> EngineResult<AgentOutput>;

    /// Stable lowercase registry name (e.g. `codesmith`).
    fn name(&self) -> &str;

    /// Optional human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }
}
