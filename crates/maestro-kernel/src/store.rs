//! Store Contracts
//!
//! Defines the persistence interfaces the engine depends on: workflow state
//! checkpoints, plan memory with similarity search, and pending approvals.
//! Backends are swappable (in-memory for tests, file-backed for production);
//! implementations live in `maestro-foundation`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::plan::StepShape;
use crate::approval::PendingApproval;
use crate::state::{WorkflowState, WorkflowStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Persistence error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot serve the request (also raised on schema version
    /// mismatches, which require a rebuild).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Record encoding/decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),
}

/// Persistence result type
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::StoreUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// State store
// ---------------------------------------------------------------------------

/// Workflow state checkpoints, one record per `workflow_id`.
///
/// A save replaces the prior snapshot atomically; reads are linearizable
/// with respect to saves on the same key.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a snapshot, replacing any prior one for the same id.
    async fn save(&self, state: &WorkflowState) -> StoreResult<()>;

    /// Load the snapshot for `workflow_id`, or `None` if absent.
    async fn load(&self, workflow_id: &str) -> StoreResult<Option<WorkflowState>>;

    /// Ids of all workflows currently in `status`.
    async fn list_by_status(&self, status: WorkflowStatus) -> StoreResult<Vec<String>>;

    /// Remove the snapshot. Returns `true` if one existed.
    async fn remove(&self, workflow_id: &str) -> StoreResult<bool>;
}

// ---------------------------------------------------------------------------
// Plan memory store
// ---------------------------------------------------------------------------

/// A past plan with its outcome, stored for similarity-based reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMemoryEntry {
    pub id: Uuid,
    /// The task text the plan was produced for.
    pub task_text: String,
    /// Opaque embedding of `task_text`; filled in by the store backend.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Agent sequence and dependency shape of the plan.
    pub decomposition: Vec<StepShape>,
    pub success: bool,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PlanMemoryEntry {
    pub fn new(
        task_text: impl Into<String>,
        decomposition: Vec<StepShape>,
        success: bool,
        duration_seconds: f64,
        error_summary: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_text: task_text.into(),
            embedding: Vec::new(),
            decomposition,
            success,
            duration_seconds,
            error_summary,
            created_at: Utc::now(),
        }
    }
}

/// A memory entry together with its similarity to the queried task text.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub entry: PlanMemoryEntry,
    /// Similarity in [0, 1]; higher is closer.
    pub score: f32,
}

/// Retain only entries whose plan succeeded.
pub fn filter_success(entries: Vec<ScoredMemory>) -> Vec<ScoredMemory> {
    entries.into_iter().filter(|m| m.entry.success).collect()
}

/// Plan memory with similarity search over task strings.
///
/// The similarity scheme is backend-defined; the only requirement is that
/// ordering is deterministic for identical inputs. The planner tolerates an
/// empty result and a total failure of this store.
#[async_trait]
pub trait PlanMemoryStore: Send + Sync {
    /// Persist an entry. Backends compute the embedding from `task_text`.
    async fn store(&self, entry: PlanMemoryEntry) -> StoreResult<()>;

    /// Up to `k` entries ordered by descending similarity to `task_text`.
    async fn search(&self, task_text: &str, k: usize) -> StoreResult<Vec<ScoredMemory>>;
}

// ---------------------------------------------------------------------------
// Approval store
// ---------------------------------------------------------------------------

/// Persistence for pending approvals, so outstanding gates survive restarts.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn save_pending(&self, approval: &PendingApproval) -> StoreResult<()>;

    /// Remove and return the pending approval for `workflow_id`, if any.
    async fn remove_pending(&self, workflow_id: &str) -> StoreResult<Option<PendingApproval>>;

    async fn list_pending(&self) -> StoreResult<Vec<PendingApproval>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_engine_error() {
        let err: EngineError = StoreError::Unavailable("disk gone".into()).into();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
    }

    #[test]
    fn filter_success_drops_failures() {
        let ok = ScoredMemory {
            entry: PlanMemoryEntry::new("build app", vec![], true, 12.0, None),
            score: 0.9,
        };
        let bad = ScoredMemory {
            entry: PlanMemoryEntry::new("build app", vec![], false, 3.0, Some("boom".into())),
            score: 0.95,
        };

        let kept = filter_success(vec![ok.clone(), bad]);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].entry.success);
    }

    #[test]
    fn memory_entry_roundtrip() {
        let entry = PlanMemoryEntry::new(
            "Entwickle eine Tetris Webapplikation",
            vec![StepShape {
                agent: "architect".into(),
                dependencies: vec![],
            }],
            true,
            42.5,
            None,
        );
        let json = serde_json::to_string(&entry).unwrap();
        let decoded: PlanMemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entry);
    }
}
