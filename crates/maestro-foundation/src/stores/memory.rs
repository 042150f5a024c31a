//! In-Memory Store
//!
//! Thread-safe in-memory backend implementing all three store contracts on
//! one struct. Suitable for unit tests, development, and short-lived
//! sessions that need no persistence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use maestro_kernel::approval::PendingApproval;
use maestro_kernel::state::{SCHEMA_VERSION, WorkflowState, WorkflowStatus};
use maestro_kernel::store::{
    ApprovalStore, PlanMemoryEntry, PlanMemoryStore, ScoredMemory, StateStore, StoreError,
    StoreResult,
};

use super::similarity::{cosine_similarity, embed};

/// In-memory storage for workflow state, plan memory, and pending approvals.
pub struct InMemoryStore {
    states: RwLock<HashMap<String, WorkflowState>>,
    memory: RwLock<Vec<PlanMemoryEntry>>,
    approvals: RwLock<HashMap<String, PendingApproval>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            memory: RwLock::new(Vec::new()),
            approvals: RwLock::new(HashMap::new()),
        }
    }

    /// Create a shared in-memory store.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Drop all data.
    pub async fn clear(&self) {
        self.states.write().await.clear();
        self.memory.write().await.clear();
        self.approvals.write().await.clear();
    }

    /// Number of stored workflow states.
    pub async fn state_count(&self) -> usize {
        self.states.read().await.len()
    }

    /// Number of stored plan memory entries.
    pub async fn memory_count(&self) -> usize {
        self.memory.read().await.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn save(&self, state: &WorkflowState) -> StoreResult<()> {
        let mut states = self.states.write().await;
        states.insert(state.workflow_id.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> StoreResult<Option<WorkflowState>> {
        let states = self.states.read().await;
        match states.get(workflow_id) {
            Some(state) if state.schema_version != SCHEMA_VERSION => {
                Err(StoreError::Unavailable(format!(
                    "workflow '{}' has schema version {} but {} is required",
                    workflow_id, state.schema_version, SCHEMA_VERSION
                )))
            }
            other => Ok(other.cloned()),
        }
    }

    async fn list_by_status(&self, status: WorkflowStatus) -> StoreResult<Vec<String>> {
        let states = self.states.read().await;
        let mut ids: Vec<String> = states
            .values()
            .filter(|s| s.status == status)
            .map(|s| s.workflow_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, workflow_id: &str) -> StoreResult<bool> {
        let mut states = self.states.write().await;
        Ok(states.remove(workflow_id).is_some())
    }
}

/// Score `entries` against `task_text` and return the top `k`, ordered by
/// descending similarity with deterministic tie-breaks.
pub(crate) fn rank_entries(
    entries: &[PlanMemoryEntry],
    task_text: &str,
    k: usize,
) -> Vec<ScoredMemory> {
    let query = embed(task_text);

    let mut scored: Vec<ScoredMemory> = entries
        .iter()
        .map(|entry| ScoredMemory {
            score: cosine_similarity(&query, &entry.embedding),
            entry: entry.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.entry.created_at.cmp(&b.entry.created_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    scored.truncate(k);
    scored
}

#[async_trait]
impl PlanMemoryStore for InMemoryStore {
    async fn store(&self, mut entry: PlanMemoryEntry) -> StoreResult<()> {
        entry.embedding = embed(&entry.task_text);
        self.memory.write().await.push(entry);
        Ok(())
    }

    async fn search(&self, task_text: &str, k: usize) -> StoreResult<Vec<ScoredMemory>> {
        let entries = self.memory.read().await;
        Ok(rank_entries(&entries, task_text, k))
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn save_pending(&self, approval: &PendingApproval) -> StoreResult<()> {
        let mut approvals = self.approvals.write().await;
        approvals.insert(approval.workflow_id.clone(), approval.clone());
        Ok(())
    }

    async fn remove_pending(&self, workflow_id: &str) -> StoreResult<Option<PendingApproval>> {
        let mut approvals = self.approvals.write().await;
        Ok(approvals.remove(workflow_id))
    }

    async fn list_pending(&self) -> StoreResult<Vec<PendingApproval>> {
        let approvals = self.approvals.read().await;
        let mut pending: Vec<PendingApproval> = approvals.values().cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_kernel::approval::ApprovalRequest;
    use serde_json::json;

    #[tokio::test]
    async fn state_roundtrip() {
        let store = InMemoryStore::new();
        let state = WorkflowState::new("wf-1", "Fix bug in auth", None);

        store.save(&state).await.unwrap();
        let loaded = store.load("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);

        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_prior_snapshot() {
        let store = InMemoryStore::new();
        let mut state = WorkflowState::new("wf-1", "task", None);
        store.save(&state).await.unwrap();

        state.status = WorkflowStatus::Executing;
        store.save(&state).await.unwrap();

        let loaded = store.load("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Executing);
        assert_eq!(store.state_count().await, 1);
    }

    #[tokio::test]
    async fn schema_version_mismatch_is_unavailable() {
        let store = InMemoryStore::new();
        let mut state = WorkflowState::new("wf-1", "task", None);
        state.schema_version = 99;
        store.save(&state).await.unwrap();

        let err = store.load("wf-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = InMemoryStore::new();

        let planning = WorkflowState::new("wf-a", "task", None);
        let mut waiting = WorkflowState::new("wf-b", "task", None);
        waiting.status = WorkflowStatus::WaitingArchitectureApproval;
        store.save(&planning).await.unwrap();
        store.save(&waiting).await.unwrap();

        let ids = store
            .list_by_status(WorkflowStatus::WaitingArchitectureApproval)
            .await
            .unwrap();
        assert_eq!(ids, vec!["wf-b"]);
    }

    #[tokio::test]
    async fn memory_search_orders_by_similarity() {
        let store = InMemoryStore::new();
        store
            .store(PlanMemoryEntry::new("Build a tetris webapp", vec![], true, 10.0, None))
            .await
            .unwrap();
        store
            .store(PlanMemoryEntry::new(
                "Rotate the database credentials",
                vec![],
                true,
                5.0,
                None,
            ))
            .await
            .unwrap();

        let hits = store.search("Build a snake webapp", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.task_text, "Build a tetris webapp");
        assert!(hits[0].score > hits[1].score);

        let top1 = store.search("Build a snake webapp", 1).await.unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[tokio::test]
    async fn approval_roundtrip_and_idempotent_remove() {
        let store = InMemoryStore::new();
        let pending = PendingApproval::new(
            "wf-1",
            ApprovalRequest::new("architecture_proposal", json!({"design": "v1"})),
            1800,
        );

        store.save_pending(&pending).await.unwrap();
        assert_eq!(store.list_pending().await.unwrap().len(), 1);

        let removed = store.remove_pending("wf-1").await.unwrap();
        assert_eq!(removed, Some(pending));

        // Second removal is a no-op.
        assert!(store.remove_pending("wf-1").await.unwrap().is_none());
    }
}
