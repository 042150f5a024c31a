//! File-Backed Store
//!
//! Durable backend persisting JSON records under a root directory:
//!
//! ```text
//! <root>/states/<workflow_id>.json
//! <root>/approvals/<workflow_id>.json
//! <root>/memory/plans.json
//! ```
//!
//! Every write lands in a `.tmp` sibling first and is then renamed over the
//! target, so a snapshot replaces the prior one atomically and a crash never
//! leaves a half-written record behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use maestro_kernel::approval::PendingApproval;
use maestro_kernel::state::{SCHEMA_VERSION, WorkflowState, WorkflowStatus};
use maestro_kernel::store::{
    ApprovalStore, PlanMemoryEntry, PlanMemoryStore, ScoredMemory, StateStore, StoreError,
    StoreResult,
};

use super::memory::rank_entries;
use super::similarity::embed;

const STATES_DIR: &str = "states";
const APPROVALS_DIR: &str = "approvals";
const MEMORY_DIR: &str = "memory";
const MEMORY_FILE: &str = "plans.json";

/// File-backed storage for workflow state, plan memory, and pending approvals.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        for dir in [STATES_DIR, APPROVALS_DIR, MEMORY_DIR] {
            fs::create_dir_all(root.join(dir)).await?;
        }
        Ok(Self { root })
    }

    /// Replace path-hostile characters so opaque workflow ids are safe as
    /// file names.
    fn sanitize(id: &str) -> String {
        id.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn state_path(&self, workflow_id: &str) -> PathBuf {
        self.root
            .join(STATES_DIR)
            .join(format!("{}.json", Self::sanitize(workflow_id)))
    }

    fn approval_path(&self, workflow_id: &str) -> PathBuf {
        self.root
            .join(APPROVALS_DIR)
            .join(format!("{}.json", Self::sanitize(workflow_id)))
    }

    fn memory_path(&self) -> PathBuf {
        self.root.join(MEMORY_DIR).join(MEMORY_FILE)
    }

    /// Write-temp-then-rename so readers only ever observe full snapshots.
    async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_memory(&self) -> StoreResult<Vec<PlanMemoryEntry>> {
        Ok(Self::read_json(&self.memory_path()).await?.unwrap_or_default())
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn save(&self, state: &WorkflowState) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        Self::write_atomic(&self.state_path(&state.workflow_id), &bytes).await
    }

    async fn load(&self, workflow_id: &str) -> StoreResult<Option<WorkflowState>> {
        let state: Option<WorkflowState> = Self::read_json(&self.state_path(workflow_id)).await?;
        match state {
            Some(state) if state.schema_version != SCHEMA_VERSION => {
                Err(StoreError::Unavailable(format!(
                    "workflow '{}' has schema version {} but {} is required",
                    workflow_id, state.schema_version, SCHEMA_VERSION
                )))
            }
            other => Ok(other),
        }
    }

    async fn list_by_status(&self, status: WorkflowStatus) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(self.root.join(STATES_DIR)).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match Self::read_json::<WorkflowState>(&path).await {
                Ok(Some(state)) if state.status == status => ids.push(state.workflow_id),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable state record"),
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, workflow_id: &str) -> StoreResult<bool> {
        match fs::remove_file(self.state_path(workflow_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PlanMemoryStore for FileStore {
    async fn store(&self, mut entry: PlanMemoryEntry) -> StoreResult<()> {
        entry.embedding = embed(&entry.task_text);

        let mut entries = self.load_memory().await?;
        entries.push(entry);

        let bytes = serde_json::to_vec(&entries)?;
        Self::write_atomic(&self.memory_path(), &bytes).await
    }

    async fn search(&self, task_text: &str, k: usize) -> StoreResult<Vec<ScoredMemory>> {
        let entries = self.load_memory().await?;
        Ok(rank_entries(&entries, task_text, k))
    }
}

#[async_trait]
impl ApprovalStore for FileStore {
    async fn save_pending(&self, approval: &PendingApproval) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(approval)?;
        Self::write_atomic(&self.approval_path(&approval.workflow_id), &bytes).await
    }

    async fn remove_pending(&self, workflow_id: &str) -> StoreResult<Option<PendingApproval>> {
        let path = self.approval_path(workflow_id);
        let pending: Option<PendingApproval> = Self::read_json(&path).await?;

        if pending.is_some() {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(pending)
    }

    async fn list_pending(&self) -> StoreResult<Vec<PendingApproval>> {
        let mut pending = Vec::new();
        let mut entries = fs::read_dir(self.root.join(APPROVALS_DIR)).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match Self::read_json::<PendingApproval>(&path).await {
                Ok(Some(approval)) => pending.push(approval),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable approval record"),
            }
        }

        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_kernel::approval::ApprovalRequest;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn state_roundtrip_survives_reopen() {
        let (dir, store) = open_store().await;
        let mut state = WorkflowState::new("wf-1", "Fix bug in auth", None);
        state.status = WorkflowStatus::WaitingArchitectureApproval;
        store.save(&state).await.unwrap();
        drop(store);

        // A fresh store over the same directory sees the snapshot.
        let reopened = FileStore::open(dir.path()).await.unwrap();
        let loaded = reopened.load("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);

        let ids = reopened
            .list_by_status(WorkflowStatus::WaitingArchitectureApproval)
            .await
            .unwrap();
        assert_eq!(ids, vec!["wf-1"]);
    }

    #[tokio::test]
    async fn save_replaces_atomically() {
        let (_dir, store) = open_store().await;
        let mut state = WorkflowState::new("wf-1", "task", None);
        store.save(&state).await.unwrap();

        state.status = WorkflowStatus::Completed;
        store.save(&state).await.unwrap();

        let loaded = store.load("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Completed);

        // No stray temp file is left behind.
        let tmp = store.state_path("wf-1").with_extension("json.tmp");
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn hostile_workflow_ids_are_sanitized() {
        let (_dir, store) = open_store().await;
        let state = WorkflowState::new("../../etc/passwd", "task", None);
        store.save(&state).await.unwrap();

        let loaded = store.load("../../etc/passwd").await.unwrap().unwrap();
        assert_eq!(loaded.workflow_id, "../../etc/passwd");
    }

    #[tokio::test]
    async fn missing_records_load_as_none() {
        let (_dir, store) = open_store().await;
        assert!(store.load("ghost").await.unwrap().is_none());
        assert!(!store.remove("ghost").await.unwrap());
        assert!(store.remove_pending("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_persists_across_reopen() {
        let (dir, store) = open_store().await;
        store
            .store(PlanMemoryEntry::new("Build a tetris webapp", vec![], true, 9.0, None))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let hits = reopened.search("Build a tetris webapp", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn pending_approvals_survive_reopen() {
        let (dir, store) = open_store().await;
        let pending = PendingApproval::new(
            "wf-1",
            ApprovalRequest::new("architecture_proposal", json!({"design": "v1"})),
            1800,
        );
        store.save_pending(&pending).await.unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let listed = reopened.list_pending().await.unwrap();
        assert_eq!(listed, vec![pending.clone()]);

        let removed = reopened.remove_pending("wf-1").await.unwrap();
        assert_eq!(removed, Some(pending));
        assert!(reopened.list_pending().await.unwrap().is_empty());
    }
}
