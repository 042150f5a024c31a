//! Approval Manager
//!
//! Owns the set of pending approvals and bridges external decisions back
//! into the engine. Entries are persisted through an [`ApprovalStore`] so an
//! engine restart can re-present outstanding approvals and still accept
//! decisions that arrive later.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use maestro_kernel::approval::{ApprovalRequest, PendingApproval};
use maestro_kernel::error::EngineResult;
use maestro_kernel::store::ApprovalStore;

/// Pending approval bookkeeping with durable backing.
pub struct ApprovalManager {
    store: Arc<dyn ApprovalStore>,
    /// Live cache keyed by workflow id; authoritative after `restore()`.
    pending: RwLock<HashMap<String, PendingApproval>>,
}

impl ApprovalManager {
    pub fn new(store: Arc<dyn ApprovalStore>) -> Self {
        Self {
            store,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Reload outstanding approvals from the store after a restart.
    /// Returns how many were found.
    pub async fn restore(&self) -> EngineResult<usize> {
        let stored = self.store.list_pending().await?;
        let mut pending = self.pending.write().await;
        pending.clear();
        for approval in stored {
            pending.insert(approval.workflow_id.clone(), approval);
        }
        Ok(pending.len())
    }

    /// Record a pending approval and return its id. The engine notifies the
    /// external surface through its `ApprovalRequired` event.
    pub async fn create(
        &self,
        workflow_id: &str,
        request: ApprovalRequest,
        timeout_seconds: u64,
    ) -> EngineResult<Uuid> {
        let approval = PendingApproval::new(workflow_id, request, timeout_seconds);
        let approval_id = approval.approval_id;

        self.store.save_pending(&approval).await?;
        self.pending
            .write()
            .await
            .insert(workflow_id.to_string(), approval);

        info!(workflow_id, %approval_id, "approval gate opened");
        Ok(approval_id)
    }

    /// Remove and return the pending approval for `workflow_id`.
    ///
    /// Unknown workflows (including duplicate resolves) return `None` with a
    /// log line; this never propagates an error to the external caller.
    pub async fn resolve(&self, workflow_id: &str) -> EngineResult<Option<PendingApproval>> {
        let cached = self.pending.write().await.remove(workflow_id);

        if cached.is_some() {
            self.store.remove_pending(workflow_id).await?;
            info!(workflow_id, "approval resolved");
            return Ok(cached);
        }

        // Not cached: the entry may predate this process. Fall through to
        // the store so decisions survive restarts without an explicit
        // restore() call.
        match self.store.remove_pending(workflow_id).await? {
            Some(approval) => {
                info!(workflow_id, "approval resolved from store");
                Ok(Some(approval))
            }
            None => {
                warn!(workflow_id, "approval decision for unknown workflow ignored");
                Ok(None)
            }
        }
    }

    /// All outstanding approvals, oldest first.
    pub async fn list_pending(&self) -> Vec<PendingApproval> {
        let pending = self.pending.read().await;
        let mut entries: Vec<PendingApproval> = pending.values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        entries
    }

    /// Remove and return every approval whose timeout has passed. The engine
    /// resumes each returned workflow with rejection semantics.
    pub async fn sweep(&self, now: DateTime<Utc>) -> EngineResult<Vec<PendingApproval>> {
        let expired_ids: Vec<String> = {
            let pending = self.pending.read().await;
            pending
                .values()
                .filter(|a| a.is_expired(now))
                .map(|a| a.workflow_id.clone())
                .collect()
        };

        let mut expired = Vec::new();
        for workflow_id in expired_ids {
            if let Some(approval) = self.resolve(&workflow_id).await? {
                warn!(workflow_id = %approval.workflow_id, "approval timed out");
                expired.push(approval);
            }
        }

        expired.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryStore;
    use chrono::Duration;
    use serde_json::json;

    fn request() -> ApprovalRequest {
        ApprovalRequest::new("architecture_proposal", json!({"design": "v1"}))
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let manager = ApprovalManager::new(InMemoryStore::shared());

        manager.create("wf-1", request(), 1800).await.unwrap();
        assert_eq!(manager.list_pending().await.len(), 1);

        let resolved = manager.resolve("wf-1").await.unwrap();
        assert!(resolved.is_some());
        assert!(manager.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_resolve_is_idempotent() {
        let manager = ApprovalManager::new(InMemoryStore::shared());
        manager.create("wf-1", request(), 1800).await.unwrap();

        assert!(manager.resolve("wf-1").await.unwrap().is_some());
        assert!(manager.resolve("wf-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_workflow_resolve_is_noop() {
        let manager = ApprovalManager::new(InMemoryStore::shared());
        assert!(manager.resolve("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_reloads_from_store() {
        let store = InMemoryStore::shared();

        let first = ApprovalManager::new(store.clone());
        first.create("wf-1", request(), 1800).await.unwrap();
        drop(first);

        // A fresh manager over the same store sees the pending entry.
        let second = ApprovalManager::new(store);
        assert_eq!(second.restore().await.unwrap(), 1);
        assert_eq!(second.list_pending().await.len(), 1);
        assert!(second.resolve("wf-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn resolve_falls_back_to_store_without_restore() {
        let store = InMemoryStore::shared();
        ApprovalManager::new(store.clone())
            .create("wf-1", request(), 1800)
            .await
            .unwrap();

        let fresh = ApprovalManager::new(store);
        assert!(fresh.resolve("wf-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_expires_old_approvals_only() {
        let manager = ApprovalManager::new(InMemoryStore::shared());
        manager.create("wf-old", request(), 0).await.unwrap();
        manager.create("wf-new", request(), 3600).await.unwrap();

        let expired = manager.sweep(Utc::now() + Duration::seconds(1)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].workflow_id, "wf-old");
        assert_eq!(manager.list_pending().await.len(), 1);
    }
}
