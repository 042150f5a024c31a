//! Approval Gate Types
//!
//! A workflow suspends when an agent (typically the architect) produces a
//! proposal requiring a human decision. The pending entry is persisted so a
//! crash plus restart followed by a decision still resumes correctly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Request emitted by an agent output that opens an approval gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Kind of decision, e.g. `architecture_proposal`.
    pub action_type: String,
    /// Opaque proposal payload presented to the client.
    pub payload: Value,
}

impl ApprovalRequest {
    pub fn new(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }
}

/// A persisted pending approval awaiting an external decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub approval_id: Uuid,
    pub workflow_id: String,
    pub action_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    /// After this instant the approval is auto-rejected with reason `timeout`.
    pub timeout_at: DateTime<Utc>,
}

impl PendingApproval {
    /// Record a new pending approval with the given timeout.
    pub fn new(workflow_id: impl Into<String>, request: ApprovalRequest, timeout_seconds: u64) -> Self {
        let created_at = Utc::now();
        Self {
            approval_id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            action_type: request.action_type,
            payload: request.payload,
            created_at,
            timeout_at: created_at + Duration::seconds(timeout_seconds as i64),
        }
    }

    /// Returns `true` once the timeout has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.timeout_at
    }
}

/// Decision variants an external surface can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    Modified,
}

/// Full decision payload bridged back into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResolution {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Value>,
}

impl ApprovalResolution {
    pub fn approved() -> Self {
        Self {
            decision: Decision::Approved,
            feedback: None,
            modifications: None,
        }
    }

    pub fn rejected(feedback: Option<String>) -> Self {
        Self {
            decision: Decision::Rejected,
            feedback,
            modifications: None,
        }
    }

    pub fn modified(modifications: Value) -> Self {
        Self {
            decision: Decision::Modified,
            feedback: None,
            modifications: Some(modifications),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pending_expiry() {
        let request = ApprovalRequest::new("architecture_proposal", json!({"design": "layered"}));
        let pending = PendingApproval::new("wf-1", request, 1800);

        assert_eq!(pending.workflow_id, "wf-1");
        assert!(!pending.is_expired(pending.created_at));
        assert!(pending.is_expired(pending.timeout_at));
    }

    #[test]
    fn resolution_constructors() {
        assert_eq!(ApprovalResolution::approved().decision, Decision::Approved);

        let rejected = ApprovalResolution::rejected(Some("missing error handling".into()));
        assert_eq!(rejected.decision, Decision::Rejected);
        assert_eq!(rejected.feedback.as_deref(), Some("missing error handling"));

        let modified = ApprovalResolution::modified(json!({"database": "postgres"}));
        assert_eq!(modified.decision, Decision::Modified);
        assert!(modified.modifications.is_some());
    }

    #[test]
    fn pending_serialization_roundtrip() {
        let pending = PendingApproval::new(
            "wf-9",
            ApprovalRequest::new("architecture_proposal", json!({"layers": 3})),
            60,
        );
        let json = serde_json::to_string(&pending).unwrap();
        let decoded: PendingApproval = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, pending);
    }
}
