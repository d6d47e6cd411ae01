//! Governance decisions returned by the hub's `/authorize` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ApprovalId, DecisionId, PolicyId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Allow {
        decision_id: DecisionId,
        matched_policy: Option<PolicyId>,
        policy_version: String,
    },
    Deny {
        decision_id: DecisionId,
        matched_policy: Option<PolicyId>,
        reason: String,
        policy_version: String,
    },
    RequireApproval {
        decision_id: DecisionId,
        approval_id: ApprovalId,
        matched_policy: Option<PolicyId>,
        policy_version: String,
    },
}

impl Decision {
    pub fn decision_id(&self) -> DecisionId {
        match self {
            Decision::Allow { decision_id, .. }
            | Decision::Deny { decision_id, .. }
            | Decision::RequireApproval { decision_id, .. } => *decision_id,
        }
    }

    pub fn policy_version(&self) -> &str {
        match self {
            Decision::Allow { policy_version, .. }
            | Decision::Deny { policy_version, .. }
            | Decision::RequireApproval { policy_version, .. } => policy_version,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// A short-lived token asserting a prior `Decision::Allow` for a specific
/// request hash, cached in-process on the kernel to survive brief hub
/// outages under a read-open fail mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionToken {
    pub decision: Decision,
    pub request_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DecisionToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A pending human approval created by a `RequireApproval` decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approval_id: ApprovalId,
    pub decision_id: DecisionId,
    pub tenant_id: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}
