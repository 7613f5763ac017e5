//! Module entitlement request — the workflow record by which a tenant
//! asks for additional feature modules.
//!
//! Requests are append-only history: once a superadmin decides one it
//! is immutable and serves as the audit trail for entitlement changes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRequest {
    pub id: Uuid,
    /// The tenant asking for the modules.
    pub tenant_id: Uuid,
    /// Requested module ids. Validated against the catalog on creation.
    pub modules: BTreeSet<String>,
    /// Free-text justification from the requesting agency.
    pub message: String,
    pub status: RequestStatus,
    /// Superadmin comment recorded with the decision.
    pub admin_comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Superadmin who made the decision.
    pub decided_by: Option<Uuid>,
    /// Optimistic-concurrency token; bumped on decision.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields required to open a new module request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModuleRequest {
    pub tenant_id: Uuid,
    pub modules: BTreeSet<String>,
    pub message: String,
}

/// Terminal decision applied to a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideModuleRequest {
    /// `Approved` or `Rejected`; `Pending` is not a decision.
    pub status: RequestStatus,
    pub admin_comment: Option<String>,
    pub decided_by: Uuid,
}
