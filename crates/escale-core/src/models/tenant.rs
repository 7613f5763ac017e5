//! Tenant (agency) domain model.
//!
//! A tenant is an onboarded travel agency — the unit of data isolation.
//! Every other record in the system carries a tenant identity and is
//! only reachable through an authorization decision against it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a tenant.
///
/// Created as `Pending`; a superadmin moves it to `Approved` or
/// `Rejected` (terminal). Approved tenants may be suspended and
/// reinstated. Any status other than `Approved` denies all module
/// actions for the tenant's users, regardless of individual grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Agency display name.
    pub name: String,
    /// Unique contact email for the agency.
    pub contact_email: String,
    pub phone: String,
    pub address: String,
    pub status: TenantStatus,
    /// Module ids the tenant is currently entitled to use.
    ///
    /// Only mutated by the tenant-approval and module-entitlement
    /// workflows, never directly by tenant-side actors.
    pub active_modules: BTreeSet<String>,
    /// Module ids awaiting superadmin decision, denormalized from the
    /// tenant's pending module requests for display purposes.
    pub requested_modules: BTreeSet<String>,
    /// Optimistic-concurrency token; bumped on every update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new tenant.
///
/// New tenants always start `Pending` with empty module sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub contact_email: String,
    pub phone: String,
    pub address: String,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<TenantStatus>,
    pub active_modules: Option<BTreeSet<String>>,
    pub requested_modules: Option<BTreeSet<String>>,
}
