//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account status. Only `Actif` users may authenticate or act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Actif,
    Suspendu,
    EnAttente,
    Rejete,
}

/// Role plus tenant bindings, as one tagged variant so that invalid
/// combinations (a superadmin bound to a tenant, an agency owner with
/// two tenants) are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Global operator: bound to no tenant, implicitly all.
    Superadmin,
    /// Tenant owner/administrator of exactly one agency.
    Agence { tenant_id: Uuid },
    /// Tenant operator, possibly working across several agencies.
    /// Must be bound to at least one.
    Agent { tenant_ids: Vec<Uuid> },
}

impl Role {
    pub fn is_superadmin(&self) -> bool {
        matches!(self, Role::Superadmin)
    }

    /// True when this role is the owning `Agence` of the given tenant.
    pub fn owns_tenant(&self, tenant_id: Uuid) -> bool {
        matches!(self, Role::Agence { tenant_id: own } if *own == tenant_id)
    }

    /// True when this role is bound to the given tenant (owner or agent).
    pub fn is_bound_to(&self, tenant_id: Uuid) -> bool {
        match self {
            Role::Superadmin => false,
            Role::Agence { tenant_id: own } => *own == tenant_id,
            Role::Agent { tenant_ids } => tenant_ids.contains(&tenant_id),
        }
    }

    /// The tenant ids this role is explicitly bound to.
    /// Empty for superadmins.
    pub fn bound_tenants(&self) -> Vec<Uuid> {
        match self {
            Role::Superadmin => Vec::new(),
            Role::Agence { tenant_id } => vec![*tenant_id],
            Role::Agent { tenant_ids } => tenant_ids.clone(),
        }
    }
}

/// A per-user, per-module list of allowed actions.
///
/// Meaningful for `Agent` users: agency owners implicitly hold every
/// action on every module their tenant is entitled to, and superadmins
/// bypass grants entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub module: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique login email.
    pub email: String,
    /// Argon2id PHC-format password verifier.
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub grants: Vec<Grant>,
    /// Optimistic-concurrency token; bumped on every update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new user.
///
/// `password_hash` is the already-hashed verifier; raw passwords never
/// reach the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub grants: Vec<Grant>,
}

/// Fields that can be updated on an existing user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub display_name: Option<String>,
    pub status: Option<UserStatus>,
    pub grants: Option<Vec<Grant>>,
    pub password_hash: Option<String>,
}
