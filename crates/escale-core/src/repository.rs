//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Mutating operations take the
//! caller's `expected_version` so every write is an atomic
//! read-modify-write: a write against a stale version fails with
//! [`EscaleError::Conflict`] and the caller must reload and retry.

use uuid::Uuid;

use crate::error::EscaleResult;
use crate::models::{
    module_request::{CreateModuleRequest, DecideModuleRequest, ModuleRequest},
    tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait TenantRepository: Send + Sync {
    /// Create a tenant in `Pending` status with empty module sets.
    fn create(&self, input: CreateTenant) -> impl Future<Output = EscaleResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = EscaleResult<Tenant>> + Send;
    fn get_by_contact_email(
        &self,
        email: &str,
    ) -> impl Future<Output = EscaleResult<Tenant>> + Send;
    /// Version-guarded update; bumps `version` and `updated_at`.
    fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateTenant,
    ) -> impl Future<Output = EscaleResult<Tenant>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = EscaleResult<PaginatedResult<Tenant>>> + Send;
    fn list_by_status(
        &self,
        status: TenantStatus,
        pagination: Pagination,
    ) -> impl Future<Output = EscaleResult<PaginatedResult<Tenant>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = EscaleResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = EscaleResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = EscaleResult<User>> + Send;
    /// Version-guarded update; bumps `version` and `updated_at`.
    fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateUser,
    ) -> impl Future<Output = EscaleResult<User>> + Send;
    /// Users bound to the given tenant (owner or agent).
    fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = EscaleResult<PaginatedResult<User>>> + Send;
}

pub trait ModuleRequestRepository: Send + Sync {
    fn create(
        &self,
        input: CreateModuleRequest,
    ) -> impl Future<Output = EscaleResult<ModuleRequest>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = EscaleResult<ModuleRequest>> + Send;
    /// Version-guarded terminal decision: stamps status, comment,
    /// decider, and `decided_at`. The record is immutable afterwards.
    fn decide(
        &self,
        id: Uuid,
        expected_version: u64,
        input: DecideModuleRequest,
    ) -> impl Future<Output = EscaleResult<ModuleRequest>> + Send;
    fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = EscaleResult<PaginatedResult<ModuleRequest>>> + Send;
    fn list_pending(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = EscaleResult<PaginatedResult<ModuleRequest>>> + Send;
    /// All still-pending requests of one tenant, for recomputing the
    /// tenant's `requested_modules` mirror after a decision.
    fn list_pending_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = EscaleResult<Vec<ModuleRequest>>> + Send;
}
