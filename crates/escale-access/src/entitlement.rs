//! Module entitlement workflow — the request/approval pipeline by
//! which a tenant gains feature modules.
//!
//! Approval here is the only path by which a tenant's `active_modules`
//! grows: tenant self-service activation is disallowed so entitlement
//! stays centrally controlled.

use std::collections::BTreeSet;

use escale_core::catalog::ModuleCatalog;
use escale_core::error::{EscaleError, EscaleResult};
use escale_core::models::module_request::{
    CreateModuleRequest, DecideModuleRequest, ModuleRequest, RequestStatus,
};
use escale_core::models::tenant::{Tenant, UpdateTenant};
use escale_core::models::user::{User, UserStatus};
use escale_core::repository::{
    ModuleRequestRepository, PaginatedResult, Pagination, TenantRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::guard::require_superadmin;

/// Superadmin verdict on a pending module request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Approve,
    Reject,
}

/// Attempts at re-applying the tenant-side module-set write when a
/// concurrent writer bumps the version in between.
const MODULE_SET_RETRIES: usize = 3;

/// Module request/approval workflow service.
pub struct EntitlementWorkflow<T: TenantRepository, R: ModuleRequestRepository> {
    tenants: T,
    requests: R,
    catalog: ModuleCatalog,
}

impl<T: TenantRepository, R: ModuleRequestRepository> EntitlementWorkflow<T, R> {
    pub fn new(tenants: T, requests: R, catalog: ModuleCatalog) -> Self {
        Self {
            tenants,
            requests,
            catalog,
        }
    }

    /// Open a module request on behalf of a tenant.
    ///
    /// Only the owning `Agence` user may ask for modules, and every
    /// requested id must exist in the catalog.
    pub async fn request_modules(
        &self,
        tenant_id: Uuid,
        modules: BTreeSet<String>,
        message: String,
        actor: &User,
    ) -> EscaleResult<ModuleRequest> {
        if modules.is_empty() {
            return Err(EscaleError::Validation {
                message: "module request must name at least one module".into(),
            });
        }
        for module in &modules {
            if !self.catalog.contains(module) {
                return Err(EscaleError::Validation {
                    message: format!("unknown module: {module}"),
                });
            }
        }

        if actor.status != UserStatus::Actif || !actor.role.owns_tenant(tenant_id) {
            return Err(EscaleError::Permission {
                reason: "only the owning agency may request modules".into(),
            });
        }

        // Ensure the tenant exists before recording anything.
        self.tenants.get_by_id(tenant_id).await?;

        let request = self
            .requests
            .create(CreateModuleRequest {
                tenant_id,
                modules,
                message,
            })
            .await?;

        // Keep the tenant's requested_modules mirror current for
        // navigation display.
        self.refresh_requested_modules(tenant_id).await?;

        info!(
            request_id = %request.id,
            tenant_id = %tenant_id,
            "Module request opened"
        );
        Ok(request)
    }

    /// Decide a pending module request. Superadmin-only; the decision
    /// is terminal and, on approval, unions the requested modules into
    /// the tenant's `active_modules` (an idempotent union — modules
    /// already active neither error nor duplicate).
    pub async fn decide_request(
        &self,
        request_id: Uuid,
        decision: RequestDecision,
        comment: Option<String>,
        actor: &User,
    ) -> EscaleResult<ModuleRequest> {
        require_superadmin(actor)?;

        let request = self.requests.get_by_id(request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(EscaleError::InvalidState {
                message: format!("request already decided: {:?}", request.status),
            });
        }

        let status = match decision {
            RequestDecision::Approve => RequestStatus::Approved,
            RequestDecision::Reject => RequestStatus::Rejected,
        };

        let decided = self
            .requests
            .decide(
                request.id,
                request.version,
                DecideModuleRequest {
                    status,
                    admin_comment: comment,
                    decided_by: actor.id,
                },
            )
            .await?;

        // Apply the entitlement change to the tenant aggregate. The
        // request record is already decided; the union below is
        // idempotent, so a retry after a version race converges.
        self.apply_decision_to_tenant(&decided).await?;

        info!(
            request_id = %decided.id,
            tenant_id = %decided.tenant_id,
            status = ?decided.status,
            decided_by = %actor.id,
            "Module request decided"
        );
        Ok(decided)
    }

    pub async fn get(&self, request_id: Uuid) -> EscaleResult<ModuleRequest> {
        self.requests.get_by_id(request_id).await
    }

    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<ModuleRequest>> {
        self.requests.list_by_tenant(tenant_id, pagination).await
    }

    /// Requests awaiting a decision, for the superadmin console.
    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<ModuleRequest>> {
        self.requests.list_pending(pagination).await
    }

    async fn apply_decision_to_tenant(&self, decided: &ModuleRequest) -> EscaleResult<Tenant> {
        let mut attempt = 0;
        loop {
            let tenant = self.tenants.get_by_id(decided.tenant_id).await?;

            let active_modules = match decided.status {
                RequestStatus::Approved => {
                    let mut active = tenant.active_modules.clone();
                    active.extend(decided.modules.iter().cloned());
                    Some(active)
                }
                _ => None,
            };
            let requested_modules = self.pending_module_union(decided.tenant_id).await?;

            let result = self
                .tenants
                .update(
                    tenant.id,
                    tenant.version,
                    UpdateTenant {
                        active_modules,
                        requested_modules: Some(requested_modules),
                        ..Default::default()
                    },
                )
                .await;

            match result {
                Ok(updated) => return Ok(updated),
                Err(EscaleError::Conflict { .. }) if attempt < MODULE_SET_RETRIES => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Recompute the tenant's requested_modules mirror from its
    /// still-pending requests, then write it with the same bounded
    /// retry as the decision path.
    async fn refresh_requested_modules(&self, tenant_id: Uuid) -> EscaleResult<Tenant> {
        let mut attempt = 0;
        loop {
            let tenant = self.tenants.get_by_id(tenant_id).await?;
            let requested_modules = self.pending_module_union(tenant_id).await?;

            let result = self
                .tenants
                .update(
                    tenant.id,
                    tenant.version,
                    UpdateTenant {
                        requested_modules: Some(requested_modules),
                        ..Default::default()
                    },
                )
                .await;

            match result {
                Ok(updated) => return Ok(updated),
                Err(EscaleError::Conflict { .. }) if attempt < MODULE_SET_RETRIES => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Union of module ids across a tenant's pending requests, so ids
    /// wanted by two requests survive the decision of one.
    async fn pending_module_union(&self, tenant_id: Uuid) -> EscaleResult<BTreeSet<String>> {
        let pending = self.requests.list_pending_for_tenant(tenant_id).await?;
        Ok(pending
            .into_iter()
            .flat_map(|request| request.modules)
            .collect())
    }
}
