//! Tenant registry — agency registration and lifecycle workflow.

use escale_core::error::{EscaleError, EscaleResult};
use escale_core::models::tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant};
use escale_core::models::user::User;
use escale_core::repository::{PaginatedResult, Pagination, TenantRepository};
use tracing::info;
use uuid::Uuid;

use crate::guard::require_superadmin;

/// Superadmin verdict on a pending tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// Tenant registration and lifecycle service.
///
/// Generic over the repository implementation so that the workflow
/// layer has no dependency on the database crate.
pub struct TenantRegistry<T: TenantRepository> {
    tenants: T,
}

impl<T: TenantRepository> TenantRegistry<T> {
    pub fn new(tenants: T) -> Self {
        Self { tenants }
    }

    /// Register a new agency. The tenant starts `Pending` with no
    /// entitled modules; it becomes operational only through
    /// [`TenantRegistry::decide_approval`].
    pub async fn register(&self, input: CreateTenant) -> EscaleResult<Tenant> {
        // The contact email is the agency's natural key.
        match self.tenants.get_by_contact_email(&input.contact_email).await {
            Ok(_) => {
                return Err(EscaleError::Validation {
                    message: format!(
                        "contact email already registered: {}",
                        input.contact_email
                    ),
                });
            }
            Err(EscaleError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let tenant = self.tenants.create(input).await?;
        info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant registered");
        Ok(tenant)
    }

    /// Approve or reject a pending tenant. Superadmin-only; rejection
    /// is terminal.
    pub async fn decide_approval(
        &self,
        tenant_id: Uuid,
        decision: ApprovalDecision,
        actor: &User,
    ) -> EscaleResult<Tenant> {
        require_superadmin(actor)?;

        let tenant = self.tenants.get_by_id(tenant_id).await?;
        if tenant.status != TenantStatus::Pending {
            return Err(EscaleError::InvalidState {
                message: format!("tenant is not pending: {:?}", tenant.status),
            });
        }

        let status = match decision {
            ApprovalDecision::Approve => TenantStatus::Approved,
            ApprovalDecision::Reject => TenantStatus::Rejected,
        };

        let updated = self
            .tenants
            .update(
                tenant.id,
                tenant.version,
                UpdateTenant {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            tenant_id = %updated.id,
            status = ?updated.status,
            decided_by = %actor.id,
            "Tenant approval decided"
        );
        Ok(updated)
    }

    /// Suspend an approved tenant. All module actions for its users
    /// are denied from the next authorization decision onwards.
    pub async fn suspend(&self, tenant_id: Uuid, actor: &User) -> EscaleResult<Tenant> {
        self.transition(
            tenant_id,
            TenantStatus::Approved,
            TenantStatus::Suspended,
            actor,
        )
        .await
    }

    /// Reinstate a suspended tenant back to `Approved`.
    pub async fn reinstate(&self, tenant_id: Uuid, actor: &User) -> EscaleResult<Tenant> {
        self.transition(
            tenant_id,
            TenantStatus::Suspended,
            TenantStatus::Approved,
            actor,
        )
        .await
    }

    async fn transition(
        &self,
        tenant_id: Uuid,
        from: TenantStatus,
        to: TenantStatus,
        actor: &User,
    ) -> EscaleResult<Tenant> {
        require_superadmin(actor)?;

        let tenant = self.tenants.get_by_id(tenant_id).await?;
        if tenant.status != from {
            return Err(EscaleError::InvalidState {
                message: format!("tenant is {:?}, expected {from:?}", tenant.status),
            });
        }

        let updated = self
            .tenants
            .update(
                tenant.id,
                tenant.version,
                UpdateTenant {
                    status: Some(to),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            tenant_id = %updated.id,
            status = ?updated.status,
            decided_by = %actor.id,
            "Tenant status changed"
        );
        Ok(updated)
    }

    pub async fn get(&self, tenant_id: Uuid) -> EscaleResult<Tenant> {
        self.tenants.get_by_id(tenant_id).await
    }

    pub async fn list(&self, pagination: Pagination) -> EscaleResult<PaginatedResult<Tenant>> {
        self.tenants.list(pagination).await
    }

    /// Tenants awaiting an approval decision, for the superadmin
    /// console.
    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<Tenant>> {
        self.tenants
            .list_by_status(TenantStatus::Pending, pagination)
            .await
    }
}
