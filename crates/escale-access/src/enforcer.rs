//! Enforcement helper for the surrounding CRUD layers.
//!
//! Every tenant-scoped operation calls [`AccessEnforcer::check`] with
//! the actor, tenant snapshot, and the module/action pair mapped from
//! the resource and HTTP verb, before executing. A denial becomes a
//! [`EscaleError::Permission`] (HTTP 403); the reason code is logged
//! server-side and never surfaced to the client, so entitlement
//! details cannot be probed.

use escale_core::authz::{self, AuthorizationContext, Decision};
use escale_core::catalog::ModuleCatalog;
use escale_core::error::{EscaleError, EscaleResult};
use escale_core::models::tenant::Tenant;
use escale_core::models::user::User;
use tracing::debug;

/// Policy enforcement point wrapping the pure decision engine.
#[derive(Debug, Clone)]
pub struct AccessEnforcer {
    catalog: ModuleCatalog,
}

impl AccessEnforcer {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Decide and convert: `Allow` passes, `Deny` becomes a
    /// `Permission` error after logging the reason code.
    pub fn check(
        &self,
        actor: &User,
        tenant: Option<&Tenant>,
        module: &str,
        action: &str,
    ) -> EscaleResult<()> {
        let ctx = AuthorizationContext {
            actor,
            tenant,
            module,
            action,
        };
        match authz::decide(&self.catalog, &ctx)? {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                debug!(
                    actor_id = %actor.id,
                    tenant_id = ?tenant.map(|t| t.id),
                    module,
                    action,
                    reason = %reason,
                    "Access denied"
                );
                Err(EscaleError::Permission {
                    reason: reason.to_string(),
                })
            }
        }
    }

    /// Raw decision, for callers that need the reason without the
    /// error conversion (audit trails, batch checks).
    pub fn decide(
        &self,
        actor: &User,
        tenant: Option<&Tenant>,
        module: &str,
        action: &str,
    ) -> EscaleResult<Decision> {
        let ctx = AuthorizationContext {
            actor,
            tenant,
            module,
            action,
        };
        authz::decide(&self.catalog, &ctx)
    }

    /// Module ids the actor can at least read in the given tenant;
    /// feeds navigation rendering only.
    pub fn accessible_modules<'a>(
        &'a self,
        actor: &User,
        tenant: Option<&Tenant>,
    ) -> Vec<&'a str> {
        authz::accessible_modules(&self.catalog, actor, tenant)
    }
}
