//! User/agent directory — account creation, authentication, and grant
//! management.

use escale_core::catalog::ModuleCatalog;
use escale_core::error::{EscaleError, EscaleResult};
use escale_core::models::user::{CreateUser, Grant, Role, UpdateUser, User, UserStatus};
use escale_core::repository::{PaginatedResult, Pagination, TenantRepository, UserRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::password;

/// Input for creating a directory account.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    /// Raw password; hashed with Argon2id (+ configured pepper) before
    /// it reaches the repository.
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub grants: Vec<Grant>,
    /// Initial account status; defaults to `EnAttente` when omitted.
    pub status: Option<UserStatus>,
}

/// Directory service.
///
/// Generic over repository implementations so the directory layer has
/// no dependency on the database crate.
pub struct Directory<U: UserRepository, T: TenantRepository> {
    users: U,
    tenants: T,
    catalog: ModuleCatalog,
    config: AccessConfig,
}

impl<U: UserRepository, T: TenantRepository> Directory<U, T> {
    pub fn new(users: U, tenants: T, catalog: ModuleCatalog, config: AccessConfig) -> Self {
        Self {
            users,
            tenants,
            catalog,
            config,
        }
    }

    /// Create a user account.
    ///
    /// Grants are validated against both the catalog and the bound
    /// tenants' current entitlement — a grant may never pre-empt
    /// entitlement the tenant does not hold.
    pub async fn create_user(&self, input: NewUser) -> EscaleResult<User> {
        if input.password.chars().count() < self.config.min_password_length {
            return Err(EscaleError::Validation {
                message: format!(
                    "password must be at least {} characters",
                    self.config.min_password_length
                ),
            });
        }

        if let Role::Agent { tenant_ids } = &input.role {
            if tenant_ids.is_empty() {
                return Err(EscaleError::Validation {
                    message: "agent must be bound to at least one tenant".into(),
                });
            }
        }

        match self.users.get_by_email(&input.email).await {
            Ok(_) => {
                return Err(EscaleError::Validation {
                    message: format!("email already registered: {}", input.email),
                });
            }
            Err(EscaleError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        self.validate_grants(&input.role, &input.grants).await?;

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())
                .map_err(EscaleError::from)?;

        let user = self
            .users
            .create(CreateUser {
                email: input.email,
                password_hash,
                display_name: input.display_name,
                role: input.role,
                status: input.status.unwrap_or(UserStatus::EnAttente),
                grants: input.grants,
            })
            .await?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email, wrong password, and non-active account all fail
    /// with the same generic error so that accounts cannot be
    /// enumerated. The unknown-email path still performs an Argon2id
    /// computation to level response timing.
    pub async fn authenticate(&self, email: &str, raw_password: &str) -> EscaleResult<User> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(EscaleError::NotFound { .. }) => {
                let _ = password::hash_password(raw_password, self.config.pepper.as_deref());
                debug!(reason = "unknown_email", "Authentication refused");
                return Err(AccessError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            raw_password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )
        .map_err(EscaleError::from)?;

        if !valid {
            debug!(reason = "bad_password", "Authentication refused");
            return Err(AccessError::InvalidCredentials.into());
        }

        if user.status != UserStatus::Actif {
            debug!(reason = "account_not_active", "Authentication refused");
            return Err(AccessError::AccountNotActive.into());
        }

        Ok(user)
    }

    /// Replace a user's grant list.
    ///
    /// Allowed for superadmins, or for the `Agence` owner of every
    /// tenant the target user is bound to. Grants are re-validated
    /// under the same rules as at creation.
    pub async fn update_grants(
        &self,
        user_id: Uuid,
        new_grants: Vec<Grant>,
        actor: &User,
    ) -> EscaleResult<User> {
        let target = self.users.get_by_id(user_id).await?;
        self.require_manager(actor, &target)?;

        self.validate_grants(&target.role, &new_grants).await?;

        let updated = self
            .users
            .update(
                target.id,
                target.version,
                UpdateUser {
                    grants: Some(new_grants),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %updated.id, updated_by = %actor.id, "User grants updated");
        Ok(updated)
    }

    /// Change a user's account status (activation, suspension).
    /// Same permission rule as [`Directory::update_grants`].
    pub async fn set_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
        actor: &User,
    ) -> EscaleResult<User> {
        let target = self.users.get_by_id(user_id).await?;
        self.require_manager(actor, &target)?;

        let updated = self
            .users
            .update(
                target.id,
                target.version,
                UpdateUser {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            user_id = %updated.id,
            status = ?updated.status,
            updated_by = %actor.id,
            "User status changed"
        );
        Ok(updated)
    }

    pub async fn get(&self, user_id: Uuid) -> EscaleResult<User> {
        self.users.get_by_id(user_id).await
    }

    pub async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<User>> {
        self.users.list_by_tenant(tenant_id, pagination).await
    }

    fn require_manager(&self, actor: &User, target: &User) -> EscaleResult<()> {
        if actor.status != UserStatus::Actif {
            return Err(EscaleError::Permission {
                reason: "actor is not active".into(),
            });
        }
        if actor.role.is_superadmin() {
            return Ok(());
        }
        let bound = target.role.bound_tenants();
        let owns_all = !bound.is_empty()
            && bound
                .iter()
                .all(|tenant_id| actor.role.owns_tenant(*tenant_id));
        if owns_all {
            Ok(())
        } else {
            Err(EscaleError::Permission {
                reason: "actor does not own every tenant the user is bound to".into(),
            })
        }
    }

    /// Grant entries must name a catalog module, stay within its
    /// recognized actions, and target a module some bound tenant
    /// currently holds.
    async fn validate_grants(&self, role: &Role, grants: &[Grant]) -> EscaleResult<()> {
        if grants.is_empty() {
            return Ok(());
        }

        if role.is_superadmin() {
            return Err(EscaleError::Validation {
                message: "superadmin accounts carry no grant list".into(),
            });
        }

        let mut entitled = std::collections::BTreeSet::new();
        for tenant_id in role.bound_tenants() {
            let tenant = self.tenants.get_by_id(tenant_id).await?;
            entitled.extend(tenant.active_modules);
        }

        for grant in grants {
            if !self.catalog.contains(&grant.module) {
                return Err(EscaleError::Validation {
                    message: format!("unknown module in grant: {}", grant.module),
                });
            }
            for action in &grant.actions {
                if !self.catalog.is_valid_action(&grant.module, action) {
                    return Err(EscaleError::Validation {
                        message: format!(
                            "action {action} is not recognized for module {}",
                            grant.module
                        ),
                    });
                }
            }
            if !entitled.contains(&grant.module) {
                return Err(EscaleError::Validation {
                    message: format!(
                        "module {} is not entitled to the user's tenants",
                        grant.module
                    ),
                });
            }
        }

        Ok(())
    }
}
