//! Authorization decision engine.
//!
//! [`decide`] is the single choke point every tenant-scoped operation
//! in the system goes through: a pure, side-effect-free function over
//! immutable snapshots of the actor and target tenant, safe under
//! arbitrary concurrency.
//!
//! Denials are first-class values carrying a reason code for audit
//! logging, not errors. The function returns `Err` only on malformed
//! input — an unknown module id or a missing tenant context — which
//! callers must treat as a programming error at the call site, never
//! as a user-facing authorization failure.

use crate::catalog::{ModuleCatalog, actions};
use crate::error::{EscaleError, EscaleResult};
use crate::models::tenant::{Tenant, TenantStatus};
use crate::models::user::{Role, User, UserStatus};

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Reason code attached to a denial, surfaced only in server logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The actor's account is not `Actif`.
    ActorInactive,
    /// The target tenant is not `Approved` (covers suspension).
    TenantNotActive,
    /// The module is not in the tenant's `active_modules`.
    ModuleNotEntitled,
    /// The agent is bound to the tenant but holds no grant covering
    /// this module/action pair.
    ActionNotGranted,
    /// Fail-closed default: no rule matched.
    NoMatchingRule,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            DenyReason::ActorInactive => "actor_inactive",
            DenyReason::TenantNotActive => "tenant_not_active",
            DenyReason::ModuleNotEntitled => "module_not_entitled",
            DenyReason::ActionNotGranted => "action_not_granted",
            DenyReason::NoMatchingRule => "no_matching_rule",
        };
        f.write_str(code)
    }
}

/// Per-request evaluation context, constructed at the request boundary
/// and never persisted.
///
/// `tenant` is the tenant the request claims to operate against —
/// multi-tenant agents pick one at a time, and the "switch agency" UI
/// action merely changes which tenant snapshot is attached here.
/// `None` is only meaningful for superadmin actors.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext<'a> {
    pub actor: &'a User,
    pub tenant: Option<&'a Tenant>,
    pub module: &'a str,
    pub action: &'a str,
}

/// Decide whether `ctx.actor` may perform `ctx.action` on `ctx.module`
/// within `ctx.tenant`.
///
/// Rules are evaluated in order; the first match wins and the default
/// is deny. Tenant-level gates (status, entitlement) short-circuit
/// before user-level grants are consulted, so a suspended tenant can
/// never leak access through a stale agent grant.
pub fn decide(catalog: &ModuleCatalog, ctx: &AuthorizationContext<'_>) -> EscaleResult<Decision> {
    // Rule 1: inactive actors are denied outright.
    if ctx.actor.status != UserStatus::Actif {
        return Ok(Decision::Deny(DenyReason::ActorInactive));
    }

    // Rule 2: superadmins are global operators and bypass tenant and
    // module checks entirely, even for module ids outside the catalog.
    if ctx.actor.role.is_superadmin() {
        return Ok(Decision::Allow);
    }

    let tenant = ctx.tenant.ok_or(EscaleError::TenantContext)?;

    // An unknown module id past this point is a caller bug, not a
    // denial: entitlement sets are catalog-validated on write.
    if !catalog.contains(ctx.module) {
        return Err(EscaleError::Validation {
            message: format!("unknown module: {}", ctx.module),
        });
    }

    // Rule 3: tenant-level activation gate.
    if tenant.status != TenantStatus::Approved {
        return Ok(Decision::Deny(DenyReason::TenantNotActive));
    }

    // Rule 4: tenant-level entitlement gate.
    if !tenant.active_modules.contains(ctx.module) {
        return Ok(Decision::Deny(DenyReason::ModuleNotEntitled));
    }

    match &ctx.actor.role {
        // Rule 5: the owning agency has every recognized action on
        // every module its tenant is entitled to.
        Role::Agence { tenant_id } if *tenant_id == tenant.id => {
            if catalog.is_valid_action(ctx.module, ctx.action) {
                Ok(Decision::Allow)
            } else {
                Ok(Decision::Deny(DenyReason::NoMatchingRule))
            }
        }
        // Rule 6: agents act only through an explicit grant, and only
        // within the binding set that includes the target tenant.
        Role::Agent { tenant_ids } if tenant_ids.contains(&tenant.id) => {
            let granted = ctx
                .actor
                .grants
                .iter()
                .find(|grant| grant.module == ctx.module)
                .is_some_and(|grant| grant.actions.iter().any(|a| a == ctx.action));
            if granted {
                Ok(Decision::Allow)
            } else {
                Ok(Decision::Deny(DenyReason::ActionNotGranted))
            }
        }
        // Rule 7: fail-closed default (agence of another tenant,
        // agent not bound here).
        _ => Ok(Decision::Deny(DenyReason::NoMatchingRule)),
    }
}

/// Module ids the actor can at least read within the given tenant,
/// derived by evaluating [`decide`] with the `lire` action across the
/// full catalog.
///
/// Feeds navigation rendering only — UI hiding is cosmetic, never an
/// enforcement point.
pub fn accessible_modules<'c>(
    catalog: &'c ModuleCatalog,
    actor: &User,
    tenant: Option<&Tenant>,
) -> Vec<&'c str> {
    catalog
        .modules()
        .filter(|def| {
            let ctx = AuthorizationContext {
                actor,
                tenant,
                module: &def.id,
                action: actions::LIRE,
            };
            matches!(decide(catalog, &ctx), Ok(Decision::Allow))
        })
        .map(|def| def.id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::user::Grant;

    fn tenant(status: TenantStatus, modules: &[&str]) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "Agence Horizon".into(),
            contact_email: "contact@horizon.example".into(),
            phone: "+33 1 00 00 00 00".into(),
            address: "12 rue des Lilas, Paris".into(),
            status,
            active_modules: modules.iter().map(|m| m.to_string()).collect(),
            requested_modules: BTreeSet::new(),
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(role: Role, status: UserStatus, grants: Vec<Grant>) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@horizon.example", Uuid::new_v4()),
            password_hash: "$argon2id$test".into(),
            display_name: "Test User".into(),
            role,
            status,
            grants,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn grant(module: &str, actions: &[&str]) -> Grant {
        Grant {
            module: module.into(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn ctx<'a>(
        actor: &'a User,
        tenant: Option<&'a Tenant>,
        module: &'a str,
        action: &'a str,
    ) -> AuthorizationContext<'a> {
        AuthorizationContext {
            actor,
            tenant,
            module,
            action,
        }
    }

    #[test]
    fn inactive_actor_is_denied_before_anything_else() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients"]);
        for status in [
            UserStatus::Suspendu,
            UserStatus::EnAttente,
            UserStatus::Rejete,
        ] {
            let admin = user(Role::Superadmin, status, vec![]);
            let decision = decide(&catalog, &ctx(&admin, Some(&t), "clients", "lire")).unwrap();
            assert_eq!(decision, Decision::Deny(DenyReason::ActorInactive));
        }
    }

    #[test]
    fn superadmin_is_allowed_everywhere() {
        let catalog = ModuleCatalog::builtin();
        let admin = user(Role::Superadmin, UserStatus::Actif, vec![]);
        let suspended = tenant(TenantStatus::Suspended, &[]);

        // Bypasses tenant status, entitlement, even unknown modules
        // and a missing tenant context.
        for (t, module, action) in [
            (Some(&suspended), "clients", "supprimer"),
            (Some(&suspended), "inconnu", "lire"),
            (None, "factures", "exporter"),
        ] {
            let decision = decide(&catalog, &ctx(&admin, t, module, action)).unwrap();
            assert_eq!(decision, Decision::Allow);
        }
    }

    #[test]
    fn suspension_takes_precedence_over_owner_access() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Suspended, &["clients"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        let decision = decide(&catalog, &ctx(&owner, Some(&t), "clients", "lire")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TenantNotActive));
    }

    #[test]
    fn suspension_takes_precedence_over_agent_grant() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Suspended, &["clients"]);
        let agent = user(
            Role::Agent {
                tenant_ids: vec![t.id],
            },
            UserStatus::Actif,
            vec![grant("clients", &["lire", "creer"])],
        );

        let decision = decide(&catalog, &ctx(&agent, Some(&t), "clients", "lire")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TenantNotActive));
    }

    #[test]
    fn pending_and_rejected_tenants_are_not_active() {
        let catalog = ModuleCatalog::builtin();
        for status in [TenantStatus::Pending, TenantStatus::Rejected] {
            let t = tenant(status, &["clients"]);
            let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);
            let decision = decide(&catalog, &ctx(&owner, Some(&t), "clients", "lire")).unwrap();
            assert_eq!(decision, Decision::Deny(DenyReason::TenantNotActive));
        }
    }

    #[test]
    fn unentitled_module_is_denied_for_owner() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        let decision = decide(&catalog, &ctx(&owner, Some(&t), "caisse", "lire")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::ModuleNotEntitled));
    }

    #[test]
    fn owner_has_every_recognized_action_on_entitled_modules() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["factures"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        for action in ["lire", "creer", "modifier", "supprimer", "exporter"] {
            let decision = decide(&catalog, &ctx(&owner, Some(&t), "factures", action)).unwrap();
            assert_eq!(decision, Decision::Allow, "action {action}");
        }
    }

    #[test]
    fn owner_of_another_tenant_falls_through_to_default_deny() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients"]);
        let other_owner = user(
            Role::Agence {
                tenant_id: Uuid::new_v4(),
            },
            UserStatus::Actif,
            vec![],
        );

        let decision = decide(&catalog, &ctx(&other_owner, Some(&t), "clients", "lire")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingRule));
    }

    #[test]
    fn agent_grant_scenario_from_example_one() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients", "factures"]);
        let agent = user(
            Role::Agent {
                tenant_ids: vec![t.id],
            },
            UserStatus::Actif,
            vec![grant("clients", &["lire"])],
        );

        let read = decide(&catalog, &ctx(&agent, Some(&t), "clients", "lire")).unwrap();
        assert_eq!(read, Decision::Allow);

        let create = decide(&catalog, &ctx(&agent, Some(&t), "clients", "creer")).unwrap();
        assert_eq!(create, Decision::Deny(DenyReason::ActionNotGranted));

        // No grant entry at all for factures.
        let factures = decide(&catalog, &ctx(&agent, Some(&t), "factures", "lire")).unwrap();
        assert_eq!(factures, Decision::Deny(DenyReason::ActionNotGranted));
    }

    #[test]
    fn agent_not_bound_to_target_tenant_hits_default_deny() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients"]);
        let agent = user(
            Role::Agent {
                tenant_ids: vec![Uuid::new_v4()],
            },
            UserStatus::Actif,
            vec![grant("clients", &["lire"])],
        );

        let decision = decide(&catalog, &ctx(&agent, Some(&t), "clients", "lire")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingRule));
    }

    #[test]
    fn multi_tenant_agent_is_checked_per_target_tenant() {
        let catalog = ModuleCatalog::builtin();
        let t1 = tenant(TenantStatus::Approved, &["clients"]);
        let t2 = tenant(TenantStatus::Approved, &["clients"]);
        let agent = user(
            Role::Agent {
                tenant_ids: vec![t1.id, t2.id],
            },
            UserStatus::Actif,
            vec![grant("clients", &["lire"])],
        );

        // The same grant applies in whichever bound tenant is active.
        for t in [&t1, &t2] {
            let decision = decide(&catalog, &ctx(&agent, Some(t), "clients", "lire")).unwrap();
            assert_eq!(decision, Decision::Allow);
        }
    }

    #[test]
    fn missing_tenant_context_is_an_error_not_a_denial() {
        let catalog = ModuleCatalog::builtin();
        let agent = user(
            Role::Agent {
                tenant_ids: vec![Uuid::new_v4()],
            },
            UserStatus::Actif,
            vec![],
        );

        let err = decide(&catalog, &ctx(&agent, None, "clients", "lire")).unwrap_err();
        assert!(matches!(err, EscaleError::TenantContext));
    }

    #[test]
    fn unknown_module_is_an_error_for_tenant_actors() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        let err = decide(&catalog, &ctx(&owner, Some(&t), "inconnu", "lire")).unwrap_err();
        assert!(matches!(err, EscaleError::Validation { .. }));
    }

    #[test]
    fn unrecognized_action_falls_through_to_default_deny_for_owner() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["rapports"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        // rapports recognizes lire/exporter only.
        let decision = decide(&catalog, &ctx(&owner, Some(&t), "rapports", "supprimer")).unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingRule));
    }

    #[test]
    fn deny_reason_codes_are_stable() {
        assert_eq!(DenyReason::ActorInactive.to_string(), "actor_inactive");
        assert_eq!(DenyReason::TenantNotActive.to_string(), "tenant_not_active");
        assert_eq!(
            DenyReason::ModuleNotEntitled.to_string(),
            "module_not_entitled"
        );
        assert_eq!(
            DenyReason::ActionNotGranted.to_string(),
            "action_not_granted"
        );
        assert_eq!(DenyReason::NoMatchingRule.to_string(), "no_matching_rule");
    }

    #[test]
    fn accessible_modules_reflects_entitlement_and_grants() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Approved, &["clients", "factures", "rapports"]);

        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);
        assert_eq!(
            accessible_modules(&catalog, &owner, Some(&t)),
            vec!["clients", "factures", "rapports"]
        );

        let agent = user(
            Role::Agent {
                tenant_ids: vec![t.id],
            },
            UserStatus::Actif,
            vec![grant("factures", &["lire"]), grant("clients", &["creer"])],
        );
        // clients grant lacks `lire`, so only factures shows up.
        assert_eq!(
            accessible_modules(&catalog, &agent, Some(&t)),
            vec!["factures"]
        );

        let admin = user(Role::Superadmin, UserStatus::Actif, vec![]);
        assert_eq!(
            accessible_modules(&catalog, &admin, None).len(),
            catalog.modules().count()
        );
    }

    #[test]
    fn accessible_modules_is_empty_for_suspended_tenant() {
        let catalog = ModuleCatalog::builtin();
        let t = tenant(TenantStatus::Suspended, &["clients", "factures"]);
        let owner = user(Role::Agence { tenant_id: t.id }, UserStatus::Actif, vec![]);

        assert!(accessible_modules(&catalog, &owner, Some(&t)).is_empty());
    }
}
