//! End-to-end enforcement tests: registry + entitlement + directory
//! feeding the decision engine through [`AccessEnforcer`].

use chrono::Utc;
use escale_access::config::AccessConfig;
use escale_access::directory::{Directory, NewUser};
use escale_access::enforcer::AccessEnforcer;
use escale_access::entitlement::{EntitlementWorkflow, RequestDecision};
use escale_access::registry::{ApprovalDecision, TenantRegistry};
use escale_core::authz::{Decision, DenyReason};
use escale_core::catalog::ModuleCatalog;
use escale_core::error::EscaleError;
use escale_core::models::tenant::CreateTenant;
use escale_core::models::user::{Grant, Role, User, UserStatus};
use escale_core::repository::TenantRepository;
use escale_db::repository::{
    SurrealModuleRequestRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Harness {
    tenant_repo: SurrealTenantRepository<Db>,
    registry: TenantRegistry<SurrealTenantRepository<Db>>,
    workflow: EntitlementWorkflow<SurrealTenantRepository<Db>, SurrealModuleRequestRepository<Db>>,
    directory: Directory<SurrealUserRepository<Db>, SurrealTenantRepository<Db>>,
    enforcer: AccessEnforcer,
    admin: User,
}

fn in_memory_actor(role: Role, status: UserStatus) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@escale.example", Uuid::new_v4()),
        password_hash: "$argon2id$stub".into(),
        display_name: "Actor".into(),
        role,
        status,
        grants: vec![],
        version: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    escale_db::run_migrations(&db).await.unwrap();

    let tenant_repo = SurrealTenantRepository::new(db.clone());
    Harness {
        tenant_repo: tenant_repo.clone(),
        registry: TenantRegistry::new(tenant_repo.clone()),
        workflow: EntitlementWorkflow::new(
            tenant_repo.clone(),
            SurrealModuleRequestRepository::new(db.clone()),
            ModuleCatalog::builtin(),
        ),
        directory: Directory::new(
            SurrealUserRepository::new(db),
            tenant_repo,
            ModuleCatalog::builtin(),
            AccessConfig::default(),
        ),
        enforcer: AccessEnforcer::new(ModuleCatalog::builtin()),
        admin: in_memory_actor(Role::Superadmin, UserStatus::Actif),
    }
}

/// Provision an approved tenant entitled to the given modules, with
/// its in-memory owner actor.
async fn approved_tenant(harness: &Harness, email: &str, modules: &[&str]) -> (Uuid, User) {
    let tenant = harness
        .registry
        .register(CreateTenant {
            name: "Agence Horizon".into(),
            contact_email: email.into(),
            phone: "+33 1 40 00 00 01".into(),
            address: "12 rue des Lilas, Paris".into(),
        })
        .await
        .unwrap();
    harness
        .registry
        .decide_approval(tenant.id, ApprovalDecision::Approve, &harness.admin)
        .await
        .unwrap();

    let owner = in_memory_actor(Role::Agence { tenant_id: tenant.id }, UserStatus::Actif);
    if !modules.is_empty() {
        let request = harness
            .workflow
            .request_modules(
                tenant.id,
                modules.iter().map(|m| m.to_string()).collect(),
                "Demarrage".into(),
                &owner,
            )
            .await
            .unwrap();
        harness
            .workflow
            .decide_request(request.id, RequestDecision::Approve, None, &harness.admin)
            .await
            .unwrap();
    }

    (tenant.id, owner)
}

#[tokio::test]
async fn agent_access_follows_grants_end_to_end() {
    let harness = setup().await;
    let (tenant_id, _owner) =
        approved_tenant(&harness, "contact@horizon.example", &["clients", "factures"]).await;

    let agent = harness
        .directory
        .create_user(NewUser {
            email: "alice@horizon.example".into(),
            password: "correct-horse-battery".into(),
            display_name: "Alice".into(),
            role: Role::Agent {
                tenant_ids: vec![tenant_id],
            },
            grants: vec![Grant {
                module: "clients".into(),
                actions: vec!["lire".into()],
            }],
            status: Some(UserStatus::Actif),
        })
        .await
        .unwrap();

    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();

    harness
        .enforcer
        .check(&agent, Some(&tenant), "clients", "lire")
        .unwrap();

    let create = harness
        .enforcer
        .decide(&agent, Some(&tenant), "clients", "creer")
        .unwrap();
    assert_eq!(create, Decision::Deny(DenyReason::ActionNotGranted));

    let no_grant = harness
        .enforcer
        .decide(&agent, Some(&tenant), "factures", "lire")
        .unwrap();
    assert_eq!(no_grant, Decision::Deny(DenyReason::ActionNotGranted));

    let denied = harness
        .enforcer
        .check(&agent, Some(&tenant), "clients", "creer")
        .unwrap_err();
    assert!(matches!(denied, EscaleError::Permission { .. }));
}

#[tokio::test]
async fn suspension_closes_all_access_immediately() {
    let harness = setup().await;
    let (tenant_id, owner) =
        approved_tenant(&harness, "contact@horizon.example", &["clients"]).await;

    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();
    harness
        .enforcer
        .check(&owner, Some(&tenant), "clients", "lire")
        .unwrap();

    harness
        .registry
        .suspend(tenant_id, &harness.admin)
        .await
        .unwrap();

    // The next request naturally reads a fresh tenant snapshot.
    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();
    let decision = harness
        .enforcer
        .decide(&owner, Some(&tenant), "clients", "lire")
        .unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::TenantNotActive));

    assert!(
        harness
            .enforcer
            .accessible_modules(&owner, Some(&tenant))
            .is_empty()
    );

    // Reinstatement restores the owner's access.
    harness
        .registry
        .reinstate(tenant_id, &harness.admin)
        .await
        .unwrap();
    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();
    harness
        .enforcer
        .check(&owner, Some(&tenant), "clients", "lire")
        .unwrap();
}

#[tokio::test]
async fn accessible_modules_drives_navigation() {
    let harness = setup().await;
    let (tenant_id, owner) =
        approved_tenant(&harness, "contact@horizon.example", &["clients", "rapports"]).await;
    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();

    assert_eq!(
        harness.enforcer.accessible_modules(&owner, Some(&tenant)),
        vec!["clients", "rapports"]
    );

    // Superadmins see the whole catalog without a tenant context.
    let all = harness.enforcer.accessible_modules(&harness.admin, None);
    assert_eq!(all.len(), harness.enforcer.catalog().modules().count());
}

#[tokio::test]
async fn entitlement_gate_precedes_grants() {
    let harness = setup().await;
    let (tenant_id, _owner) =
        approved_tenant(&harness, "contact@horizon.example", &["clients"]).await;

    let agent = harness
        .directory
        .create_user(NewUser {
            email: "bob@horizon.example".into(),
            password: "correct-horse-battery".into(),
            display_name: "Bob".into(),
            role: Role::Agent {
                tenant_ids: vec![tenant_id],
            },
            grants: vec![Grant {
                module: "clients".into(),
                actions: vec!["lire".into()],
            }],
            status: Some(UserStatus::Actif),
        })
        .await
        .unwrap();

    let tenant = harness.tenant_repo.get_by_id(tenant_id).await.unwrap();

    // `caisse` is a valid catalog module the tenant does not hold.
    let decision = harness
        .enforcer
        .decide(&agent, Some(&tenant), "caisse", "lire")
        .unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::ModuleNotEntitled));
}
