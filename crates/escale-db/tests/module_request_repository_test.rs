//! Integration tests for the ModuleRequest repository using in-memory
//! SurrealDB.

use std::collections::BTreeSet;

use escale_core::error::EscaleError;
use escale_core::models::module_request::{
    CreateModuleRequest, DecideModuleRequest, RequestStatus,
};
use escale_core::repository::{ModuleRequestRepository, Pagination};
use escale_db::repository::SurrealModuleRequestRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    escale_db::run_migrations(&db).await.unwrap();
    db
}

fn request_for(tenant_id: Uuid, modules: &[&str]) -> CreateModuleRequest {
    CreateModuleRequest {
        tenant_id,
        modules: modules.iter().map(|m| m.to_string()).collect(),
        message: "Nous ouvrons la billetterie ce trimestre".into(),
    }
}

#[tokio::test]
async fn create_and_get_request() {
    let db = setup().await;
    let repo = SurrealModuleRequestRepository::new(db);

    let tenant_id = Uuid::new_v4();
    let request = repo
        .create(request_for(tenant_id, &["caisse", "billets"]))
        .await
        .unwrap();

    assert_eq!(request.tenant_id, tenant_id);
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(
        request.modules,
        BTreeSet::from(["billets".to_string(), "caisse".to_string()])
    );
    assert!(request.admin_comment.is_none());
    assert!(request.decided_at.is_none());
    assert!(request.decided_by.is_none());

    let fetched = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(fetched.id, request.id);
    assert_eq!(fetched.modules, request.modules);
}

#[tokio::test]
async fn decide_stamps_decision_fields() {
    let db = setup().await;
    let repo = SurrealModuleRequestRepository::new(db);

    let tenant_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let request = repo.create(request_for(tenant_id, &["caisse"])).await.unwrap();

    let decided = repo
        .decide(
            request.id,
            request.version,
            DecideModuleRequest {
                status: RequestStatus::Approved,
                admin_comment: Some("Validé après contrôle".into()),
                decided_by: admin_id,
            },
        )
        .await
        .unwrap();

    assert_eq!(decided.status, RequestStatus::Approved);
    assert_eq!(decided.admin_comment.as_deref(), Some("Validé après contrôle"));
    assert_eq!(decided.decided_by, Some(admin_id));
    assert!(decided.decided_at.is_some());
    assert_eq!(decided.version, request.version + 1);
}

#[tokio::test]
async fn deciding_with_stale_version_is_a_conflict() {
    let db = setup().await;
    let repo = SurrealModuleRequestRepository::new(db);

    let request = repo
        .create(request_for(Uuid::new_v4(), &["rapports"]))
        .await
        .unwrap();

    repo.decide(
        request.id,
        request.version,
        DecideModuleRequest {
            status: RequestStatus::Approved,
            admin_comment: None,
            decided_by: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();

    // A concurrent decider still holding the original version loses.
    let lost = repo
        .decide(
            request.id,
            request.version,
            DecideModuleRequest {
                status: RequestStatus::Rejected,
                admin_comment: None,
                decided_by: Uuid::new_v4(),
            },
        )
        .await;
    assert!(matches!(lost, Err(EscaleError::Conflict { .. })));

    let current = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(current.status, RequestStatus::Approved);
}

#[tokio::test]
async fn pending_listings_track_decisions() {
    let db = setup().await;
    let repo = SurrealModuleRequestRepository::new(db);

    let t1 = Uuid::new_v4();
    let t2 = Uuid::new_v4();

    let first = repo.create(request_for(t1, &["caisse"])).await.unwrap();
    repo.create(request_for(t1, &["rapports"])).await.unwrap();
    repo.create(request_for(t2, &["clients"])).await.unwrap();

    let all_pending = repo.list_pending(Pagination::default()).await.unwrap();
    assert_eq!(all_pending.total, 3);

    let t1_pending = repo.list_pending_for_tenant(t1).await.unwrap();
    assert_eq!(t1_pending.len(), 2);

    repo.decide(
        first.id,
        first.version,
        DecideModuleRequest {
            status: RequestStatus::Rejected,
            admin_comment: Some("Hors offre".into()),
            decided_by: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();

    let t1_pending = repo.list_pending_for_tenant(t1).await.unwrap();
    assert_eq!(t1_pending.len(), 1);
    assert_eq!(
        t1_pending[0].modules,
        BTreeSet::from(["rapports".to_string()])
    );

    let t1_all = repo
        .list_by_tenant(t1, Pagination::default())
        .await
        .unwrap();
    assert_eq!(t1_all.total, 2);
}
