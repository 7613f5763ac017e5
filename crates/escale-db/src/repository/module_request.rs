//! SurrealDB implementation of [`ModuleRequestRepository`].

use chrono::{DateTime, Utc};
use escale_core::error::EscaleResult;
use escale_core::models::module_request::{
    CreateModuleRequest, DecideModuleRequest, ModuleRequest, RequestStatus,
};
use escale_core::repository::{ModuleRequestRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_status(s: &str) -> Result<RequestStatus, DbError> {
    match s {
        "Pending" => Ok(RequestStatus::Pending),
        "Approved" => Ok(RequestStatus::Approved),
        "Rejected" => Ok(RequestStatus::Rejected),
        other => Err(DbError::Corrupt(format!("unknown request status: {other}"))),
    }
}

fn status_to_string(s: RequestStatus) -> &'static str {
    match s {
        RequestStatus::Pending => "Pending",
        RequestStatus::Approved => "Approved",
        RequestStatus::Rejected => "Rejected",
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ModuleRequestRow {
    tenant_id: String,
    modules: Vec<String>,
    message: String,
    status: String,
    admin_comment: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
}

impl ModuleRequestRow {
    fn into_request(self, id: Uuid) -> Result<ModuleRequest, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Corrupt(format!("invalid tenant UUID: {e}")))?;
        let decided_by = self
            .decided_by
            .map(|raw| Uuid::parse_str(&raw))
            .transpose()
            .map_err(|e| DbError::Corrupt(format!("invalid decider UUID: {e}")))?;
        Ok(ModuleRequest {
            id,
            tenant_id,
            modules: self.modules.into_iter().collect(),
            message: self.message,
            status: parse_status(&self.status)?,
            admin_comment: self.admin_comment,
            decided_at: self.decided_at,
            decided_by,
            version: self.version,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ModuleRequestRowWithId {
    record_id: String,
    tenant_id: String,
    modules: Vec<String>,
    message: String,
    status: String,
    admin_comment: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
}

impl ModuleRequestRowWithId {
    fn try_into_request(self) -> Result<ModuleRequest, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        ModuleRequestRow {
            tenant_id: self.tenant_id,
            modules: self.modules,
            message: self.message,
            status: self.status,
            admin_comment: self.admin_comment,
            decided_at: self.decided_at,
            decided_by: self.decided_by,
            version: self.version,
            created_at: self.created_at,
        }
        .into_request(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the ModuleRequest repository.
#[derive(Clone)]
pub struct SurrealModuleRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealModuleRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ModuleRequestRepository for SurrealModuleRequestRepository<C> {
    async fn create(&self, input: CreateModuleRequest) -> EscaleResult<ModuleRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let modules: Vec<String> = input.modules.into_iter().collect();

        let result = self
            .db
            .query(
                "CREATE type::record('module_request', $id) SET \
                 tenant_id = $tenant_id, modules = $modules, \
                 message = $message, status = 'Pending', \
                 admin_comment = NONE, decided_at = NONE, \
                 decided_by = NONE, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("modules", modules))
            .bind(("message", input.message))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ModuleRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "module_request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> EscaleResult<ModuleRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('module_request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "module_request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn decide(
        &self,
        id: Uuid,
        expected_version: u64,
        input: DecideModuleRequest,
    ) -> EscaleResult<ModuleRequest> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('module_request', $id) SET \
                 status = $status, admin_comment = $admin_comment, \
                 decided_by = $decided_by, decided_at = time::now(), \
                 version = version + 1 \
                 WHERE version = $expected_version",
            )
            .bind(("id", id_str.clone()))
            .bind(("expected_version", expected_version))
            .bind(("status", status_to_string(input.status).to_string()))
            .bind(("admin_comment", input.admin_comment))
            .bind(("decided_by", input.decided_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ModuleRequestRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_request(id)?),
            None => {
                let mut check = self
                    .db
                    .query("SELECT * FROM type::record('module_request', $id)")
                    .bind(("id", id_str.clone()))
                    .await
                    .map_err(DbError::from)?;
                let existing: Vec<ModuleRequestRow> = check.take(0).map_err(DbError::from)?;
                if existing.is_empty() {
                    Err(DbError::NotFound {
                        entity: "module_request".into(),
                        id: id_str,
                    }
                    .into())
                } else {
                    Err(DbError::StaleVersion {
                        entity: "module_request".into(),
                        id: id_str,
                    }
                    .into())
                }
            }
        }
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<ModuleRequest>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM module_request \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM module_request \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<ModuleRequest>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM module_request \
                 WHERE status = 'Pending' GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM module_request \
                 WHERE status = 'Pending' \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_pending_for_tenant(&self, tenant_id: Uuid) -> EscaleResult<Vec<ModuleRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM module_request \
                 WHERE tenant_id = $tenant_id AND status = 'Pending' \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
