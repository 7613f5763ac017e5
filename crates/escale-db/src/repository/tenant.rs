//! SurrealDB implementation of [`TenantRepository`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use escale_core::error::EscaleResult;
use escale_core::models::tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant};
use escale_core::repository::{PaginatedResult, Pagination, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_status(s: &str) -> Result<TenantStatus, DbError> {
    match s {
        "Pending" => Ok(TenantStatus::Pending),
        "Approved" => Ok(TenantStatus::Approved),
        "Rejected" => Ok(TenantStatus::Rejected),
        "Suspended" => Ok(TenantStatus::Suspended),
        other => Err(DbError::Corrupt(format!("unknown tenant status: {other}"))),
    }
}

fn status_to_string(s: TenantStatus) -> &'static str {
    match s {
        TenantStatus::Pending => "Pending",
        TenantStatus::Approved => "Approved",
        TenantStatus::Rejected => "Rejected",
        TenantStatus::Suspended => "Suspended",
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    name: String,
    contact_email: String,
    phone: String,
    address: String,
    status: String,
    active_modules: Vec<String>,
    requested_modules: Vec<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id,
            name: self.name,
            contact_email: self.contact_email,
            phone: self.phone,
            address: self.address,
            status: parse_status(&self.status)?,
            active_modules: self.active_modules.into_iter().collect(),
            requested_modules: self.requested_modules.into_iter().collect(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    name: String,
    contact_email: String,
    phone: String,
    address: String,
    status: String,
    active_modules: Vec<String>,
    requested_modules: Vec<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Tenant {
            id,
            name: self.name,
            contact_email: self.contact_email,
            phone: self.phone,
            address: self.address,
            status: parse_status(&self.status)?,
            active_modules: self.active_modules.into_iter().collect(),
            requested_modules: self.requested_modules.into_iter().collect(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> EscaleResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 name = $name, contact_email = $contact_email, \
                 phone = $phone, address = $address, \
                 status = 'Pending', \
                 active_modules = [], requested_modules = [], \
                 version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("contact_email", input.contact_email))
            .bind(("phone", input.phone))
            .bind(("address", input.address))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> EscaleResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_by_contact_email(&self, email: &str) -> EscaleResult<Tenant> {
        let email_owned = email.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant \
                 WHERE contact_email = $email",
            )
            .bind(("email", email_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_tenant()?)
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateTenant,
    ) -> EscaleResult<Tenant> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.active_modules.is_some() {
            sets.push("active_modules = $active_modules");
        }
        if input.requested_modules.is_some() {
            sets.push("requested_modules = $requested_modules");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        // The WHERE clause is the optimistic-concurrency guard: a
        // stale expected_version matches nothing and returns no rows.
        let query = format!(
            "UPDATE type::record('tenant', $id) SET {} \
             WHERE version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("expected_version", expected_version));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(modules) = input.active_modules {
            builder = builder.bind(("active_modules", set_to_vec(modules)));
        }
        if let Some(modules) = input.requested_modules {
            builder = builder.bind(("requested_modules", set_to_vec(modules)));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_tenant(id)?),
            // No rows: either the record is gone or the version is
            // stale. A follow-up read disambiguates.
            None => {
                let mut check = self
                    .db
                    .query("SELECT * FROM type::record('tenant', $id)")
                    .bind(("id", id_str.clone()))
                    .await
                    .map_err(DbError::from)?;
                let existing: Vec<TenantRow> = check.take(0).map_err(DbError::from)?;
                if existing.is_empty() {
                    Err(DbError::NotFound {
                        entity: "tenant".into(),
                        id: id_str,
                    }
                    .into())
                } else {
                    Err(DbError::StaleVersion {
                        entity: "tenant".into(),
                        id: id_str,
                    }
                    .into())
                }
            }
        }
    }

    async fn list(&self, pagination: Pagination) -> EscaleResult<PaginatedResult<Tenant>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM tenant GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_status(
        &self,
        status: TenantStatus,
        pagination: Pagination,
    ) -> EscaleResult<PaginatedResult<Tenant>> {
        let status_str = status_to_string(status).to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE status = $status GROUP ALL",
            )
            .bind(("status", status_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant \
                 WHERE status = $status \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("status", status_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

fn set_to_vec(set: BTreeSet<String>) -> Vec<String> {
    set.into_iter().collect()
}
