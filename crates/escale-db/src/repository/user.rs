//! SurrealDB implementation of [`UserRepository`].
//!
//! Users are stored globally (one table, unique email) with their
//! tenant bindings denormalized into the `agences` array. The `role`
//! string plus that array reconstruct the domain [`Role`] variant on
//! read.

use chrono::{DateTime, Utc};
use escale_core::error::EscaleResult;
use escale_core::models::user::{CreateUser, Grant, Role, UpdateUser, User, UserStatus};
use escale_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Actif" => Ok(UserStatus::Actif),
        "Suspendu" => Ok(UserStatus::Suspendu),
        "EnAttente" => Ok(UserStatus::EnAttente),
        "Rejete" => Ok(UserStatus::Rejete),
        other => Err(DbError::Corrupt(format!("unknown user status: {other}"))),
    }
}

fn status_to_string(s: UserStatus) -> &'static str {
    match s {
        UserStatus::Actif => "Actif",
        UserStatus::Suspendu => "Suspendu",
        UserStatus::EnAttente => "EnAttente",
        UserStatus::Rejete => "Rejete",
    }
}

fn role_to_string(role: &Role) -> &'static str {
    match role {
        Role::Superadmin => "Superadmin",
        Role::Agence { .. } => "Agence",
        Role::Agent { .. } => "Agent",
    }
}

fn role_bindings(role: &Role) -> Vec<String> {
    role.bound_tenants()
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

/// Rebuild the domain role from its stored parts, enforcing the
/// binding-arity invariants on the way out.
fn parse_role(kind: &str, agences: &[String]) -> Result<Role, DbError> {
    let mut tenant_ids = Vec::with_capacity(agences.len());
    for raw in agences {
        let id = Uuid::parse_str(raw)
            .map_err(|e| DbError::Corrupt(format!("invalid tenant UUID in agences: {e}")))?;
        tenant_ids.push(id);
    }

    match kind {
        "Superadmin" if tenant_ids.is_empty() => Ok(Role::Superadmin),
        "Superadmin" => Err(DbError::Corrupt(
            "superadmin user with tenant bindings".into(),
        )),
        "Agence" => match tenant_ids.as_slice() {
            [tenant_id] => Ok(Role::Agence {
                tenant_id: *tenant_id,
            }),
            _ => Err(DbError::Corrupt(
                "agence user must be bound to exactly one tenant".into(),
            )),
        },
        "Agent" if !tenant_ids.is_empty() => Ok(Role::Agent { tenant_ids }),
        "Agent" => Err(DbError::Corrupt("agent user with no tenant bindings".into())),
        other => Err(DbError::Corrupt(format!("unknown role: {other}"))),
    }
}

/// Stored representation of one grant entry.
#[derive(Debug, SurrealValue)]
struct GrantRow {
    module: String,
    actions: Vec<String>,
}

impl From<Grant> for GrantRow {
    fn from(grant: Grant) -> Self {
        Self {
            module: grant.module,
            actions: grant.actions,
        }
    }
}

impl From<GrantRow> for Grant {
    fn from(row: GrantRow) -> Self {
        Self {
            module: row.module,
            actions: row.actions,
        }
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    password_hash: String,
    display_name: String,
    role: String,
    agences: Vec<String>,
    status: String,
    grants: Vec<GrantRow>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            role: parse_role(&self.role, &self.agences)?,
            status: parse_status(&self.status)?,
            grants: self.grants.into_iter().map(Grant::from).collect(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    password_hash: String,
    display_name: String,
    role: String,
    agences: Vec<String>,
    status: String,
    grants: Vec<GrantRow>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            role: parse_role(&self.role, &self.agences)?,
            status: parse_status(&self.status)?,
            grants: self.grants.into_iter().map(Grant::from).collect(),
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

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> EscaleResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let grants: Vec<GrantRow> = input.grants.into_iter().map(GrantRow::from).collect();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, password_hash = $password_hash, \
                 display_name = $display_name, \
                 role = $role, agences = $agences, \
                 status = $status, grants = $grants, \
                 version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("display_name", input.display_name))
            .bind(("role", role_to_string(&input.role).to_string()))
            .bind(("agences", role_bindings(&input.role)))
            .bind(("status", status_to_string(input.status).to_string()))
            .bind(("grants", grants))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> EscaleResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_email(&self, email: &str) -> EscaleResult<User> {
        let email_owned = email.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM user \
                 WHERE email = $email",
            )
            .bind(("email", email_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateUser,
    ) -> EscaleResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.grants.is_some() {
            sets.push("grants = $grants");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("expected_version", expected_version));

        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(grants) = input.grants {
            let grants: Vec<GrantRow> = grants.into_iter().map(GrantRow::from).collect();
            builder = builder.bind(("grants", grants));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_user(id)?),
            None => {
                let mut check = self
                    .db
                    .query("SELECT * FROM type::record('user', $id)")
                    .bind(("id", id_str.clone()))
                    .await
                    .map_err(DbError::from)?;
                let existing: Vec<UserRow> = check.take(0).map_err(DbError::from)?;
                if existing.is_empty() {
                    Err(DbError::NotFound {
                        entity: "user".into(),
                        id: id_str,
                    }
                    .into())
                } else {
                    Err(DbError::StaleVersion {
                        entity: "user".into(),
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
    ) -> EscaleResult<PaginatedResult<User>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE agences CONTAINS $tenant_id GROUP ALL",
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
                 FROM user \
                 WHERE agences CONTAINS $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
