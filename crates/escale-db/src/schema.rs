//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Every mutable record carries a
//! `version` counter used for optimistic concurrency control.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (agencies)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD contact_email ON TABLE tenant TYPE string;
DEFINE FIELD phone ON TABLE tenant TYPE string;
DEFINE FIELD address ON TABLE tenant TYPE string;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Pending', 'Approved', 'Rejected', 'Suspended'];
DEFINE FIELD active_modules ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD active_modules.* ON TABLE tenant TYPE string;
DEFINE FIELD requested_modules ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD requested_modules.* ON TABLE tenant TYPE string;
DEFINE FIELD version ON TABLE tenant TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_contact_email ON TABLE tenant \
    COLUMNS contact_email UNIQUE;
DEFINE INDEX idx_tenant_status ON TABLE tenant COLUMNS status;

-- =======================================================================
-- Users (global scope; tenant bindings stored per user)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD display_name ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Superadmin', 'Agence', 'Agent'];
DEFINE FIELD agences ON TABLE user TYPE array DEFAULT [];
DEFINE FIELD agences.* ON TABLE user TYPE string;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Actif', 'Suspendu', 'EnAttente', 'Rejete'];
DEFINE FIELD grants ON TABLE user TYPE array DEFAULT [];
DEFINE FIELD grants.* ON TABLE user TYPE object;
DEFINE FIELD grants.*.module ON TABLE user TYPE string;
DEFINE FIELD grants.*.actions ON TABLE user TYPE array;
DEFINE FIELD grants.*.actions.* ON TABLE user TYPE string;
DEFINE FIELD version ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_role ON TABLE user COLUMNS role;

-- =======================================================================
-- Module requests (entitlement workflow, append-only after decision)
-- =======================================================================
DEFINE TABLE module_request SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE module_request TYPE string;
DEFINE FIELD modules ON TABLE module_request TYPE array;
DEFINE FIELD modules.* ON TABLE module_request TYPE string;
DEFINE FIELD message ON TABLE module_request TYPE string;
DEFINE FIELD status ON TABLE module_request TYPE string \
    ASSERT $value IN ['Pending', 'Approved', 'Rejected'];
DEFINE FIELD admin_comment ON TABLE module_request \
    TYPE option<string>;
DEFINE FIELD decided_at ON TABLE module_request \
    TYPE option<datetime>;
DEFINE FIELD decided_by ON TABLE module_request \
    TYPE option<string>;
DEFINE FIELD version ON TABLE module_request TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE module_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_module_request_tenant ON TABLE module_request \
    COLUMNS tenant_id;
DEFINE INDEX idx_module_request_status ON TABLE module_request \
    COLUMNS status;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );

            db.query(migration.sql)
                .await?
                .check()
                .map_err(|e| DbError::Migration(e.to_string()))?;

            db.query("CREATE _migration SET version = $version, name = $name")
                .bind(("version", migration.version))
                .bind(("name", migration.name.to_string()))
                .await?
                .check()
                .map_err(|e| DbError::Migration(e.to_string()))?;
        }
    }

    Ok(())
}
