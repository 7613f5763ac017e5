//! Database-specific error types and conversions.

use escale_core::error::EscaleError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored value could not be mapped back to a domain type
    /// (bad UUID, unknown enum string). Indicates schema drift.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Version-guarded write lost the race: the record changed since
    /// the caller read it.
    #[error("Stale version: {entity} with id {id}")]
    StaleVersion { entity: String, id: String },
}

impl From<DbError> for EscaleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EscaleError::NotFound { entity, id },
            DbError::StaleVersion { entity, id } => EscaleError::Conflict { entity, id },
            other => EscaleError::Database(other.to_string()),
        }
    }
}
