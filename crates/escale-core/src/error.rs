//! Error types for the Escale access-control core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EscaleError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Malformed input to a mutation (unknown module, empty required
    /// field, duplicate email). Recoverable by correcting the input;
    /// never retried automatically. Maps to HTTP 400/422.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The actor lacks rights to perform the mutation itself, as
    /// opposed to an authorization `Deny` on a business action.
    /// Maps to HTTP 403.
    #[error("Permission denied: {reason}")]
    Permission { reason: String },

    /// A workflow mutation was attempted from a non-eligible status,
    /// e.g. deciding an already-decided request. Maps to HTTP 409.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Optimistic-concurrency collision: the record was modified
    /// between read and write. The caller must reload the current
    /// state and retry. Maps to HTTP 409 with a retry hint.
    #[error("Conflict: {entity} with id {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// Generic credential failure. Deliberately carries no detail so
    /// that unknown email, wrong password, and inactive account are
    /// indistinguishable to the caller. Maps to HTTP 401.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("Tenant context missing or invalid")]
    TenantContext,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EscaleResult<T> = Result<T, EscaleError>;
