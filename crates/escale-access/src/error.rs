//! Access-layer error types.

use escale_core::error::EscaleError;
use thiserror::Error;

/// Internal error distinctions for the access layer.
///
/// Credential-related variants deliberately collapse into the generic
/// [`EscaleError::AuthenticationFailed`] so that unknown email, wrong
/// password, and inactive account are indistinguishable to callers.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is not active")]
    AccountNotActive,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AccessError> for EscaleError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::InvalidCredentials | AccessError::AccountNotActive => {
                EscaleError::AuthenticationFailed
            }
            AccessError::Crypto(msg) => EscaleError::Crypto(msg),
        }
    }
}
