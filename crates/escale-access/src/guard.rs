//! Shared actor checks for workflow mutations.
//!
//! These guard the mutations themselves (surfaced as
//! [`EscaleError::Permission`]), as opposed to the business-action
//! decisions made by the authorization engine.

use escale_core::error::{EscaleError, EscaleResult};
use escale_core::models::user::{User, UserStatus};

/// The mutation requires an active superadmin.
pub(crate) fn require_superadmin(actor: &User) -> EscaleResult<()> {
    if actor.status != UserStatus::Actif {
        return Err(EscaleError::Permission {
            reason: "actor is not active".into(),
        });
    }
    if !actor.role.is_superadmin() {
        return Err(EscaleError::Permission {
            reason: "superadmin role required".into(),
        });
    }
    Ok(())
}
