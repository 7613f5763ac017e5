//! Escale Core — domain models, module catalog, authorization decision
//! engine, and repository trait definitions.
//!
//! This crate has no I/O: persistence lives behind the traits in
//! [`repository`], and the decision engine in [`authz`] is a pure
//! function over immutable record snapshots.

pub mod authz;
pub mod catalog;
pub mod error;
pub mod models;
pub mod repository;

pub use authz::{AuthorizationContext, Decision, DenyReason, accessible_modules, decide};
pub use catalog::{ModuleCatalog, ModuleDefinition};
pub use error::{EscaleError, EscaleResult};
