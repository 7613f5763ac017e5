//! SurrealDB repository implementations.

mod module_request;
mod tenant;
mod user;

pub use module_request::SurrealModuleRequestRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;
