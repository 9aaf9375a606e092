//! Closed permission vocabulary shared by the store, resolver and gates.
//!
//! Module and action identifiers are enums so a call site cannot ask about an
//! area or verb that does not exist.

pub mod action;
pub mod entry;
pub mod error;
pub mod module;
pub mod role;

pub use action::Action;
pub use entry::{EffectivePermissions, Grants, PermissionEntry};
pub use error::{AuthorizationError, AuthorizationResult};
pub use module::Module;
pub use role::Role;
