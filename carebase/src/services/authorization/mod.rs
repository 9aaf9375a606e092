//! Role-based access control for the carebase application
//!
//! Three pieces cooperate, bottom-up:
//!
//! - a [`PermissionStore`] holding `(role, module, action) -> allowed` entries,
//! - a per-session [`PermissionResolver`] that unions the grants of every role
//!   the user holds into a snapshot and answers decisions from it,
//! - [`AccessGate`]s placed at each protected call site.
//!
//! Everything fails closed: an unknown role, a missing entry, a resolver that
//! never loaded and a backend error all resolve to "denied". The gates only
//! decide what the client shows. The backend's own row-level security remains
//! the enforcement boundary for the data itself.

pub mod admin;
pub mod engine;
pub mod gate;
pub mod identity;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod templates;


pub use admin::PermissionAdmin;
pub use gate::{AccessGate, GateState};
pub use identity::{IdentityProvider, RestIdentityProvider, StaticIdentityProvider};
pub use resolver::{PermissionResolver, ResolverState};
pub use snapshot::PermissionSnapshot;
pub use store::{
    FilePermissionStore, MemoryPermissionStore, PermissionStore, RestPermissionStore,
};
pub use templates::RoleTemplates;
