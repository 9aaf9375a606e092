//! Durable source of truth for role permission entries.
//!
//! Reads never fail for a role without entries: the answer is the empty set.
//! Any backend problem is reported as `AuthorizationError::StoreUnavailable`,
//! which readers treat as "deny" and writers surface to the caller.

use async_trait::async_trait;
use std::collections::HashMap;

use carebase_core::authorization::{
    Action, AuthorizationError, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};

pub mod file;
pub mod memory;
pub mod rest;

pub use file::FilePermissionStore;
pub use memory::MemoryPermissionStore;
pub use rest::RestPermissionStore;

use super::templates::RoleTemplates;

#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug {
    /// All `(module, action)` pairs the role is allowed to perform
    async fn get_permissions(&self, role: Role) -> AuthorizationResult<Grants>;

    /// Allowed pairs for every role that has at least one entry
    async fn get_all_permissions(&self) -> AuthorizationResult<HashMap<Role, Grants>>;

    /// Insert or replace the entry for `(role, module, action)`
    async fn set_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
        allowed: bool,
    ) -> AuthorizationResult<()>;

    /// Remove the entry for `(role, module, action)`. Removing a missing
    /// entry is not an error.
    async fn delete_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
    ) -> AuthorizationResult<()>;

    /// Raw rows, including entries stored as not allowed
    async fn list_entries(&self) -> AuthorizationResult<Vec<PermissionEntry>>;

    /// Grant everything in the default role templates. Entries outside the
    /// templates are left alone.
    async fn provision_defaults(&self) -> AuthorizationResult<()> {
        for entry in RoleTemplates::default_entries() {
            self.set_permission(entry.role, entry.module, entry.action, entry.allowed)
                .await?;
        }
        Ok(())
    }
}

/// Collapse a backend failure into the store error readers deny on.
pub(crate) fn unavailable(err: anyhow::Error) -> AuthorizationError {
    AuthorizationError::store_unavailable(format!("{err:#}"))
}

/// Fold raw entries into the allowed pairs per role.
pub fn grants_by_role<I>(entries: I) -> HashMap<Role, Grants>
where
    I: IntoIterator<Item = PermissionEntry>,
{
    let mut grants: HashMap<Role, Grants> = HashMap::new();
    for entry in entries.into_iter().filter(|e| e.allowed) {
        grants
            .entry(entry.role)
            .or_default()
            .insert((entry.module, entry.action));
    }
    grants
}
