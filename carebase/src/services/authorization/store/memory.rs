use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use carebase_core::authorization::{
    Action, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};

use super::{grants_by_role, PermissionStore};
use crate::services::authorization::templates::RoleTemplates;

type EntryKey = (Role, Module, Action);

/// Process-local permission table.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionStore {
    entries: Arc<RwLock<HashMap<EntryKey, bool>>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PermissionEntry>,
    {
        let entries = entries
            .into_iter()
            .map(|e| ((e.role, e.module, e.action), e.allowed))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Store seeded with the default role templates
    pub fn with_default_templates() -> Self {
        Self::with_entries(RoleTemplates::default_entries())
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn get_permissions(&self, role: Role) -> AuthorizationResult<Grants> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|((r, _, _), allowed)| *r == role && **allowed)
            .map(|((_, module, action), _)| (*module, *action))
            .collect())
    }

    async fn get_all_permissions(&self) -> AuthorizationResult<HashMap<Role, Grants>> {
        Ok(grants_by_role(self.list_entries().await?))
    }

    async fn set_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
        allowed: bool,
    ) -> AuthorizationResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert((role, module, action), allowed);
        debug!("Set {} {} {} = {}", role, module, action, allowed);
        Ok(())
    }

    async fn delete_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
    ) -> AuthorizationResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&(role, module, action));
        debug!("Deleted {} {} {}", role, module, action);
        Ok(())
    }

    async fn list_entries(&self) -> AuthorizationResult<Vec<PermissionEntry>> {
        let entries = self.entries.read().await;
        let mut rows: Vec<PermissionEntry> = entries
            .iter()
            .map(|((role, module, action), allowed)| PermissionEntry {
                role: *role,
                module: *module,
                action: *action,
                allowed: *allowed,
            })
            .collect();
        rows.sort_by_key(|e| (e.role, e.module, e.action));
        Ok(rows)
    }
}
