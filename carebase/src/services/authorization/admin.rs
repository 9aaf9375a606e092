use std::sync::Arc;
use tracing::{info, warn};

use carebase_core::authorization::{
    Action, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};

use super::resolver::PermissionResolver;
use super::store::PermissionStore;

/// Administrative access to the role permission table.
///
/// Every operation is gated on the acting user's own permissions for the
/// user management module: `view` for reads, `edit` for writes.
#[derive(Debug, Clone)]
pub struct PermissionAdmin {
    store: Arc<dyn PermissionStore>,
    actor: Arc<PermissionResolver>,
}

impl PermissionAdmin {
    pub fn new(store: Arc<dyn PermissionStore>, actor: Arc<PermissionResolver>) -> Self {
        Self { store, actor }
    }

    fn require(&self, action: Action) -> AuthorizationResult<()> {
        self.actor.gate(Module::UserManagement, action).authorize()
    }

    /// Insert or replace an entry.
    ///
    /// When the acting user holds `role`, their own resolver is refreshed so
    /// their decisions follow the edit. A refresh failure is returned even
    /// though the entry was stored.
    pub async fn set_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
        allowed: bool,
    ) -> AuthorizationResult<()> {
        self.require(Action::Edit)?;
        self.store
            .set_permission(role, module, action, allowed)
            .await?;
        info!(
            actor = ?self.actor.user_id(),
            "Set permission {} {} {} = {}",
            role,
            module,
            action,
            allowed
        );
        self.refresh_if_held(role).await
    }

    /// Remove an entry, leaving the action not allowed for the role
    pub async fn revoke_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
    ) -> AuthorizationResult<()> {
        self.require(Action::Edit)?;
        self.store.delete_permission(role, module, action).await?;
        info!(
            actor = ?self.actor.user_id(),
            "Revoked permission {} {} {}",
            role,
            module,
            action
        );
        self.refresh_if_held(role).await
    }

    pub async fn role_permissions(&self, role: Role) -> AuthorizationResult<Grants> {
        self.require(Action::View)?;
        self.store.get_permissions(role).await
    }

    /// Every stored entry, ordered by role, module and action
    pub async fn permission_matrix(&self) -> AuthorizationResult<Vec<PermissionEntry>> {
        self.require(Action::View)?;
        self.store.list_entries().await
    }

    async fn refresh_if_held(&self, role: Role) -> AuthorizationResult<()> {
        if !self.actor.roles().contains(&role) {
            return Ok(());
        }
        self.actor.refresh().await.inspect_err(|e| {
            warn!("Permission entry stored but refreshing the acting session failed: {}", e)
        })
    }
}
