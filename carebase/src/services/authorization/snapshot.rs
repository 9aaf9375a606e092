use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use carebase_core::authorization::{Action, EffectivePermissions, Module, Role};

/// Everything a resolver knows about one session, frozen at load time.
///
/// Holds the effective permissions of every module so decisions are plain
/// lookups. Modules without an entry resolve to "nothing allowed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSnapshot {
    user_id: Uuid,
    roles: BTreeSet<Role>,
    modules: HashMap<Module, EffectivePermissions>,
    loaded_at: DateTime<Utc>,
}

impl PermissionSnapshot {
    pub fn new(
        user_id: Uuid,
        roles: BTreeSet<Role>,
        modules: HashMap<Module, EffectivePermissions>,
    ) -> Self {
        Self {
            user_id,
            roles,
            modules,
            loaded_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn effective_permissions(&self, module: Module) -> EffectivePermissions {
        self.modules.get(&module).copied().unwrap_or_default()
    }

    pub fn has_permission(&self, module: Module, action: Action) -> bool {
        self.effective_permissions(module).allows(action)
    }

    /// Modules the user may at least view, in navigation order
    pub fn accessible_modules(&self) -> Vec<Module> {
        Module::all()
            .into_iter()
            .filter(|module| self.has_permission(*module, Action::View))
            .collect()
    }
}
