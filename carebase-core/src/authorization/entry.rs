use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Action, Module, Role};

/// Set of `(module, action)` pairs a role is allowed to perform.
pub type Grants = BTreeSet<(Module, Action)>;

/// A single row of the role permission table.
///
/// There is at most one entry per `(role, module, action)`. A missing entry
/// means the action is not allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PermissionEntry {
    pub role: Role,
    pub module: Module,
    pub action: Action,
    pub allowed: bool,
}

impl PermissionEntry {
    pub fn allow(role: Role, module: Module, action: Action) -> Self {
        Self {
            role,
            module,
            action,
            allowed: true,
        }
    }
}

/// The union of what a user's roles allow on one module.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectivePermissions {
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

impl EffectivePermissions {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
        }
    }

    pub fn grant(&mut self, action: Action) {
        match action {
            Action::View => self.view = true,
            Action::Create => self.create = true,
            Action::Edit => self.edit = true,
            Action::Delete => self.delete = true,
        }
    }

    /// Merge another set into this one. Grants only ever accumulate.
    pub fn union(self, other: EffectivePermissions) -> EffectivePermissions {
        EffectivePermissions {
            view: self.view || other.view,
            create: self.create || other.create,
            edit: self.edit || other.edit,
            delete: self.delete || other.delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.view || self.create || self.edit || self.delete)
    }

    /// Actions granted, in display order
    pub fn actions(&self) -> Vec<Action> {
        Action::all()
            .into_iter()
            .filter(|action| self.allows(*action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_or() {
        let mut left = EffectivePermissions::default();
        left.grant(Action::View);
        let mut right = EffectivePermissions::default();
        right.grant(Action::Delete);

        let merged = left.union(right);
        assert!(merged.view);
        assert!(merged.delete);
        assert!(!merged.create);
        assert!(!merged.edit);
        assert_eq!(merged.actions(), vec![Action::View, Action::Delete]);
    }

    #[test]
    fn test_default_is_empty() {
        let perms = EffectivePermissions::default();
        assert!(perms.is_empty());
        for action in Action::all() {
            assert!(!perms.allows(action));
        }
    }
}
