use serde::{Deserialize, Serialize};
use std::fmt;

/// Verbs a role can be granted on a module.
///
/// Actions are independent flags: holding `Edit` says nothing about `View`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    /// Get all actions in display order
    pub fn all() -> [Action; 4] {
        [Action::View, Action::Create, Action::Edit, Action::Delete]
    }

    /// Convert to the string stored in the permission table
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    /// Parse from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Action> {
        match s.to_lowercase().as_str() {
            "view" => Some(Action::View),
            "create" => Some(Action::Create),
            "edit" => Some(Action::Edit),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_string_conversion() {
        for action in Action::all() {
            assert_eq!(Action::from_str(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_str("DELETE"), Some(Action::Delete));
        assert_eq!(Action::from_str("destroy"), None);
    }
}
