use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional areas of the hospital application that carry their own permissions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "clap", value(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    Patients,
    Appointments,
    Staff,
    Laboratory,
    Pharmacy,
    Billing,
    Reports,
    Accounts,
    UserManagement,
}

impl Module {
    /// Get all modules in navigation order
    pub fn all() -> [Module; 10] {
        [
            Module::Dashboard,
            Module::Patients,
            Module::Appointments,
            Module::Staff,
            Module::Laboratory,
            Module::Pharmacy,
            Module::Billing,
            Module::Reports,
            Module::Accounts,
            Module::UserManagement,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Patients => "patients",
            Module::Appointments => "appointments",
            Module::Staff => "staff",
            Module::Laboratory => "laboratory",
            Module::Pharmacy => "pharmacy",
            Module::Billing => "billing",
            Module::Reports => "reports",
            Module::Accounts => "accounts",
            Module::UserManagement => "user_management",
        }
    }

    /// Parse from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Module> {
        match s.to_lowercase().as_str() {
            "dashboard" => Some(Module::Dashboard),
            "patients" => Some(Module::Patients),
            "appointments" => Some(Module::Appointments),
            "staff" => Some(Module::Staff),
            "laboratory" => Some(Module::Laboratory),
            "pharmacy" => Some(Module::Pharmacy),
            "billing" => Some(Module::Billing),
            "reports" => Some(Module::Reports),
            "accounts" => Some(Module::Accounts),
            "user_management" => Some(Module::UserManagement),
            _ => None,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
