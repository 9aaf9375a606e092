use serde::{Deserialize, Serialize};
use std::fmt;

/// Job functions a staff account can hold. A user may hold several at once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "clap", value(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    LabTechnician,
    Pharmacist,
}

impl Role {
    pub fn all() -> [Role; 6] {
        [
            Role::Admin,
            Role::Doctor,
            Role::Nurse,
            Role::Receptionist,
            Role::LabTechnician,
            Role::Pharmacist,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::LabTechnician => "lab_technician",
            Role::Pharmacist => "pharmacist",
        }
    }

    /// Parse from string. Unknown roles yield `None` and must grant nothing.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "receptionist" => Some(Role::Receptionist),
            "lab_technician" => Some(Role::LabTechnician),
            "pharmacist" => Some(Role::Pharmacist),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
