use carebase_core::authorization::{Action, Module, PermissionEntry, Role};

/// Default role templates written at provisioning time.
pub struct RoleTemplates;

impl RoleTemplates {
    /// Entries for every role, used when no permission table exists yet
    pub fn default_entries() -> Vec<PermissionEntry> {
        Role::all()
            .into_iter()
            .flat_map(Self::entries_for)
            .collect()
    }

    /// Entries granted to a single role by its template
    pub fn entries_for(role: Role) -> Vec<PermissionEntry> {
        use Action::*;
        use Module::*;

        let grants: Vec<(Module, Vec<Action>)> = match role {
            Role::Admin => Module::all()
                .into_iter()
                .map(|module| (module, Action::all().to_vec()))
                .collect(),
            Role::Doctor => vec![
                (Dashboard, vec![View]),
                (Patients, vec![View, Create, Edit]),
                (Appointments, vec![View, Create, Edit]),
                (Laboratory, vec![View, Create, Edit]),
                (Pharmacy, vec![View]),
                (Reports, vec![View]),
            ],
            Role::Nurse => vec![
                (Dashboard, vec![View]),
                (Patients, vec![View, Edit]),
                (Appointments, vec![View, Create, Edit]),
                (Laboratory, vec![View]),
                (Pharmacy, vec![View]),
            ],
            Role::Receptionist => vec![
                (Dashboard, vec![View]),
                (Patients, vec![View, Create, Edit]),
                (Appointments, vec![View, Create, Edit]),
                (Billing, vec![View, Create]),
            ],
            Role::LabTechnician => vec![
                (Dashboard, vec![View]),
                (Patients, vec![View]),
                (Laboratory, vec![View, Create, Edit]),
            ],
            Role::Pharmacist => vec![
                (Dashboard, vec![View]),
                (Patients, vec![View]),
                (Pharmacy, vec![View, Create, Edit]),
            ],
        };

        grants
            .into_iter()
            .flat_map(|(module, actions)| {
                actions
                    .into_iter()
                    .map(move |action| PermissionEntry::allow(role, module, action))
            })
            .collect()
    }
}
