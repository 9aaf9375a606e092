use std::collections::BTreeMap;

use owo_colors::OwoColorize;
use tabled::{builder::Builder, settings::Style};

use carebase::app_state::SharedAppState;
use carebase::services::authorization::PermissionAdmin;
use carebase_core::authorization::{Action, EffectivePermissions, Module, PermissionEntry, Role};

use super::session_for;
use crate::cli::{CheckCommand, EntryCommand, ListCommand, UserCommand};

fn flag(allowed: bool) -> String {
    if allowed {
        "✓".green().to_string()
    } else {
        "-".dimmed().to_string()
    }
}

fn action_headers() -> Vec<String> {
    Action::all().iter().map(|a| a.to_string()).collect()
}

fn permission_cells(permissions: &EffectivePermissions) -> Vec<String> {
    Action::all()
        .iter()
        .map(|action| flag(permissions.allows(*action)))
        .collect()
}

/// Fold raw entries into one row per role and module
fn matrix_rows(entries: &[PermissionEntry]) -> BTreeMap<(Role, Module), EffectivePermissions> {
    let mut rows: BTreeMap<(Role, Module), EffectivePermissions> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.allowed) {
        rows.entry((entry.role, entry.module))
            .or_default()
            .grant(entry.action);
    }
    rows
}

pub async fn list_permissions(admin: &PermissionAdmin, cmd: &ListCommand) -> anyhow::Result<()> {
    let mut builder = Builder::default();
    match cmd.role {
        Some(role) => {
            let grants = admin.role_permissions(role).await?;
            if grants.is_empty() {
                println!("Role '{}' has no permissions.", role.bright_blue());
                return Ok(());
            }

            let mut header = vec!["Module".to_string()];
            header.extend(action_headers());
            builder.push_record(header);

            for module in Module::all() {
                let mut permissions = EffectivePermissions::default();
                for (_, action) in grants.iter().filter(|(m, _)| *m == module) {
                    permissions.grant(*action);
                }
                if permissions.is_empty() {
                    continue;
                }
                let mut row = vec![module.to_string()];
                row.extend(permission_cells(&permissions));
                builder.push_record(row);
            }
        }
        None => {
            let entries = admin.permission_matrix().await?;
            let rows = matrix_rows(&entries);
            if rows.is_empty() {
                println!("No permission entries found.");
                return Ok(());
            }

            let mut header = vec!["Role".to_string(), "Module".to_string()];
            header.extend(action_headers());
            builder.push_record(header);

            for ((role, module), permissions) in rows {
                let mut row = vec![role.to_string(), module.to_string()];
                row.extend(permission_cells(&permissions));
                builder.push_record(row);
            }
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

pub async fn grant_permission(admin: &PermissionAdmin, cmd: &EntryCommand) -> anyhow::Result<()> {
    admin
        .set_permission(cmd.role, cmd.module, cmd.action, true)
        .await?;
    println!(
        "Granted '{}' on '{}' to role '{}'.",
        cmd.action.bright_green(),
        cmd.module.bright_green(),
        cmd.role.bright_blue()
    );
    Ok(())
}

pub async fn revoke_permission(admin: &PermissionAdmin, cmd: &EntryCommand) -> anyhow::Result<()> {
    admin
        .revoke_permission(cmd.role, cmd.module, cmd.action)
        .await?;
    println!(
        "Revoked '{}' on '{}' from role '{}'.",
        cmd.action.bright_red(),
        cmd.module.bright_red(),
        cmd.role.bright_blue()
    );
    Ok(())
}

pub async fn check_permission(app_state: &SharedAppState, cmd: &CheckCommand) -> anyhow::Result<()> {
    let session = session_for(app_state, cmd.user, &cmd.roles).await?;
    let roles = session
        .roles()
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    if session.has_permission(cmd.module, cmd.action) {
        println!(
            "{} '{}' on '{}' (roles: {})",
            "Granted".green(),
            cmd.action,
            cmd.module,
            roles
        );
    } else {
        println!(
            "{} '{}' on '{}' (roles: {})",
            "Denied".red(),
            cmd.action,
            cmd.module,
            roles
        );
    }
    Ok(())
}

pub async fn user_permissions(app_state: &SharedAppState, cmd: &UserCommand) -> anyhow::Result<()> {
    let session = session_for(app_state, cmd.user, &cmd.roles).await?;

    let roles = session.roles();
    if roles.is_empty() {
        println!("User holds no roles, every module is denied.");
        return Ok(());
    }

    let mut builder = Builder::default();
    let mut header = vec!["Module".to_string()];
    header.extend(action_headers());
    builder.push_record(header);

    for module in Module::all() {
        let mut row = vec![module.to_string()];
        row.extend(permission_cells(&session.effective_permissions(module)));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!(
        "Roles: {}",
        roles
            .iter()
            .map(|r| r.bright_blue().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("{}", table);
    if let Some(loaded_at) = session.loaded_at() {
        println!("Loaded at {}", loaded_at.to_rfc3339().dimmed());
    }
    Ok(())
}

/// Bootstrap the store. Runs without an acting session since a fresh store
/// has nobody allowed to administer it yet.
pub async fn init_permissions(app_state: &SharedAppState) -> anyhow::Result<()> {
    app_state.store.provision_defaults().await?;
    println!(
        "{}",
        "Default role templates written to the permission store.".green()
    );
    Ok(())
}
