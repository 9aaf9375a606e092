use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use carebase_core::authorization::{Action, Module, Role};

#[derive(Parser)]
#[command(name = "carebase")]
#[command(about = "Inspect and administer carebase role permissions")]
#[command(version)]
pub struct Cli {
    /// User whose session performs administrative commands. Their roles are
    /// read from the identity provider.
    #[arg(long, global = true, env = "CAREBASE_AS_USER")]
    pub as_user: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored permission entries
    #[command(name = "permissions:list")]
    PermissionsList(ListCommand),
    /// Allow an action on a module for a role
    #[command(name = "permissions:grant")]
    PermissionsGrant(EntryCommand),
    /// Remove an action on a module from a role
    #[command(name = "permissions:revoke")]
    PermissionsRevoke(EntryCommand),
    /// Check a single decision for a user
    #[command(name = "permissions:check")]
    PermissionsCheck(CheckCommand),
    /// Show the effective permissions of a user on every module
    #[command(name = "permissions:user")]
    PermissionsUser(UserCommand),
    /// Write the default role templates to the permission store
    #[command(name = "permissions:init")]
    PermissionsInit,
}

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Only show the permissions of this role
    #[arg(long, value_enum)]
    pub role: Option<Role>,
}

#[derive(Args, Debug)]
pub struct EntryCommand {
    #[arg(value_enum)]
    pub role: Role,
    #[arg(value_enum)]
    pub module: Module,
    #[arg(value_enum)]
    pub action: Action,
}

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// User to resolve, a random one when only roles are given
    #[arg(long, required_unless_present = "roles")]
    pub user: Option<Uuid>,

    /// Roles to resolve instead of asking the identity provider
    #[arg(long = "role", value_enum)]
    pub roles: Vec<Role>,

    #[arg(value_enum)]
    pub module: Module,
    #[arg(value_enum)]
    pub action: Action,
}

#[derive(Args, Debug)]
pub struct UserCommand {
    #[arg(long, required_unless_present = "roles")]
    pub user: Option<Uuid>,

    #[arg(long = "role", value_enum)]
    pub roles: Vec<Role>,
}
