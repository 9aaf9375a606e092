mod cli;
mod commands;

use clap::Parser;
use tracing::info;

use carebase::app_state::AppState;
use carebase::init_telemetry::init_tracing;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let app_state = AppState::new().await?;
    init_tracing(&app_state.settings)?;

    info!("Running command {:?} ...", &cli.command);

    match &cli.command {
        Commands::PermissionsList(cmd) => {
            let admin = commands::acting_admin(&app_state, &cli).await?;
            commands::permissions::list_permissions(&admin, cmd).await
        }
        Commands::PermissionsGrant(cmd) => {
            let admin = commands::acting_admin(&app_state, &cli).await?;
            commands::permissions::grant_permission(&admin, cmd).await
        }
        Commands::PermissionsRevoke(cmd) => {
            let admin = commands::acting_admin(&app_state, &cli).await?;
            commands::permissions::revoke_permission(&admin, cmd).await
        }
        Commands::PermissionsCheck(cmd) => {
            commands::permissions::check_permission(&app_state, cmd).await
        }
        Commands::PermissionsUser(cmd) => {
            commands::permissions::user_permissions(&app_state, cmd).await
        }
        Commands::PermissionsInit => commands::permissions::init_permissions(&app_state).await,
    }
}
