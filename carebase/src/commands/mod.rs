pub mod permissions;

use std::sync::Arc;

use anyhow::Context;
use uuid::Uuid;

use carebase::app_state::SharedAppState;
use carebase::services::authorization::{
    PermissionAdmin, PermissionResolver, StaticIdentityProvider,
};
use carebase_core::authorization::Role;

use crate::cli::Cli;

/// Administration handle for the user running the command.
pub async fn acting_admin(app_state: &SharedAppState, cli: &Cli) -> anyhow::Result<PermissionAdmin> {
    let user = cli
        .as_user
        .context("An acting user is required, pass --as-user or set CAREBASE_AS_USER")?;
    app_state.admin(user).await
}

/// Load a session for the read-only inspection commands, taking the roles
/// from the command line when given and from the identity provider otherwise.
pub async fn session_for(
    app_state: &SharedAppState,
    user: Option<Uuid>,
    roles: &[Role],
) -> anyhow::Result<Arc<PermissionResolver>> {
    if roles.is_empty() {
        let user = user.context("A user id is required when no roles are given")?;
        return app_state.session(user).await;
    }

    let user = user.unwrap_or_else(Uuid::new_v4);
    let identity = StaticIdentityProvider::new();
    identity.assign_roles(user, roles.to_vec()).await;

    let resolver = PermissionResolver::new(app_state.store.clone(), Arc::new(identity));
    resolver
        .initialize(user)
        .await
        .with_context(|| format!("Failed to load permissions of user {}", user))?;
    Ok(Arc::new(resolver))
}
