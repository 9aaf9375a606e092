use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use carebase_core::authorization::{AuthorizationResult, Role};
use carebase_core::settings::store::StoreSettings;

use super::store::rest::RestClient;
use super::store::unavailable;

/// Source of the role assignments of an authenticated user.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    async fn roles_for(&self, user_id: Uuid) -> AuthorizationResult<Vec<Role>>;
}

/// Parse role names coming from a collaborator, dropping the ones we do not know.
pub fn parse_roles<I, S>(user_id: Uuid, names: I) -> Vec<Role>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let roles: BTreeSet<Role> = names
        .into_iter()
        .filter_map(|name| {
            let role = Role::from_str(name.as_ref());
            if role.is_none() {
                warn!(
                    "Ignoring unknown role '{}' assigned to user {}",
                    name.as_ref(),
                    user_id
                );
            }
            role
        })
        .collect();
    roles.into_iter().collect()
}

/// In-memory role assignments.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    assignments: Arc<RwLock<HashMap<Uuid, Vec<Role>>>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignments(assignments: HashMap<Uuid, Vec<Role>>) -> Self {
        Self {
            assignments: Arc::new(RwLock::new(assignments)),
        }
    }

    /// Replace the roles of a user. Live resolvers see the change after `refresh()`.
    pub async fn assign_roles(&self, user_id: Uuid, roles: Vec<Role>) {
        self.assignments.write().await.insert(user_id, roles);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn roles_for(&self, user_id: Uuid) -> AuthorizationResult<Vec<Role>> {
        Ok(self
            .assignments
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct UserRoleRow {
    role: String,
}

/// Role assignments read from the backend's `user_roles` table.
#[derive(Debug, Clone)]
pub struct RestIdentityProvider {
    client: RestClient,
    table: String,
}

impl RestIdentityProvider {
    pub fn new(client: RestClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        Ok(Self::new(
            RestClient::from_settings(settings)?,
            settings.user_roles_table.clone(),
        ))
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn roles_for(&self, user_id: Uuid) -> AuthorizationResult<Vec<Role>> {
        let id = user_id.to_string();
        let rows: Vec<UserRoleRow> = self
            .client
            .select(&self.table, "role", &[("user_id", id.as_str())])
            .await
            .map_err(|e| {
                warn!("Failed to read roles of user {}: {:#}", user_id, e);
                unavailable(e)
            })?;
        Ok(parse_roles(user_id, rows.into_iter().map(|r| r.role)))
    }
}
