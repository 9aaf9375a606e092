use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use uuid::Uuid;

use carebase_core::settings::store::StoreBackend;

use crate::services::authorization::{
    FilePermissionStore, IdentityProvider, MemoryPermissionStore, PermissionAdmin,
    PermissionResolver, PermissionStore, RestIdentityProvider, RestPermissionStore, StaticIdentityProvider,
};
use crate::settings::config::Settings;

/// Collaborators shared by every session of the process.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<dyn PermissionStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub async fn new() -> anyhow::Result<SharedAppState> {
        let settings = Settings::new().context("Failed to load settings")?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> anyhow::Result<SharedAppState> {
        let store: Arc<dyn PermissionStore> = match settings.store.backend {
            StoreBackend::Memory => Arc::new(MemoryPermissionStore::with_default_templates()),
            StoreBackend::File => Arc::new(FilePermissionStore::new(&settings.store.path)),
            StoreBackend::Rest => Arc::new(RestPermissionStore::from_settings(&settings.store)?),
        };

        let identity: Arc<dyn IdentityProvider> = match settings.store.backend {
            StoreBackend::Rest => Arc::new(RestIdentityProvider::from_settings(&settings.store)?),
            StoreBackend::Memory | StoreBackend::File => Arc::new(
                StaticIdentityProvider::with_assignments(settings.identity.users.clone()),
            ),
        };

        info!(
            "Permission store backend: {:?}, {} statically assigned users",
            settings.store.backend,
            settings.identity.users.len()
        );

        Ok(Arc::new(AppState {
            settings,
            store,
            identity,
        }))
    }

    /// Fresh resolver for a new session
    pub fn resolver(&self) -> PermissionResolver {
        PermissionResolver::new(self.store.clone(), self.identity.clone())
    }

    /// Resolver with the session of `user_id` loaded
    pub async fn session(&self, user_id: Uuid) -> anyhow::Result<Arc<PermissionResolver>> {
        let resolver = self.resolver();
        resolver
            .initialize(user_id)
            .await
            .with_context(|| format!("Failed to load permissions of user {}", user_id))?;
        Ok(Arc::new(resolver))
    }

    /// Administration handle acting as `user_id`. The roles always come from
    /// the identity provider, so the actor cannot claim more than they hold.
    pub async fn admin(&self, user_id: Uuid) -> anyhow::Result<PermissionAdmin> {
        let actor = self.session(user_id).await?;
        Ok(PermissionAdmin::new(self.store.clone(), actor))
    }
}
