use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use carebase_core::authorization::{
    Action, AuthorizationError, AuthorizationResult, EffectivePermissions, Module, Role,
};

use super::engine::PolicyEngine;
use super::gate::AccessGate;
use super::identity::IdentityProvider;
use super::snapshot::PermissionSnapshot;
use super::store::PermissionStore;

/// Lifecycle of a resolver. Only `Ready` can grant anything.
#[derive(Debug, Clone)]
pub enum ResolverState {
    /// Constructed, `initialize` not called yet
    Uninitialized,
    /// First load for a session is in flight
    Loading { user_id: Uuid },
    Ready(Arc<PermissionSnapshot>),
    /// The last load failed; everything is denied until a refresh succeeds
    Failed {
        user_id: Uuid,
        error: AuthorizationError,
    },
    SignedOut,
}

impl ResolverState {
    /// User bound to the session, if any
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            ResolverState::Loading { user_id } | ResolverState::Failed { user_id, .. } => {
                Some(*user_id)
            }
            ResolverState::Ready(snapshot) => Some(snapshot.user_id()),
            ResolverState::Uninitialized | ResolverState::SignedOut => None,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<PermissionSnapshot>> {
        match self {
            ResolverState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// No decision is available yet and none has failed
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ResolverState::Uninitialized | ResolverState::Loading { .. }
        )
    }

    pub fn has_permission(&self, module: Module, action: Action) -> bool {
        self.snapshot()
            .map(|s| s.has_permission(module, action))
            .unwrap_or(false)
    }
}

/// Per-session permission resolver.
///
/// Loads the user's roles and the role permission table, compiles them into a
/// [`PermissionSnapshot`] and answers decisions synchronously from it. New
/// snapshots are published in a single step through a watch channel, so a
/// reader sees either the previous or the next snapshot and never a mix.
///
/// Every load carries a generation number. `sign_out` and newer loads bump
/// the generation, and a load that finishes with a stale generation throws
/// its result away.
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<ResolverState>,
    generation: AtomicU64,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn PermissionStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(ResolverState::Uninitialized);
        Self {
            store,
            identity,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Current state, cloned out of the channel
    pub fn state(&self) -> ResolverState {
        self.state.borrow().clone()
    }

    /// Receiver woken on every state change
    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state.subscribe()
    }

    /// Gate for one protected call site
    pub fn gate(&self, module: Module, action: Action) -> AccessGate {
        AccessGate::new(self, module, action)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), ResolverState::Ready(_))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.state.borrow().user_id()
    }

    /// Roles of the loaded session; empty until a snapshot is ready
    pub fn roles(&self) -> Vec<Role> {
        self.state
            .borrow()
            .snapshot()
            .map(|s| s.roles().iter().copied().collect())
            .unwrap_or_default()
    }

    /// When the current snapshot was read from the store
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().snapshot().map(|s| s.loaded_at())
    }

    /// Load the session of `user_id`. While this runs the resolver is
    /// `Loading` and denies everything.
    pub async fn initialize(&self, user_id: Uuid) -> AuthorizationResult<()> {
        let generation = self.next_generation();
        self.publish(generation, ResolverState::Loading { user_id });
        info!("Loading permissions for user {}", user_id);
        self.load_and_publish(generation, user_id).await
    }

    /// Re-read roles and permission entries for the bound user. The current
    /// snapshot stays visible until the new one replaces it.
    pub async fn refresh(&self) -> AuthorizationResult<()> {
        let user_id = self.user_id().ok_or(AuthorizationError::NoSession)?;
        let generation = self.next_generation();
        info!("Refreshing permissions for user {}", user_id);
        self.load_and_publish(generation, user_id).await
    }

    /// End the session. In-flight loads are discarded.
    pub fn sign_out(&self) {
        self.next_generation();
        self.state.send_replace(ResolverState::SignedOut);
        info!("Permission session signed out");
    }

    pub fn has_permission(&self, module: Module, action: Action) -> bool {
        let allowed = self.state.borrow().has_permission(module, action);
        debug!("Decision {} on {}: {}", action, module, allowed);
        allowed
    }

    pub fn can_access_module(&self, module: Module) -> bool {
        self.has_permission(module, Action::View)
    }

    pub fn effective_permissions(&self, module: Module) -> EffectivePermissions {
        self.state
            .borrow()
            .snapshot()
            .map(|s| s.effective_permissions(module))
            .unwrap_or_default()
    }

    pub fn accessible_modules(&self) -> Vec<Module> {
        self.state
            .borrow()
            .snapshot()
            .map(|s| s.accessible_modules())
            .unwrap_or_default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the state if `generation` is still current. The check runs
    /// under the channel's write lock, so it cannot interleave with
    /// `sign_out`.
    fn publish(&self, generation: u64, next: ResolverState) -> bool {
        let mut next = Some(next);
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match next.take() {
                Some(value) => {
                    *state = value;
                    true
                }
                None => false,
            }
        })
    }

    async fn load_and_publish(&self, generation: u64, user_id: Uuid) -> AuthorizationResult<()> {
        match self.load(user_id).await {
            Ok(snapshot) => {
                let roles = snapshot
                    .roles()
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let accessible = snapshot.accessible_modules().len();
                let loaded_at = snapshot.loaded_at();
                if self.publish(generation, ResolverState::Ready(Arc::new(snapshot))) {
                    info!(
                        "Permissions loaded for user {} at {}: roles [{}], {} accessible modules",
                        user_id,
                        loaded_at.to_rfc3339(),
                        roles,
                        accessible
                    );
                } else {
                    debug!("Discarding stale permission load for user {}", user_id);
                }
                Ok(())
            }
            Err(error) => {
                let failed = ResolverState::Failed {
                    user_id,
                    error: error.clone(),
                };
                if !self.publish(generation, failed) {
                    debug!(
                        "Discarding stale failed permission load for user {}: {}",
                        user_id, error
                    );
                    return Ok(());
                }
                warn!("Failed to load permissions for user {}: {}", user_id, error);
                Err(error)
            }
        }
    }

    async fn load(&self, user_id: Uuid) -> AuthorizationResult<PermissionSnapshot> {
        let roles = self.identity.roles_for(user_id).await?;
        let grants = self.store.get_all_permissions().await?;
        PolicyEngine::compile(user_id, roles.into_iter().collect(), &grants).await
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("state", &*self.state.borrow())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
