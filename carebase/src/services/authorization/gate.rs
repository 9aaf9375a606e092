use tokio::sync::watch;
use tracing::debug;

use carebase_core::authorization::{Action, AuthorizationError, AuthorizationResult, Module};

use super::resolver::{PermissionResolver, ResolverState};

/// Outcome of a gate at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The resolver has not produced a decision yet; render nothing
    Loading,
    Granted,
    Denied,
}

/// Decision point for one protected call site.
///
/// A gate follows its resolver for as long as it lives: every published
/// resolver state is re-evaluated, so a refresh that revokes or restores a
/// permission flips the gate. There is no terminal state.
///
/// Failed and signed-out resolvers deny. Pending resolvers suspend.
#[derive(Debug, Clone)]
pub struct AccessGate {
    module: Module,
    action: Action,
    receiver: watch::Receiver<ResolverState>,
    last: GateState,
}

impl AccessGate {
    pub fn new(resolver: &PermissionResolver, module: Module, action: Action) -> Self {
        let receiver = resolver.subscribe();
        let last = Self::evaluate(&receiver.borrow(), module, action);
        Self {
            module,
            action,
            receiver,
            last,
        }
    }

    pub fn evaluate(state: &ResolverState, module: Module, action: Action) -> GateState {
        if state.is_pending() {
            return GateState::Loading;
        }
        if state.has_permission(module, action) {
            GateState::Granted
        } else {
            GateState::Denied
        }
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Decision against the resolver's current snapshot
    pub fn state(&self) -> GateState {
        Self::evaluate(&self.receiver.borrow(), self.module, self.action)
    }

    /// Produce the protected content when granted, the fallback when denied,
    /// and nothing while loading.
    pub fn render<T>(
        &self,
        protected: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Option<T> {
        match self.state() {
            GateState::Loading => None,
            GateState::Granted => Some(protected()),
            GateState::Denied => Some(fallback()),
        }
    }

    /// Like [`render`](Self::render) with an absent fallback
    pub fn render_or_nothing<T>(&self, protected: impl FnOnce() -> T) -> Option<T> {
        match self.state() {
            GateState::Granted => Some(protected()),
            GateState::Loading | GateState::Denied => None,
        }
    }

    /// Check before executing a protected operation.
    pub fn authorize(&self) -> AuthorizationResult<()> {
        match self.state() {
            GateState::Granted => Ok(()),
            GateState::Denied => Err(AuthorizationError::Forbidden {
                module: self.module,
                action: self.action,
            }),
            GateState::Loading => Err(AuthorizationError::NotReady),
        }
    }

    /// Wait for the next transition of this gate.
    ///
    /// Resolver updates that leave the decision unchanged are skipped.
    /// Returns `None` once the resolver is gone.
    pub async fn changed(&mut self) -> Option<GateState> {
        loop {
            if self.receiver.changed().await.is_err() {
                return None;
            }
            let next = {
                let state = self.receiver.borrow_and_update();
                Self::evaluate(&state, self.module, self.action)
            };
            if next != self.last {
                debug!(
                    "Gate {} on {} moved from {:?} to {:?}",
                    self.action, self.module, self.last, next
                );
                self.last = next;
                return Some(next);
            }
        }
    }
}
