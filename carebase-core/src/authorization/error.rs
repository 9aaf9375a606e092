use super::{Action, Module};

/// Failures of the permission layer.
///
/// Every variant resolves to "denied" at a decision point. None of them is
/// ever turned into a grant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The permission store or identity backend could not be reached or
    /// answered with an error.
    #[error("Permission store unavailable: {0}")]
    StoreUnavailable(String),

    /// The acting user lacks the permission required for the operation.
    #[error("Permission denied: {action} on {module}")]
    Forbidden { module: Module, action: Action },

    /// The resolver has no loaded snapshot yet.
    #[error("Permissions are not loaded yet")]
    NotReady,

    /// No user is bound to the resolver.
    #[error("No active session")]
    NoSession,

    /// The loaded entries could not be compiled into a policy.
    #[error("Failed to build permission policy: {0}")]
    PolicyEngine(String),
}

impl AuthorizationError {
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Check if this error comes from the backend rather than a denied check
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

pub type AuthorizationResult<T> = Result<T, AuthorizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthorizationError::store_unavailable("connection refused");
        assert!(err.is_store_unavailable());
        assert_eq!(
            err.to_string(),
            "Permission store unavailable: connection refused"
        );

        let err = AuthorizationError::Forbidden {
            module: Module::Billing,
            action: Action::Delete,
        };
        assert!(err.is_forbidden());
        assert_eq!(err.to_string(), "Permission denied: delete on billing");
    }
}
