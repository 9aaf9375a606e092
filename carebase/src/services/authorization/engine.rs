use anyhow::{Context, Result};
use casbin::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

use carebase_core::authorization::{
    Action, AuthorizationError, AuthorizationResult, EffectivePermissions, Grants, Module, Role,
};

use super::snapshot::PermissionSnapshot;

/// RBAC model: a user inherits the policies of every role it is grouped
/// into, and any matching allow policy grants the request.
const RBAC_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

/// Compiles role grants into a per-session permission snapshot.
pub struct PolicyEngine;

impl PolicyEngine {
    fn user_subject(user_id: Uuid) -> String {
        format!("user:{}", user_id)
    }

    fn role_subject(role: Role) -> String {
        format!("role:{}", role.as_str())
    }

    /// Build an enforcer holding the user's role groupings and the policies
    /// of every held role.
    pub async fn build_enforcer(
        user_id: Uuid,
        roles: &BTreeSet<Role>,
        grants: &HashMap<Role, Grants>,
    ) -> Result<Enforcer> {
        let model = DefaultModel::from_str(RBAC_MODEL)
            .await
            .context("Failed to load RBAC model")?;
        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .context("Failed to create policy enforcer")?;

        let user = Self::user_subject(user_id);
        for role in roles {
            let subject = Self::role_subject(*role);
            debug!("Adding g: {} -> {}", user, subject);
            enforcer
                .add_grouping_policy(vec![user.clone(), subject.clone()])
                .await?;

            // A held role without entries simply contributes nothing
            let Some(role_grants) = grants.get(role) else {
                continue;
            };
            for (module, action) in role_grants {
                enforcer
                    .add_policy(vec![
                        subject.clone(),
                        module.as_str().to_string(),
                        action.as_str().to_string(),
                    ])
                    .await?;
            }
        }

        Ok(enforcer)
    }

    /// Evaluate every (module, action) pair for the user once.
    pub async fn compile(
        user_id: Uuid,
        roles: BTreeSet<Role>,
        grants: &HashMap<Role, Grants>,
    ) -> AuthorizationResult<PermissionSnapshot> {
        let enforcer = Self::build_enforcer(user_id, &roles, grants)
            .await
            .map_err(|e| AuthorizationError::PolicyEngine(format!("{e:#}")))?;

        let user = Self::user_subject(user_id);
        let mut modules = HashMap::new();
        for module in Module::all() {
            let mut effective = EffectivePermissions::default();
            for action in Action::all() {
                let allowed = enforcer
                    .enforce((user.as_str(), module.as_str(), action.as_str()))
                    .map_err(|e| AuthorizationError::PolicyEngine(e.to_string()))?;
                if allowed {
                    effective.grant(action);
                }
            }
            if !effective.is_empty() {
                modules.insert(module, effective);
            }
        }

        Ok(PermissionSnapshot::new(user_id, roles, modules))
    }
}
