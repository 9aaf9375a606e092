use async_trait::async_trait;
use maplit::hashmap;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use carebase::services::authorization::{
    GateState, MemoryPermissionStore, PermissionResolver, PermissionStore, ResolverState,
    StaticIdentityProvider,
};
use carebase_core::authorization::{
    Action, AuthorizationError, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};

/// Store whose backend is down for every call
#[derive(Debug)]
struct UnavailableStore;

#[async_trait]
impl PermissionStore for UnavailableStore {
    async fn get_permissions(&self, _role: Role) -> AuthorizationResult<Grants> {
        Err(AuthorizationError::store_unavailable("connection refused"))
    }

    async fn get_all_permissions(&self) -> AuthorizationResult<HashMap<Role, Grants>> {
        Err(AuthorizationError::store_unavailable("connection refused"))
    }

    async fn set_permission(
        &self,
        _role: Role,
        _module: Module,
        _action: Action,
        _allowed: bool,
    ) -> AuthorizationResult<()> {
        Err(AuthorizationError::store_unavailable("connection refused"))
    }

    async fn delete_permission(
        &self,
        _role: Role,
        _module: Module,
        _action: Action,
    ) -> AuthorizationResult<()> {
        Err(AuthorizationError::store_unavailable("connection refused"))
    }

    async fn list_entries(&self) -> AuthorizationResult<Vec<PermissionEntry>> {
        Err(AuthorizationError::store_unavailable("connection refused"))
    }
}

fn session(store: Arc<dyn PermissionStore>, user: Uuid, roles: Vec<Role>) -> PermissionResolver {
    let identity = StaticIdentityProvider::with_assignments(hashmap! { user => roles });
    PermissionResolver::new(store, Arc::new(identity))
}

/// Scenario A: a receptionist with view and create on appointments
#[tokio::test]
async fn test_single_role_grants_only_its_entries() {
    let store = Arc::new(MemoryPermissionStore::with_entries(vec![
        PermissionEntry::allow(Role::Receptionist, Module::Appointments, Action::View),
        PermissionEntry::allow(Role::Receptionist, Module::Appointments, Action::Create),
    ]));
    let user = Uuid::new_v4();
    let resolver = session(store, user, vec![Role::Receptionist]);
    resolver.initialize(user).await.unwrap();

    assert!(resolver.has_permission(Module::Appointments, Action::View));
    assert!(resolver.has_permission(Module::Appointments, Action::Create));
    assert!(!resolver.has_permission(Module::Appointments, Action::Delete));
    assert!(!resolver.can_access_module(Module::Billing));
    assert_eq!(resolver.accessible_modules(), vec![Module::Appointments]);
}

/// Scenario B: admin grants user_management edit, doctor has nothing there
#[tokio::test]
async fn test_union_across_roles() {
    let store = Arc::new(MemoryPermissionStore::with_entries(vec![
        PermissionEntry::allow(Role::Admin, Module::UserManagement, Action::Edit),
        PermissionEntry::allow(Role::Doctor, Module::Patients, Action::View),
    ]));
    let user = Uuid::new_v4();
    let resolver = session(store.clone(), user, vec![Role::Admin, Role::Doctor]);
    resolver.initialize(user).await.unwrap();

    assert!(resolver.has_permission(Module::UserManagement, Action::Edit));
    assert!(resolver.has_permission(Module::Patients, Action::View));

    // doctor alone would not get it
    let doctor = Uuid::new_v4();
    let doctor_session = session(store, doctor, vec![Role::Doctor]);
    doctor_session.initialize(doctor).await.unwrap();
    assert!(!doctor_session.has_permission(Module::UserManagement, Action::Edit));
}

/// Scenario C: the store is down while the session loads
#[tokio::test]
async fn test_unavailable_store_denies_everything() {
    let user = Uuid::new_v4();
    let resolver = session(Arc::new(UnavailableStore), user, vec![Role::Admin]);

    let err = resolver.initialize(user).await.unwrap_err();
    assert!(err.is_store_unavailable());
    assert!(matches!(resolver.state(), ResolverState::Failed { .. }));

    for module in Module::all() {
        for action in Action::all() {
            assert!(!resolver.has_permission(module, action));
        }
    }

    let gate = resolver.gate(Module::Dashboard, Action::View);
    assert_eq!(gate.state(), GateState::Denied);
    assert_eq!(gate.render_or_nothing(|| "dashboard"), None);
    assert_eq!(gate.render(|| "dashboard", || "no access"), Some("no access"));
}

/// Scenario D: a role nobody has written entries for yet
#[tokio::test]
async fn test_role_without_entries_is_empty() {
    let store = Arc::new(MemoryPermissionStore::with_entries(vec![
        PermissionEntry::allow(Role::Nurse, Module::Patients, Action::View),
    ]));
    assert!(store
        .get_permissions(Role::LabTechnician)
        .await
        .unwrap()
        .is_empty());

    let user = Uuid::new_v4();
    let resolver = session(store, user, vec![Role::LabTechnician]);
    resolver.initialize(user).await.unwrap();

    assert!(resolver.is_ready());
    for module in Module::all() {
        for action in Action::all() {
            assert!(!resolver.has_permission(module, action));
        }
    }
}

#[tokio::test]
async fn test_never_initialized_resolver_denies() {
    let resolver = session(
        Arc::new(MemoryPermissionStore::with_default_templates()),
        Uuid::new_v4(),
        vec![Role::Admin],
    );

    assert!(!resolver.has_permission(Module::Dashboard, Action::View));
    assert_eq!(
        resolver.gate(Module::Dashboard, Action::View).state(),
        GateState::Loading
    );
}

#[tokio::test]
async fn test_user_without_roles_is_denied() {
    let resolver = session(
        Arc::new(MemoryPermissionStore::with_default_templates()),
        Uuid::new_v4(),
        vec![],
    );
    let stranger = Uuid::new_v4();
    resolver.initialize(stranger).await.unwrap();

    assert!(resolver.roles().is_empty());
    assert!(resolver.accessible_modules().is_empty());
}

#[tokio::test]
async fn test_repeated_grant_is_idempotent() {
    let store = Arc::new(MemoryPermissionStore::new());
    for _ in 0..3 {
        store
            .set_permission(Role::Pharmacist, Module::Pharmacy, Action::Edit, true)
            .await
            .unwrap();
    }

    let entries = store.list_entries().await.unwrap();
    assert_eq!(
        entries,
        vec![PermissionEntry::allow(
            Role::Pharmacist,
            Module::Pharmacy,
            Action::Edit
        )]
    );
}

#[tokio::test]
async fn test_revoke_takes_effect_after_refresh() {
    let store = Arc::new(MemoryPermissionStore::with_entries(vec![
        PermissionEntry::allow(Role::Receptionist, Module::Billing, Action::View),
        PermissionEntry::allow(Role::Receptionist, Module::Billing, Action::Delete),
    ]));
    let user = Uuid::new_v4();
    let resolver = session(store.clone(), user, vec![Role::Receptionist]);
    resolver.initialize(user).await.unwrap();
    assert!(resolver.has_permission(Module::Billing, Action::Delete));

    store
        .delete_permission(Role::Receptionist, Module::Billing, Action::Delete)
        .await
        .unwrap();
    resolver.refresh().await.unwrap();

    assert!(!resolver.has_permission(Module::Billing, Action::Delete));
    assert!(resolver.has_permission(Module::Billing, Action::View));
}

#[tokio::test]
async fn test_gate_goes_from_loading_to_granted_without_denied() {
    let store = Arc::new(MemoryPermissionStore::with_default_templates());
    let user = Uuid::new_v4();
    let resolver = session(store, user, vec![Role::Nurse]);

    let mut gate = resolver.gate(Module::Appointments, Action::Create);
    assert_eq!(gate.state(), GateState::Loading);

    resolver.initialize(user).await.unwrap();
    assert_eq!(gate.changed().await, Some(GateState::Granted));
}

#[tokio::test]
async fn test_sign_out_revokes_every_gate() {
    let store = Arc::new(MemoryPermissionStore::with_default_templates());
    let user = Uuid::new_v4();
    let resolver = session(store, user, vec![Role::Doctor]);
    resolver.initialize(user).await.unwrap();

    let mut gate = resolver.gate(Module::Patients, Action::Edit);
    assert_eq!(gate.state(), GateState::Granted);

    resolver.sign_out();
    assert_eq!(gate.changed().await, Some(GateState::Denied));
    assert!(!resolver.has_permission(Module::Patients, Action::Edit));
    assert!(matches!(
        resolver.refresh().await,
        Err(AuthorizationError::NoSession)
    ));
}
