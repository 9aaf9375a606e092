use maplit::hashmap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use uuid::Uuid;

use carebase::services::authorization::{
    FilePermissionStore, PermissionResolver, ResolverState, StaticIdentityProvider,
};
use carebase_core::authorization::{Action, Module, Role};

const TRIMMED_DOCTOR: &str = "roles:\n  doctor:\n    dashboard: [view]\n";

async fn doctor_session(path: &Path) -> (Uuid, PermissionResolver) {
    let user = Uuid::new_v4();
    let identity = StaticIdentityProvider::with_assignments(hashmap! {
        user => vec![Role::Doctor],
    });
    let resolver = PermissionResolver::new(
        Arc::new(FilePermissionStore::new(path)),
        Arc::new(identity),
    );
    resolver.initialize(user).await.unwrap();
    (user, resolver)
}

/// The backing file disappears behind its symlink while a session is loaded
#[cfg(unix)]
#[tokio::test]
async fn test_vanished_link_target_denies_instead_of_templates() {
    let temp_dir = tempdir().unwrap();
    let target = temp_dir.path().join("mounted").join("permissions.yaml");
    tokio::fs::create_dir_all(target.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(&target, TRIMMED_DOCTOR).await.unwrap();
    let path = temp_dir.path().join("permissions.yaml");
    std::os::unix::fs::symlink(&target, &path).unwrap();

    let (_, resolver) = doctor_session(&path).await;
    assert!(resolver.has_permission(Module::Dashboard, Action::View));
    assert!(!resolver.has_permission(Module::Patients, Action::Edit));

    tokio::fs::remove_dir_all(target.parent().unwrap())
        .await
        .unwrap();

    let err = resolver.refresh().await.unwrap_err();
    assert!(err.is_store_unavailable());
    assert!(matches!(resolver.state(), ResolverState::Failed { .. }));
    assert!(!resolver.has_permission(Module::Patients, Action::Edit));
    assert!(!resolver.has_permission(Module::Dashboard, Action::View));
}

#[tokio::test]
async fn test_unreadable_table_denies_after_refresh() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("permissions.yaml");
    tokio::fs::write(&path, TRIMMED_DOCTOR).await.unwrap();

    let (_, resolver) = doctor_session(&path).await;
    assert!(resolver.can_access_module(Module::Dashboard));

    // replace the file with something that cannot be read as one
    tokio::fs::remove_file(&path).await.unwrap();
    tokio::fs::create_dir(&path).await.unwrap();

    let err = resolver.refresh().await.unwrap_err();
    assert!(err.is_store_unavailable());
    for module in Module::all() {
        assert!(!resolver.can_access_module(module));
    }
}

#[tokio::test]
async fn test_table_restored_after_outage_recovers() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("permissions.yaml");
    tokio::fs::write(&path, TRIMMED_DOCTOR).await.unwrap();

    let (user, resolver) = doctor_session(&path).await;
    tokio::fs::remove_file(&path).await.unwrap();
    tokio::fs::create_dir(&path).await.unwrap();
    assert!(resolver.refresh().await.is_err());

    tokio::fs::remove_dir(&path).await.unwrap();
    tokio::fs::write(&path, TRIMMED_DOCTOR).await.unwrap();
    resolver.refresh().await.unwrap();

    assert_eq!(resolver.user_id(), Some(user));
    assert!(resolver.has_permission(Module::Dashboard, Action::View));
    assert!(!resolver.has_permission(Module::Patients, Action::Edit));
}
