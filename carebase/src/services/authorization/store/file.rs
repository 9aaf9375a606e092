use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use carebase_core::authorization::{
    Action, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};

use super::{grants_by_role, unavailable, PermissionStore};
use crate::services::authorization::templates::RoleTemplates;

/// On-disk layout of the permission table: role -> module -> allowed actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionDocument {
    #[serde(default)]
    pub roles: BTreeMap<Role, BTreeMap<Module, BTreeSet<Action>>>,
}

impl PermissionDocument {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PermissionEntry>,
    {
        let mut document = Self::default();
        for entry in entries {
            document.apply(entry.role, entry.module, entry.action, entry.allowed);
        }
        document
    }

    /// Set or clear a single flag. Empty modules and roles are pruned.
    pub fn apply(&mut self, role: Role, module: Module, action: Action, allowed: bool) {
        if allowed {
            self.roles
                .entry(role)
                .or_default()
                .entry(module)
                .or_default()
                .insert(action);
            return;
        }

        if let Some(modules) = self.roles.get_mut(&role) {
            if let Some(actions) = modules.get_mut(&module) {
                actions.remove(&action);
                if actions.is_empty() {
                    modules.remove(&module);
                }
            }
            if modules.is_empty() {
                self.roles.remove(&role);
            }
        }
    }

    pub fn entries(&self) -> Vec<PermissionEntry> {
        self.roles
            .iter()
            .flat_map(|(role, modules)| {
                modules.iter().flat_map(move |(module, actions)| {
                    actions
                        .iter()
                        .map(move |action| PermissionEntry::allow(*role, *module, *action))
                })
            })
            .collect()
    }
}

/// Permission table kept in a YAML file.
///
/// Every read goes to disk so several processes sharing the file observe each
/// other's writes. Only a path that does not exist at all reads as the default
/// role templates; a dangling symlink or any other read error is reported as
/// unavailable.
///
/// The document only records allowed actions. Writing `allowed: false`
/// removes the entry, so `list_entries` never returns denied rows here while
/// the memory and REST stores keep them. Decisions are the same either way.
#[derive(Debug)]
pub struct FilePermissionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePermissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the configured path itself is present. A symlink counts even
    /// when its target is gone.
    async fn path_present(&self) -> Result<bool> {
        match tokio::fs::symlink_metadata(&self.path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to inspect {}", self.path.display()))
            }
        }
    }

    async fn load_document(&self) -> Result<PermissionDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.path_present().await? {
                    return Err(e)
                        .with_context(|| format!("Failed to read {}", self.path.display()));
                }
                warn!(
                    "Permission table not found at {}, using default role templates",
                    self.path.display()
                );
                return Ok(PermissionDocument::from_entries(
                    RoleTemplates::default_entries(),
                ));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        if content.trim().is_empty() {
            return Ok(PermissionDocument::default());
        }

        serde_norway::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn save_document(&self, document: &PermissionDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml = serde_norway::to_string(document)?;
        let tmp_path = self.path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp_path, yaml)
            .await
            .context("Failed to write permission table")?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to replace permission table")?;
        Ok(())
    }

    async fn update<F>(&self, mutate: F) -> AuthorizationResult<()>
    where
        F: FnOnce(&mut PermissionDocument) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await.map_err(unavailable)?;
        mutate(&mut document);
        self.save_document(&document).await.map_err(unavailable)
    }
}

#[async_trait]
impl PermissionStore for FilePermissionStore {
    async fn get_permissions(&self, role: Role) -> AuthorizationResult<Grants> {
        let document = self.load_document().await.map_err(unavailable)?;
        Ok(document
            .roles
            .get(&role)
            .map(|modules| {
                modules
                    .iter()
                    .flat_map(|(module, actions)| actions.iter().map(move |a| (*module, *a)))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all_permissions(&self) -> AuthorizationResult<HashMap<Role, Grants>> {
        Ok(grants_by_role(self.list_entries().await?))
    }

    async fn set_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
        allowed: bool,
    ) -> AuthorizationResult<()> {
        self.update(|document| document.apply(role, module, action, allowed))
            .await
    }

    async fn delete_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
    ) -> AuthorizationResult<()> {
        self.update(|document| document.apply(role, module, action, false))
            .await
    }

    async fn list_entries(&self) -> AuthorizationResult<Vec<PermissionEntry>> {
        let document = self.load_document().await.map_err(unavailable)?;
        Ok(document.entries())
    }

    async fn provision_defaults(&self) -> AuthorizationResult<()> {
        self.update(|document| {
            for entry in RoleTemplates::default_entries() {
                document.apply(entry.role, entry.module, entry.action, entry.allowed);
            }
        })
        .await?;
        info!(
            "Provisioned default role templates at {}",
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_default_templates() {
        let temp_dir = tempdir().unwrap();
        let store = FilePermissionStore::new(temp_dir.path().join("permissions.yaml"));

        let admin = store.get_permissions(Role::Admin).await.unwrap();
        assert!(admin.contains(&(Module::UserManagement, Action::Edit)));
        assert_eq!(
            store.list_entries().await.unwrap().len(),
            RoleTemplates::default_entries().len()
        );
    }

    #[tokio::test]
    async fn test_write_persists_to_disk() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::write(&path, "roles: {}\n").await.unwrap();

        let store = FilePermissionStore::new(&path);
        store
            .set_permission(Role::Pharmacist, Module::Billing, Action::View, true)
            .await
            .unwrap();

        // A second store on the same file sees the write
        let other = FilePermissionStore::new(&path);
        let grants = other.get_permissions(Role::Pharmacist).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert!(grants.contains(&(Module::Billing, Action::View)));

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("pharmacist"));
        assert!(content.contains("billing"));
    }

    #[tokio::test]
    async fn test_revoke_prunes_empty_roles() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::write(&path, "roles:\n  nurse:\n    patients: [view]\n")
            .await
            .unwrap();

        let store = FilePermissionStore::new(&path);
        store
            .delete_permission(Role::Nurse, Module::Patients, Action::View)
            .await
            .unwrap();

        assert!(store.get_all_permissions().await.unwrap().is_empty());
        assert!(store.get_permissions(Role::Nurse).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_unavailable() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::write(&path, "roles:\n  janitor:\n    patients: [mop]\n")
            .await
            .unwrap();

        let store = FilePermissionStore::new(&path);
        let err = store.get_permissions(Role::Nurse).await.unwrap_err();
        assert!(err.is_store_unavailable());

        let err = store
            .set_permission(Role::Nurse, Module::Patients, Action::View, true)
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
        // the failed write left the file untouched
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("janitor"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_is_store_unavailable() {
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("mounted").join("permissions.yaml");
        let path = temp_dir.path().join("permissions.yaml");
        std::os::unix::fs::symlink(&target, &path).unwrap();

        let store = FilePermissionStore::new(&path);
        let err = store.get_all_permissions().await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(store
            .get_permissions(Role::Admin)
            .await
            .unwrap_err()
            .is_store_unavailable());

        // nothing was written through the broken link
        let err = store
            .set_permission(Role::Nurse, Module::Patients, Action::View, true)
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_unreadable_path_is_store_unavailable() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::create_dir(&path).await.unwrap();

        let store = FilePermissionStore::new(&path);
        let err = store.list_entries().await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_denied_write_removes_the_entry() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::write(&path, "roles:\n  nurse:\n    patients: [view, edit]\n")
            .await
            .unwrap();

        let store = FilePermissionStore::new(&path);
        store
            .set_permission(Role::Nurse, Module::Patients, Action::Edit, false)
            .await
            .unwrap();

        assert_eq!(
            store.list_entries().await.unwrap(),
            vec![PermissionEntry::allow(
                Role::Nurse,
                Module::Patients,
                Action::View
            )]
        );
    }

    #[tokio::test]
    async fn test_provision_defaults_creates_document() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("permissions.yaml");
        let store = FilePermissionStore::new(&path);

        store.provision_defaults().await.unwrap();
        assert!(path.exists());
        let doc: PermissionDocument =
            serde_norway::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(
            doc,
            PermissionDocument::from_entries(RoleTemplates::default_entries())
        );
    }

    #[tokio::test]
    async fn test_provision_defaults_keeps_custom_grants() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("permissions.yaml");
        tokio::fs::write(&path, "roles:\n  nurse:\n    billing: [view]\n")
            .await
            .unwrap();

        let store = FilePermissionStore::new(&path);
        store.provision_defaults().await.unwrap();

        let nurse = store.get_permissions(Role::Nurse).await.unwrap();
        assert!(nurse.contains(&(Module::Billing, Action::View)));
        assert!(nurse.contains(&(Module::Appointments, Action::Create)));
    }
}
