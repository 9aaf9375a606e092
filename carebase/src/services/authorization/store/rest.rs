use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use carebase_core::authorization::{
    Action, AuthorizationResult, Grants, Module, PermissionEntry, Role,
};
use carebase_core::settings::store::StoreSettings;

use super::{grants_by_role, unavailable, PermissionStore};

/// Thin client for the managed backend's PostgREST interface.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: Option<&SecretString>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid backend url '{}'", base_url))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut apikey = HeaderValue::from_str(key.expose_secret())
                .context("API key contains invalid header characters")?;
            apikey.set_sensitive(true);
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                .context("API key contains invalid header characters")?;
            bearer.set_sensitive(true);
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .context("store.url is required for the rest backend")?;
        Self::new(
            url,
            settings.api_key.as_ref(),
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    /// Url of a table endpoint with `column=eq.value` filters applied
    fn table_url(&self, table: &str, filters: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Backend url '{}' cannot be a base", self.base_url))?
            .pop_if_empty()
            .push(table);
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{}", value));
            }
        }
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.context("Request to backend failed")?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
                return Err(anyhow!("{}: {}", status, message));
            }
        }
        if !body.is_empty() && body.len() < 500 {
            return Err(anyhow!("{}: {}", status, body));
        }
        Err(anyhow!("HTTP error: {}", status))
    }

    pub async fn select<T>(&self, table: &str, columns: &str, filters: &[(&str, &str)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut url = self.table_url(table, filters)?;
        url.query_pairs_mut().append_pair("select", columns);
        debug!("GET {}", url);
        let response = Self::send(self.client.get(url)).await?;
        response
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("Failed to decode rows from '{}'", table))
    }

    pub async fn upsert<T>(&self, table: &str, on_conflict: &str, rows: &[T]) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let mut url = self.table_url(table, &[])?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        debug!("POST {}", url);
        Self::send(
            self.client
                .post(url)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, &str)]) -> Result<()> {
        let url = self.table_url(table, filters)?;
        debug!("DELETE {}", url);
        Self::send(self.client.delete(url)).await?;
        Ok(())
    }
}

/// Row shape of the `role_permissions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PermissionRow {
    role: String,
    module: String,
    action: String,
    allowed: bool,
}

impl PermissionRow {
    fn parse(self) -> Option<PermissionEntry> {
        let (Some(role), Some(module), Some(action)) = (
            Role::from_str(&self.role),
            Module::from_str(&self.module),
            Action::from_str(&self.action),
        ) else {
            warn!(
                "Skipping unrecognised permission row ({}, {}, {})",
                self.role, self.module, self.action
            );
            return None;
        };
        Some(PermissionEntry {
            role,
            module,
            action,
            allowed: self.allowed,
        })
    }
}

impl From<PermissionEntry> for PermissionRow {
    fn from(entry: PermissionEntry) -> Self {
        Self {
            role: entry.role.as_str().to_string(),
            module: entry.module.as_str().to_string(),
            action: entry.action.as_str().to_string(),
            allowed: entry.allowed,
        }
    }
}

const PERMISSION_COLUMNS: &str = "role,module,action,allowed";

/// Permission table stored in the managed Postgres backend.
#[derive(Debug, Clone)]
pub struct RestPermissionStore {
    client: RestClient,
    table: String,
}

impl RestPermissionStore {
    pub fn new(client: RestClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        Ok(Self::new(
            RestClient::from_settings(settings)?,
            settings.table.clone(),
        ))
    }

    async fn fetch(&self, filters: &[(&str, &str)]) -> AuthorizationResult<Vec<PermissionEntry>> {
        let rows: Vec<PermissionRow> = self
            .client
            .select(&self.table, PERMISSION_COLUMNS, filters)
            .await
            .map_err(|e| {
                warn!("Failed to read permission table: {:#}", e);
                unavailable(e)
            })?;
        Ok(rows.into_iter().filter_map(PermissionRow::parse).collect())
    }
}

#[async_trait]
impl PermissionStore for RestPermissionStore {
    async fn get_permissions(&self, role: Role) -> AuthorizationResult<Grants> {
        let entries = self.fetch(&[("role", role.as_str())]).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.allowed && e.role == role)
            .map(|e| (e.module, e.action))
            .collect())
    }

    async fn get_all_permissions(&self) -> AuthorizationResult<HashMap<Role, Grants>> {
        Ok(grants_by_role(self.fetch(&[]).await?))
    }

    async fn set_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
        allowed: bool,
    ) -> AuthorizationResult<()> {
        let row = PermissionRow::from(PermissionEntry {
            role,
            module,
            action,
            allowed,
        });
        self.client
            .upsert(&self.table, "role,module,action", &[row])
            .await
            .map_err(unavailable)
    }

    async fn delete_permission(
        &self,
        role: Role,
        module: Module,
        action: Action,
    ) -> AuthorizationResult<()> {
        self.client
            .delete(
                &self.table,
                &[
                    ("role", role.as_str()),
                    ("module", module.as_str()),
                    ("action", action.as_str()),
                ],
            )
            .await
            .map_err(unavailable)
    }

    async fn list_entries(&self) -> AuthorizationResult<Vec<PermissionEntry>> {
        let mut entries = self.fetch(&[]).await?;
        entries.sort_by_key(|e| (e.role, e.module, e.action));
        Ok(entries)
    }
}
