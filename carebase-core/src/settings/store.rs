use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Where role permission entries are persisted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map seeded from the default role templates
    Memory,
    /// YAML document on disk
    #[default]
    File,
    /// PostgREST endpoint of the managed backend
    Rest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_permissions_path")]
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_permissions_table")]
    pub table: String,
    #[serde(default = "default_user_roles_table")]
    pub user_roles_table: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_permissions_path(),
            url: None,
            api_key: None,
            table: default_permissions_table(),
            user_roles_table: default_user_roles_table(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_permissions_path() -> String {
    "config/permissions.yaml".to_string()
}

fn default_permissions_table() -> String {
    "role_permissions".to_string()
}

fn default_user_roles_table() -> String {
    "user_roles".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::new(v.into_boxed_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_store_settings_defaults() {
        let settings: StoreSettings = serde_norway::from_str("{}").unwrap();
        assert_eq!(settings.backend, StoreBackend::File);
        assert_eq!(settings.path, "config/permissions.yaml");
        assert_eq!(settings.table, "role_permissions");
        assert_eq!(settings.timeout_seconds, 10);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_store_settings_rest_backend() {
        let yaml = r#"
backend: rest
url: https://project.example.com/rest/v1
api_key: service-key
"#;
        let settings: StoreSettings = serde_norway::from_str(yaml).unwrap();
        assert_eq!(settings.backend, StoreBackend::Rest);
        assert_eq!(
            settings.url.as_deref(),
            Some("https://project.example.com/rest/v1")
        );
        assert_eq!(
            settings.api_key.as_ref().map(|k| k.expose_secret()),
            Some("service-key")
        );
    }
}
