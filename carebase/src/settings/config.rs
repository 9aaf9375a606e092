use carebase_core::authorization::Role;
use carebase_core::settings::store::{StoreBackend, StoreSettings};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use uuid::Uuid;

/// Role assignments used when the backend does not provide them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IdentitySettings {
    #[serde(default)]
    pub users: HashMap<Uuid, Vec<Role>>,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct Settings {
    pub debug: bool,
    pub log_level: String,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            log_level: "info".to_string(),
            store: StoreSettings::default(),
            identity: IdentitySettings::default(),
        }
    }
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("CAREBASE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Settings assembled in code, bypassing the file and environment layers.
    pub fn from_parts(store: StoreSettings, identity: IdentitySettings) -> Self {
        Settings {
            store,
            identity,
            ..Settings::default()
        }
    }

    pub fn new() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layer `default`, the run mode file and `local` from `config_dir`,
    /// then the environment.
    pub fn load_from(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("CAREBASE_RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("debug", false)?
            .set_default("log_level", "info")?
            .set_default("store.backend", "file")?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/{run_mode}")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/local")).required(false))
            .add_source(Self::get_environment());

        let settings: Settings = builder.build()?.try_deserialize()?;

        if settings.store.backend == StoreBackend::Rest && settings.store.url.is_none() {
            return Err(ConfigError::Message(
                "store.url is required when store.backend is 'rest'".into(),
            ));
        }

        Ok(settings)
    }
}
