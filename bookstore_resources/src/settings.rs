use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::resource_store::PostgresResourceStoreConfig;

/// Reads a settings struct from the process environment, falling back to `defaults`.
/// Variable names map to lower case field names, e.g. `DB_HOST` -> `db_host`
pub fn load_from_env<S: DeserializeOwned>(defaults: &[(&str, config::Value)]) -> anyhow::Result<S> {
    let mut builder = config::Config::builder();
    for (key, value) in defaults {
        builder = builder
            .set_default(*key, value.clone())
            .with_context(|| format!("Invalid default for {}", key))?;
    }
    builder
        .add_source(config::Environment::default().try_parsing(true))
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[derive(Debug, Clone, Deserialize)]
/// Settings shared by every service that owns a store
pub struct StoreSettings {
    pub port: u16,
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
}

impl StoreSettings {
    pub fn load(default_port: u16) -> anyhow::Result<Self> {
        load_from_env(&[
            ("port", default_port.into()),
            ("use_in_memory_db", false.into()),
            ("db_host", "127.0.0.1".into()),
            ("db_username", "postgres".into()),
            ("db_password", "postgres".into()),
        ])
    }

    pub fn postgres(&self) -> PostgresResourceStoreConfig {
        PostgresResourceStoreConfig {
            hostname: self.db_host.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}
