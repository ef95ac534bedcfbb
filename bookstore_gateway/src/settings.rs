use std::time::Duration;

use anyhow::bail;
use serde::Deserialize;

use bookstore_resources::client::ClientSettings;
use bookstore_resources::settings::load_from_env;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub port: u16,
    pub authors_url: String,
    pub books_url: String,
    pub categories_url: String,
    pub users_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Bound on each author or category lookup made while composing book views
    pub lookup_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
}

impl GatewaySettings {
    pub fn load() -> anyhow::Result<Self> {
        let settings: Self = load_from_env(&[
            ("port", 3000.into()),
            ("authors_url", "http://localhost:3002".into()),
            ("books_url", "http://localhost:3001".into()),
            ("categories_url", "http://localhost:3003".into()),
            ("users_url", "http://localhost:3004".into()),
            ("jwt_secret", "".into()),
            ("jwt_issuer", "bookstore".into()),
            ("lookup_timeout_ms", 2000.into()),
            ("request_timeout_ms", 10000.into()),
            ("max_retries", 2.into()),
        ])?;
        if settings.jwt_secret.is_empty() {
            bail!("JWT_SECRET must be set");
        }
        Ok(settings)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: Duration::from_millis(self.request_timeout_ms),
            max_retries: self.max_retries,
            bearer_token: None,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}
