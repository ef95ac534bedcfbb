use anyhow::bail;
use serde::Deserialize;

use bookstore_resources::settings::load_from_env;

#[derive(Debug, Clone, Deserialize)]
/// Shared secret and issuer used to sign and verify session tokens
pub struct TokenSettings {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_hours: i64,
}

impl TokenSettings {
    pub fn load() -> anyhow::Result<Self> {
        let settings: Self = load_from_env(&[
            ("jwt_secret", "".into()),
            ("jwt_issuer", "bookstore".into()),
            ("token_ttl_hours", 24.into()),
        ])?;
        if settings.jwt_secret.is_empty() {
            bail!("JWT_SECRET must be set");
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Policy of the public signup endpoint
pub struct SignupSettings {
    /// Lets signups ask for any role and permission set
    pub allow_privileged_signup: bool,
}

impl SignupSettings {
    pub fn load() -> anyhow::Result<Self> {
        load_from_env(&[("allow_privileged_signup", true.into())])
    }
}
