//! Upstream credentials

use std::env;
use std::fmt;

use crate::error::{Error, Result};

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "RELAY_API_KEY";
/// Environment variable holding the API key secret
pub const ENV_API_KEY_SECRET: &str = "RELAY_API_KEY_SECRET";
/// Environment variable holding the bearer token
pub const ENV_BEARER_TOKEN: &str = "RELAY_BEARER_TOKEN";

/// App credentials for the upstream stream
///
/// `Debug` output never includes the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_key_secret: String,
    bearer_token: String,
}

impl Credentials {
    /// Create credentials from their parts
    pub fn new(
        api_key: impl Into<String>,
        api_key_secret: impl Into<String>,
        bearer_token: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_key_secret: api_key_secret.into(),
            bearer_token: bearer_token.into(),
        }
    }

    /// Load credentials from the environment
    ///
    /// The bearer token is required; key and secret default to empty since
    /// the sample stream only uses app-only bearer auth.
    pub fn from_env() -> Result<Self> {
        let bearer_token = env::var(ENV_BEARER_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_BEARER_TOKEN)))?;

        Ok(Self {
            api_key: env::var(ENV_API_KEY).unwrap_or_default(),
            api_key_secret: env::var(ENV_API_KEY_SECRET).unwrap_or_default(),
            bearer_token,
        })
    }

    /// API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API key secret
    pub fn api_key_secret(&self) -> &str {
        &self.api_key_secret
    }

    /// Bearer token used for app-only auth
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_key_secret", &"<redacted>")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}
