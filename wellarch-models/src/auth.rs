//! API key handling for hosted providers.
//!
//! Keys are read from configuration or the environment and kept wrapped in
//! [`SecretString`] until the moment they are attached to a request.

use std::env;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::{Error, Result};

/// Environment variable consulted for Azure OpenAI keys.
pub const AZURE_OPENAI_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";

/// A secure API key that prevents accidental logging.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Read a key from an environment variable.
    ///
    /// Empty values count as missing.
    pub fn from_env(provider: &str, var: &str) -> Result<Self> {
        match env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                debug!(provider, var, "loaded API key from environment");
                Ok(Self::new(value.trim()))
            }
            _ => Err(Error::CredentialsNotFound(provider.to_string())),
        }
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
