//! SIS client configuration.
//!
//! All ambient lookups of the source system (base URL, API key,
//! timeouts) are replaced by this explicit struct, passed in at
//! construction.

use serde::{Deserialize, Serialize};

use crate::error::{SisError, SisResult};

/// Configuration for [`crate::HttpSisClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SisConfig {
    /// Base URL of the SIS API.
    pub base_url: String,
    /// API key appended as a query parameter on every call.
    pub api_key: String,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_read_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl SisConfig {
    /// Create a configuration with default timeouts.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Override the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Override the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SisResult<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            SisError::invalid_configuration(format!("invalid base URL '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(SisError::invalid_configuration(format!(
                    "unsupported scheme: {other}"
                )))
            }
        }
        if self.api_key.trim().is_empty() {
            return Err(SisError::invalid_configuration("API key is empty"));
        }
        if self.read_timeout_secs == 0 {
            return Err(SisError::invalid_configuration("read timeout must be > 0"));
        }
        Ok(())
    }

    /// A copy safe to log: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: "***".to_string(),
            ..self.clone()
        }
    }
}
