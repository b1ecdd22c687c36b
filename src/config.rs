//! Layered configuration
//!
//! Values come from, lowest precedence first:
//! 1. the `Default` impls below
//! 2. an optional TOML file (`poc.toml` unless a path is given)
//! 3. environment variables prefixed `POC__`, with `__` between sections,
//!    e.g. `POC__SERVICE__DELAY_MS=0` or `POC__CLIENT__BASE_URL=http://host:8080`
//!
//! The binaries apply their CLI flags on top of the loaded value.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{PocError, Result};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "poc.toml";

/// Prefix of the environment variables that override file values
pub const ENV_PREFIX: &str = "POC";

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PocConfig {
    pub server: ServerSettings,
    pub service: ServiceSettings,
    pub client: ClientSettings,
    pub controller: ControllerSettings,
    /// Fallback filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for PocConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            service: ServiceSettings::default(),
            client: ClientSettings::default(),
            controller: ControllerSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Where the HTTP server listens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Simulated downstream latency of the person service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Sleep applied to every blocking lookup; zero disables it
    pub delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { delay_ms: 2000 }
    }
}

impl ServiceSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// The upstream person server the client endpoints call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    /// Per-request timeout; unset means no timeout
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: None,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings of the HTTP handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Concurrency cap of the search endpoint's fan-out
    pub parallel_search_max: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            parallel_search_max: 10,
        }
    }
}

impl PocConfig {
    /// Load defaults, then the config file, then `POC__*` environment variables
    ///
    /// A missing file is not an error. An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: PocConfig = settings.try_deserialize()?;
        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Reject values the server or client cannot work with
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.client.base_url).map_err(|e| {
            PocError::Config(format!("client.base_url {:?}: {}", self.client.base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(PocError::Config(format!(
                "client.base_url {:?} cannot be used as a base URL",
                self.client.base_url
            )));
        }
        if self.controller.parallel_search_max == 0 {
            return Err(PocError::Config(
                "controller.parallel_search_max must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
