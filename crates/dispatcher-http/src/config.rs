//! # Environment-Based Configuration
//!
//! ## Environment Variables
//!
//! ### Registry
//! - `LIVEKIT_URL` - Registry endpoint, `http(s)://` or `ws(s)://`
//! - `LIVEKIT_API_KEY` - API key
//! - `LIVEKIT_API_SECRET` - API secret
//!
//! All three are needed to reach the registry. When any is missing the server
//! still starts and every trigger answers `500 configuration_error`.
//!
//! ### Dispatch defaults
//! - `AGENT_NAME` - Default agent name (default: "livekit-agent").
//!   `NEXT_PUBLIC_AGENT_NAME` is read when `AGENT_NAME` is unset.
//! - `DISPATCHER_AGENT_METADATA` - Default dispatch metadata (default: empty)
//!
//! ### HTTP Runtime Configuration
//! - `DISPATCHER_BIND_ADDR` - Listen address (default: 0.0.0.0:3000)
//! - `DISPATCHER_REQUEST_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `DISPATCHER_REGISTRY_TIMEOUT_SECS` - Registry call timeout in seconds (default: 30)
//! - `DISPATCHER_ENABLE_CORS` - Enable permissive CORS (default: true)
//! - `DISPATCHER_ENABLE_OPENAPI` - Serve `/api-docs/openapi.json` (default: true)

use dispatcher_core::{AgentName, DispatchMetadata, SecretString};
use dispatcher_livekit::{LiveKitConfig, http_base_url};
use std::{env, net::SocketAddr, time::Duration};

pub const ENV_LIVEKIT_URL: &str = "LIVEKIT_URL";
pub const ENV_LIVEKIT_API_KEY: &str = "LIVEKIT_API_KEY";
pub const ENV_LIVEKIT_API_SECRET: &str = "LIVEKIT_API_SECRET";
pub const ENV_AGENT_NAME: &str = "AGENT_NAME";
pub const ENV_AGENT_NAME_LEGACY: &str = "NEXT_PUBLIC_AGENT_NAME";
pub const ENV_AGENT_METADATA: &str = "DISPATCHER_AGENT_METADATA";
pub const ENV_BIND_ADDR: &str = "DISPATCHER_BIND_ADDR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DISPATCHER_REQUEST_TIMEOUT_SECS";
pub const ENV_REGISTRY_TIMEOUT_SECS: &str = "DISPATCHER_REGISTRY_TIMEOUT_SECS";
pub const ENV_ENABLE_CORS: &str = "DISPATCHER_ENABLE_CORS";
pub const ENV_ENABLE_OPENAPI: &str = "DISPATCHER_ENABLE_OPENAPI";

/// Every variable read by [`DispatcherConfigBuilder::from_env`]
pub const ALL_ENV_VARS: &[&str] = &[
    ENV_LIVEKIT_URL,
    ENV_LIVEKIT_API_KEY,
    ENV_LIVEKIT_API_SECRET,
    ENV_AGENT_NAME,
    ENV_AGENT_NAME_LEGACY,
    ENV_AGENT_METADATA,
    ENV_BIND_ADDR,
    ENV_REQUEST_TIMEOUT_SECS,
    ENV_REGISTRY_TIMEOUT_SECS,
    ENV_ENABLE_CORS,
    ENV_ENABLE_OPENAPI,
];

const MAX_TIMEOUT_SECS: u64 = 300;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Validated server configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub bind_addr: SocketAddr,
    pub request_timeout_secs: u64,
    pub registry_timeout_secs: u64,
    pub enable_cors: bool,
    pub enable_openapi: bool,
    pub default_agent_name: AgentName,
    pub default_metadata: DispatchMetadata,
    /// `None` when any registry setting is missing
    pub livekit: Option<LiveKitConfig>,
    /// Names of the registry variables that were not provided
    pub missing_registry_settings: Vec<&'static str>,
}

impl DispatcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn registry_configured(&self) -> bool {
        self.livekit.is_some()
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfigBuilder::default().assemble()
    }
}

/// Builder for [`DispatcherConfig`] with environment variable support
#[derive(Debug, Clone)]
pub struct DispatcherConfigBuilder {
    bind_addr: SocketAddr,
    request_timeout_secs: u64,
    registry_timeout_secs: u64,
    enable_cors: bool,
    enable_openapi: bool,
    default_agent_name: AgentName,
    default_metadata: DispatchMetadata,
    livekit_url: Option<String>,
    api_key: Option<String>,
    api_secret: Option<SecretString>,
}

impl Default for DispatcherConfigBuilder {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            request_timeout_secs: 30,
            registry_timeout_secs: 30,
            enable_cors: true,
            enable_openapi: true,
            default_agent_name: AgentName::default(),
            default_metadata: DispatchMetadata::default(),
            livekit_url: None,
            api_key: None,
            api_secret: None,
        }
    }
}

impl DispatcherConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    /// Missing registry credentials are not an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        // Registry
        if let Some(url) = get_env_string(ENV_LIVEKIT_URL) {
            http_base_url(&url).map_err(|e| ConfigError::InvalidEnvVar {
                key: ENV_LIVEKIT_URL.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.livekit_url(url);
        }
        if let Some(key) = get_env_string(ENV_LIVEKIT_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(secret) = get_env_string(ENV_LIVEKIT_API_SECRET) {
            builder = builder.api_secret(SecretString::from(secret));
        }

        // Dispatch defaults
        let agent_var = if get_env_string(ENV_AGENT_NAME).is_some() {
            ENV_AGENT_NAME
        } else {
            ENV_AGENT_NAME_LEGACY
        };
        if let Some(name) = get_env_string(agent_var) {
            let name = AgentName::parse(&name).map_err(|e| ConfigError::InvalidEnvVar {
                key: agent_var.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.default_agent_name(name);
        }
        if let Ok(metadata) = env::var(ENV_AGENT_METADATA) {
            builder = builder.default_metadata(DispatchMetadata::new(metadata));
        }

        // HTTP Runtime Configuration
        if let Some(addr) = get_env_socket_addr(ENV_BIND_ADDR)? {
            builder = builder.bind_addr(addr);
        }
        if let Some(timeout) = get_env_u64(ENV_REQUEST_TIMEOUT_SECS)? {
            builder = builder.request_timeout_secs(timeout);
        }
        if let Some(timeout) = get_env_u64(ENV_REGISTRY_TIMEOUT_SECS)? {
            builder = builder.registry_timeout_secs(timeout);
        }
        if let Some(cors) = get_env_bool(ENV_ENABLE_CORS)? {
            builder = builder.enable_cors(cors);
        }
        if let Some(openapi) = get_env_bool(ENV_ENABLE_OPENAPI)? {
            builder = builder.enable_openapi(openapi);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set request timeout in seconds
    #[must_use]
    pub fn request_timeout_secs(mut self, timeout: u64) -> Self {
        self.request_timeout_secs = timeout;
        self
    }

    /// Set registry call timeout in seconds
    #[must_use]
    pub fn registry_timeout_secs(mut self, timeout: u64) -> Self {
        self.registry_timeout_secs = timeout;
        self
    }

    #[must_use]
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    #[must_use]
    pub fn enable_openapi(mut self, enable: bool) -> Self {
        self.enable_openapi = enable;
        self
    }

    #[must_use]
    pub fn default_agent_name(mut self, name: AgentName) -> Self {
        self.default_agent_name = name;
        self
    }

    #[must_use]
    pub fn default_metadata(mut self, metadata: DispatchMetadata) -> Self {
        self.default_metadata = metadata;
        self
    }

    #[must_use]
    pub fn livekit_url(mut self, url: impl Into<String>) -> Self {
        self.livekit_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn api_secret(mut self, secret: SecretString) -> Self {
        self.api_secret = Some(secret);
        self
    }

    /// Validate configuration and build [`DispatcherConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<DispatcherConfig, ConfigError> {
        self.validate()?;
        Ok(self.assemble())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("registry_timeout_secs", self.registry_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
            if value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be <= {MAX_TIMEOUT_SECS} (5 minutes)"
                )));
            }
        }

        if let Some(url) = &self.livekit_url {
            http_base_url(url).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }

    fn assemble(self) -> DispatcherConfig {
        let mut missing = Vec::new();
        if self.livekit_url.is_none() {
            missing.push(ENV_LIVEKIT_URL);
        }
        if self.api_key.is_none() {
            missing.push(ENV_LIVEKIT_API_KEY);
        }
        if self.api_secret.is_none() {
            missing.push(ENV_LIVEKIT_API_SECRET);
        }

        let livekit = match (self.livekit_url, self.api_key, self.api_secret) {
            (Some(url), Some(key), Some(secret)) => Some(
                LiveKitConfig::new(url, key, secret)
                    .with_timeout(Duration::from_secs(self.registry_timeout_secs)),
            ),
            _ => None,
        };

        DispatcherConfig {
            bind_addr: self.bind_addr,
            request_timeout_secs: self.request_timeout_secs,
            registry_timeout_secs: self.registry_timeout_secs,
            enable_cors: self.enable_cors,
            enable_openapi: self.enable_openapi,
            default_agent_name: self.default_agent_name,
            default_metadata: self.default_metadata,
            livekit,
            missing_registry_settings: missing,
        }
    }
}

// Environment variable helper functions

/// Non-blank value of `key`; blank counts as unset
fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match get_env_string(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        None => Ok(None),
    }
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

fn get_env_socket_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse::<SocketAddr>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid socket address '{val}': {e}"),
            }),
        None => Ok(None),
    }
}
