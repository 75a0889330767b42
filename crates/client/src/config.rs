//! Client configuration

use config::{Config, ConfigError, Environment, File};
use cuic_core::{ValidateConfig, validators};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Port the CUIC web application listens on
pub const CUIC_PORT: u16 = 8444;

/// Connection settings for one CUIC node
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// CUIC host name
    #[serde(default)]
    pub host: String,
    /// Account used for the basic-auth probe
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Login domain prefixed to the username
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Seconds before the session is considered stale
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    /// Delay between writes of a bulk job, in milliseconds
    #[serde(default = "default_throttle")]
    pub throttle_ms: u64,
    /// Overrides `https://{host}:8444`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Accept self-signed certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_domain() -> String {
    "CUIC".to_string()
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_throttle() -> u64 {
    100
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            domain: default_domain(),
            session_timeout_secs: default_session_timeout(),
            throttle_ms: default_throttle(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .field("throttle_ms", &self.throttle_ms)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Load configuration from an optional file, then `CUIC__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        // Values stay strings until deserialized, so `007` remains `007`
        Environment::with_prefix("CUIC").separator("__")
    }

    fn load_with(path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Environment variables override file settings
        builder = builder.add_source(environment);

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn base_url(&self) -> String {
        self.base_url.as_ref().map_or_else(
            || format!("https://{}:{CUIC_PORT}", self.host),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    /// Basic-auth user name in `DOMAIN\user` form
    pub fn login_name(&self) -> String {
        format!("{}\\{}", self.domain, self.username)
    }

    pub const fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub const fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ValidateConfig for ClientConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validators::validate_host(&self.host, "host")?;
        validators::validate_not_empty(&self.username, "username")?;
        validators::validate_not_empty(&self.password, "password")?;
        validators::validate_not_empty(&self.domain, "domain")?;
        validators::validate_range(self.session_timeout_secs, 1, u64::MAX, "session_timeout_secs")?;
        validators::validate_range(self.request_timeout_secs, 1, 3600, "request_timeout_secs")?;
        if let Some(url) = &self.base_url {
            validators::validate_url(url, "base_url")?;
        }
        Ok(())
    }
}
