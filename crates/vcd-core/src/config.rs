//! Configuration structures for vCD clients.
//!
//! This module provides the validated configuration used to open a session:
//! endpoint, credentials, timeouts and the task polling cadence.

use crate::version::ApiVersion;
use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default interval between task polls, in milliseconds.
pub const DEFAULT_TASK_POLL_INTERVAL_MS: u64 = 3_000;

/// Configuration for a vCD client session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VcdClientConfig {
    /// API base URL (e.g. `https://vcd.example.com/api`)
    #[validate(url)]
    pub url: String,

    /// Bearer token obtained from a prior login
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// Organization the session is scoped to
    #[validate(length(min = 1))]
    pub org: String,

    /// Whether the session belongs to a system administrator
    #[serde(default)]
    pub sys_admin: bool,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between task polls in milliseconds
    #[validate(range(min = 10, max = 60_000))]
    #[serde(default = "default_task_poll_interval_ms")]
    pub task_poll_interval_ms: u64,

    /// API version to pin requests to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Highest API version the server reported at login, skipping the version probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_task_poll_interval_ms() -> u64 {
    DEFAULT_TASK_POLL_INTERVAL_MS
}

impl VcdClientConfig {
    /// Create a new client configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `url` - The API base URL (e.g., "https://vcd.example.com/api")
    /// * `org` - The organization name
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(url: impl Into<String>, org: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            url: url.into(),
            token: None,
            org: org.into(),
            sys_admin: false,
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            task_poll_interval_ms: default_task_poll_interval_ms(),
            api_version: None,
            server_version: None,
        };

        config.check()?;
        Ok(config)
    }

    /// Run field validation and the cross-field checks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first failure.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        self.pinned_version()
            .and_then(|_| self.known_server_version())
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        Ok(())
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Mark the session as system administrator.
    #[must_use]
    pub const fn with_sys_admin(mut self, sys_admin: bool) -> Self {
        self.sys_admin = sys_admin;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the task poll interval in milliseconds.
    #[must_use]
    pub const fn with_task_poll_interval_ms(mut self, millis: u64) -> Self {
        self.task_poll_interval_ms = millis;
        self
    }

    /// Pin the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Record the server's highest API version, as reported at login.
    #[must_use]
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the task poll interval as a Duration.
    #[must_use]
    pub const fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.task_poll_interval_ms)
    }

    /// Parse the pinned API version, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] if the configured version is malformed.
    pub fn pinned_version(&self) -> Result<Option<ApiVersion>, Error> {
        self.api_version.as_deref().map(ApiVersion::parse).transpose()
    }

    /// Parse the server version reported at login, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] if the configured version is malformed.
    pub fn known_server_version(&self) -> Result<Option<ApiVersion>, Error> {
        self.server_version.as_deref().map(ApiVersion::parse).transpose()
    }

    /// Parse and validate the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_url(&self) -> Result<Url, Error> {
        Url::parse(&self.url).map_err(|e| Error::ConfigError(format!("Invalid vCD URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_valid() {
        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme").unwrap();
        assert_eq!(config.org, "acme");
        assert!(config.tls_verify);
        assert!(!config.sys_admin);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.task_poll_interval(),
            Duration::from_millis(DEFAULT_TASK_POLL_INTERVAL_MS)
        );
        assert!(config.pinned_version().unwrap().is_none());
        assert!(config.known_server_version().unwrap().is_none());
    }

    #[test]
    fn test_config_new_invalid_url() {
        let result = VcdClientConfig::new("not a url", "acme");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_empty_org() {
        assert!(VcdClientConfig::new("https://vcd.example.com/api", "").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_token("token")
            .with_sys_admin(true)
            .with_tls_verify(false)
            .with_timeout(60)
            .with_task_poll_interval_ms(500)
            .with_api_version("36.0");

        assert!(config.token.is_some());
        assert!(config.sys_admin);
        assert!(!config.tls_verify);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.task_poll_interval(), Duration::from_millis(500));
        assert_eq!(
            config.pinned_version().unwrap(),
            Some(ApiVersion::new(36, 0))
        );
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_rejects_out_of_range_values() {
        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_timeout(0);
        assert!(config.check().is_err());

        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_task_poll_interval_ms(1);
        assert!(config.check().is_err());

        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_api_version("latest");
        assert!(matches!(config.check(), Err(Error::ConfigError(_))));

        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_server_version("v36");
        assert!(matches!(config.check(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let json = r#"{"url": "https://vcd.example.com/api", "org": "acme", "token": "abc"}"#;
        let config: VcdClientConfig = serde_json::from_str(json).unwrap();
        assert!(config.tls_verify);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.task_poll_interval_ms, DEFAULT_TASK_POLL_INTERVAL_MS);
        assert!(config.token.is_some());
    }

    #[test]
    fn test_config_serialize_skips_token() {
        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme")
            .unwrap()
            .with_token("super-secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("api_version"));
    }

    #[test]
    fn test_parse_url() {
        let config = VcdClientConfig::new("https://vcd.example.com/api", "acme").unwrap();
        assert_eq!(config.parse_url().unwrap().host_str(), Some("vcd.example.com"));
    }
}
