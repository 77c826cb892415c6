//! HTTP client implementing the [`Transport`] seam.
//!
//! [`ServiceClient`] is a thin `reqwest` wrapper: it resolves HREFs against
//! the base URL, negotiates the response media type and maps failures to
//! [`Error`]. It never retries; retry is opted into per operation kind via
//! [`crate::retry::TransientRetry`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::config::VcdClientConfig;
use crate::error::{map_status_to_error, Error, Result};
use crate::transport::Transport;
use crate::version::ApiVersion;

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Media type requested when no version is pinned.
pub const JSON_MEDIA_TYPE: &str = "application/*+json";

const DEFAULT_USER_AGENT: &str = concat!("vcd-core/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
///
/// Configures HTTP client behavior including timeouts and connection pooling.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Whether to verify TLS certificates
    pub tls_verify: bool,

    /// Enable response compression
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            tls_verify: true,
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    base_url: Url,
    http: ClientConfig,
    token: Option<SecretString>,
    user_agent: String,
    pinned_version: Option<ApiVersion>,
}

impl ServiceClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            http: ClientConfig::new(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pinned_version: None,
        })
    }

    /// Create a builder from a validated [`VcdClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL cannot be parsed.
    pub fn from_config(config: &VcdClientConfig) -> Result<Self> {
        let mut builder = Self::new(&config.url)?.with_http_config(
            ClientConfig::new()
                .with_timeout(config.timeout())
                .with_tls_verify(config.tls_verify),
        );
        builder.token = config.token.clone();
        builder.pinned_version = config.pinned_version()?;
        Ok(builder)
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http = config;
        self
    }

    /// Configure a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Pin every request without an explicit version to this API version.
    #[must_use]
    pub const fn with_pinned_version(mut self, version: ApiVersion) -> Self {
        self.pinned_version = Some(version);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<ServiceClient> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| Error::ConfigError(format!("Invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::ConfigError(format!("Invalid token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(self.http.timeout)
            .pool_idle_timeout(self.http.pool_idle_timeout)
            .pool_max_idle_per_host(self.http.pool_max_idle_per_host)
            .danger_accept_invalid_certs(!self.http.tls_verify)
            .gzip(self.http.enable_compression)
            .default_headers(headers)
            .build()?;

        Ok(ServiceClient {
            http,
            base_url: self.base_url,
            pinned_version: self.pinned_version,
        })
    }
}

/// `reqwest`-backed [`Transport`].
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
    pinned_version: Option<ApiVersion>,
}

impl ServiceClient {
    /// Construct a client directly from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        ServiceClientBuilder::new(base_url)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an HREF.
    ///
    /// Absolute HREFs are used as-is, rooted ones (`/api/...`) are joined to
    /// the origin and anything else is relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the result is not a valid URL.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        match Url::parse(href) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(self.base_url.join(href)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn accept_header(&self, version: Option<ApiVersion>) -> String {
        match version.or(self.pinned_version) {
            Some(version) => format!("{JSON_MEDIA_TYPE};version={version}"),
            None => JSON_MEDIA_TYPE.to_string(),
        }
    }

    async fn execute(
        &self,
        method: Method,
        href: &str,
        version: Option<ApiVersion>,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.resolve(href)?;
        debug!(%method, %url, "vcd request");

        let mut request = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, self.accept_header(version));
        if let Some(payload) = body {
            request = request
                .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
                .json(&payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!(%url, %status, bytes = text.len(), "vcd response");

        if !status.is_success() {
            return Err(map_status_to_error(status, text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| {
            Error::ParseError(format!("Failed to parse response for `{url}`: {err}"))
        })
    }
}

#[async_trait]
impl Transport for ServiceClient {
    async fn fetch(&self, href: &str, version: Option<ApiVersion>) -> Result<Value> {
        self.execute(Method::GET, href, version, None).await
    }

    async fn send(
        &self,
        method: Method,
        href: &str,
        version: Option<ApiVersion>,
        body: Option<Value>,
    ) -> Result<Value> {
        self.execute(method, href, version, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_pool_idle_timeout(Duration::from_secs(120))
            .with_pool_max_idle(20)
            .with_tls_verify(false)
            .with_compression(false);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(!config.tls_verify);
        assert!(!config.enable_compression);
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let client = ServiceClient::new("https://vcd.example.com/api").unwrap();
        assert_eq!(
            client.resolve("org/1").unwrap().as_str(),
            "https://vcd.example.com/api/org/1"
        );
        assert_eq!(
            client.resolve("/api/org/1").unwrap().as_str(),
            "https://vcd.example.com/api/org/1"
        );
        assert_eq!(
            client.resolve("../cloudapi/1.0.0/edgeGateways").unwrap().as_str(),
            "https://vcd.example.com/cloudapi/1.0.0/edgeGateways"
        );
        assert_eq!(
            client.resolve("https://other.example.com/task/2").unwrap().as_str(),
            "https://other.example.com/task/2"
        );
    }

    #[tokio::test]
    async fn fetch_sends_versioned_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/1"))
            .and(header("Accept", "application/*+json;version=36.0"))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClientBuilder::new(format!("{}/api", server.uri()))
            .unwrap()
            .with_token("secret-token")
            .build()
            .unwrap();
        let doc = client
            .fetch("task/1", Some(ApiVersion::new(36, 0)))
            .await
            .unwrap();
        assert_eq!(doc["status"], "running");
    }

    #[tokio::test]
    async fn fetch_uses_pinned_version_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/org"))
            .and(header("Accept", "application/*+json;version=35.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "acme"})))
            .mount(&server)
            .await;

        let client = ServiceClientBuilder::new(format!("{}/api", server.uri()))
            .unwrap()
            .with_pinned_version(ApiVersion::new(35, 0))
            .build()
            .unwrap();
        let doc = client.fetch("org", None).await.unwrap();
        assert_eq!(doc["name"], "acme");
    }

    #[tokio::test]
    async fn rooted_href_is_joined_to_the_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/org/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "acme"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(format!("{}/api", server.uri())).unwrap();
        let doc = client.fetch("/api/org/1", None).await.unwrap();
        assert_eq!(doc["name"], "acme");
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/catalog/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/edgeGateway/flaky"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ServiceClient::new(format!("{}/api", server.uri())).unwrap();
        let err = client.fetch("catalog/missing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err = client.fetch("edgeGateway/flaky", None).await.unwrap_err();
        assert!(matches!(err, Error::ServerError(_)));
    }

    #[tokio::test]
    async fn send_posts_body_and_accepts_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/vdc/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/vdc/1/action/instantiateVmFromTemplate"))
            .and(body_json(json!({"name": "vm-1"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "href": "https://vcd.example.com/api/task/9",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let client = ServiceClient::new(format!("{}/api", server.uri())).unwrap();
        let doc = client
            .send(Method::DELETE, "vdc/1", None, None)
            .await
            .unwrap();
        assert!(doc.is_null());

        let task = client
            .send(
                Method::POST,
                "vdc/1/action/instantiateVmFromTemplate",
                None,
                Some(json!({"name": "vm-1"})),
            )
            .await
            .unwrap();
        assert_eq!(task["status"], "queued");
    }
}
