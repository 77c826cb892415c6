//! Explicit session context passed into every operation.
//!
//! A [`Session`] bundles the transport, the capability negotiator and the
//! per-caller policies (retry allow-list, identifier predicate, poll
//! interval). It is cheap to clone and safe to share across tasks; the only
//! interior state is the negotiator's once-initialized server version.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::capability::CapabilityNegotiator;
use crate::client::ServiceClientBuilder;
use crate::config::{VcdClientConfig, DEFAULT_TASK_POLL_INTERVAL_MS};
use crate::endpoints::EndpointRegistry;
use crate::error::{Error, Result};
use crate::ids::{looks_like_id, IdPredicate};
use crate::retry::RetryAllowList;
use crate::transport::Transport;
use crate::version::ApiVersion;

/// Prefix for OpenAPI endpoints relative to the legacy API root.
pub const OPENAPI_PREFIX: &str = "../cloudapi/";

struct SessionInner {
    transport: Arc<dyn Transport>,
    negotiator: CapabilityNegotiator,
    retry: RetryAllowList,
    id_predicate: IdPredicate,
    sys_admin: bool,
    task_poll_interval: Duration,
}

/// A connected vCD session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Start building a session over `transport`.
    #[must_use]
    pub fn builder(transport: Arc<dyn Transport>) -> SessionBuilder {
        SessionBuilder::new(transport)
    }

    /// Open a session from configuration using the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn connect(config: &VcdClientConfig) -> Result<Self> {
        config.check()?;
        let client = ServiceClientBuilder::from_config(config)?.build()?;
        let mut builder = SessionBuilder::new(Arc::new(client))
            .with_sys_admin(config.sys_admin)
            .with_task_poll_interval(config.task_poll_interval());
        if let Some(version) = config.known_server_version()? {
            builder = builder.with_server_version(version);
        }
        Ok(builder.build())
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// The capability negotiator for this session.
    #[must_use]
    pub fn negotiator(&self) -> &CapabilityNegotiator {
        &self.inner.negotiator
    }

    /// The retry allow-list for this session.
    #[must_use]
    pub fn retry_policies(&self) -> &RetryAllowList {
        &self.inner.retry
    }

    /// Predicate deciding whether an identifier is an ID rather than a name.
    #[must_use]
    pub fn id_predicate(&self) -> IdPredicate {
        self.inner.id_predicate
    }

    /// Whether the session user is a system administrator.
    #[must_use]
    pub fn is_sys_admin(&self) -> bool {
        self.inner.sys_admin
    }

    /// Interval between task polls.
    #[must_use]
    pub fn task_poll_interval(&self) -> Duration {
        self.inner.task_poll_interval
    }

    /// Highest API version supported by the server.
    ///
    /// # Errors
    ///
    /// See [`CapabilityNegotiator::server_version`].
    pub async fn server_version(&self) -> Result<ApiVersion> {
        self.inner.negotiator.server_version().await
    }

    /// Version to use for a registered OpenAPI endpoint.
    ///
    /// # Errors
    ///
    /// See [`CapabilityNegotiator::check_endpoint_compatibility`].
    pub async fn check_endpoint_compatibility(&self, endpoint: &str) -> Result<ApiVersion> {
        self.inner
            .negotiator
            .check_endpoint_compatibility(endpoint)
            .await
    }

    /// HREF of an OpenAPI path relative to the legacy API root.
    #[must_use]
    pub fn openapi_href(&self, path: &str) -> String {
        format!("{OPENAPI_PREFIX}{path}")
    }

    /// Run `operation` under the retry policy for `kind`, if allow-listed.
    ///
    /// # Errors
    ///
    /// See [`RetryAllowList::run`].
    pub async fn retry<T, F, Fut>(&self, kind: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.inner.retry.run(kind, operation).await
    }

    /// Fetch a document and deserialize it.
    ///
    /// # Errors
    ///
    /// Returns the transport error or [`Error::ParseError`].
    pub async fn fetch_as<T>(&self, href: &str, version: Option<ApiVersion>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let doc = self.inner.transport.fetch(href, version).await?;
        decode(href, doc)
    }

    /// Send a request with an optional typed body and deserialize the answer.
    ///
    /// # Errors
    ///
    /// Returns the transport error or [`Error::ParseError`].
    pub async fn send_as<B, T>(
        &self,
        method: Method,
        href: &str,
        version: Option<ApiVersion>,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let doc = self.inner.transport.send(method, href, version, body).await?;
        decode(href, doc)
    }
}

fn decode<T: DeserializeOwned>(href: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc)
        .map_err(|err| Error::ParseError(format!("Failed to parse document at `{href}`: {err}")))
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("negotiator", &self.inner.negotiator)
            .field("sys_admin", &self.inner.sys_admin)
            .field("task_poll_interval", &self.inner.task_poll_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    registry: EndpointRegistry,
    server_version: Option<ApiVersion>,
    retry: RetryAllowList,
    id_predicate: IdPredicate,
    sys_admin: bool,
    task_poll_interval: Duration,
}

impl SessionBuilder {
    /// Create a builder with the built-in registry and default policies.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: EndpointRegistry::builtin(),
            server_version: None,
            retry: RetryAllowList::default(),
            id_predicate: looks_like_id,
            sys_admin: false,
            task_poll_interval: Duration::from_millis(DEFAULT_TASK_POLL_INTERVAL_MS),
        }
    }

    /// Replace the endpoint registry.
    #[must_use]
    pub fn with_registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Seed the server version so no probe is needed.
    #[must_use]
    pub const fn with_server_version(mut self, version: ApiVersion) -> Self {
        self.server_version = Some(version);
        self
    }

    /// Replace the retry allow-list.
    #[must_use]
    pub fn with_retry_policies(mut self, retry: RetryAllowList) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the identifier predicate.
    #[must_use]
    pub fn with_id_predicate(mut self, predicate: IdPredicate) -> Self {
        self.id_predicate = predicate;
        self
    }

    /// Mark the session as system administrator.
    #[must_use]
    pub const fn with_sys_admin(mut self, sys_admin: bool) -> Self {
        self.sys_admin = sys_admin;
        self
    }

    /// Set the task poll interval.
    #[must_use]
    pub const fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    /// Build the session.
    #[must_use]
    pub fn build(self) -> Session {
        let negotiator = match self.server_version {
            Some(version) => CapabilityNegotiator::with_server_version(
                self.transport.clone(),
                self.registry,
                version,
            ),
            None => CapabilityNegotiator::new(self.transport.clone(), self.registry),
        };
        Session {
            inner: Arc::new(SessionInner {
                transport: self.transport,
                negotiator,
                retry: self.retry,
                id_predicate: self.id_predicate,
                sys_admin: self.sys_admin,
                task_poll_interval: self.task_poll_interval,
            }),
        }
    }
}
