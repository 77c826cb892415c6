//! Endpoint capability negotiation.
//!
//! Before calling a versioned OpenAPI endpoint, callers ask the
//! [`CapabilityNegotiator`] which API version to use. The answer is the
//! endpoint's registered minimum, provided the connected server is at least
//! that new. The server's own version is probed once per negotiator from the
//! supported-versions document and reused for the lifetime of the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::endpoints::EndpointRegistry;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::version::ApiVersion;

/// HREF of the supported-versions document, relative to the API root.
pub const VERSIONS_PATH: &str = "versions";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupportedVersions {
    #[serde(default)]
    version_info: Vec<VersionInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
    #[serde(default)]
    deprecated: bool,
}

/// Pick the server version from a supported-versions document.
///
/// The highest non-deprecated version wins; if every advertised version is
/// deprecated, the highest overall is used. Unparseable entries are skipped.
///
/// # Errors
///
/// Returns [`Error::ParseError`] if the document has no usable version.
pub fn parse_supported_versions(doc: &Value) -> Result<ApiVersion> {
    let supported: SupportedVersions = serde_json::from_value(doc.clone())?;
    let parsed: Vec<(ApiVersion, bool)> = supported
        .version_info
        .iter()
        .filter_map(|info| {
            ApiVersion::parse(&info.version)
                .ok()
                .map(|version| (version, info.deprecated))
        })
        .collect();

    parsed
        .iter()
        .filter(|(_, deprecated)| !deprecated)
        .map(|(version, _)| *version)
        .max()
        .or_else(|| parsed.iter().map(|(version, _)| *version).max())
        .ok_or_else(|| Error::ParseError("server advertises no API versions".to_string()))
}

/// Per-session endpoint compatibility checker.
pub struct CapabilityNegotiator {
    transport: Arc<dyn Transport>,
    registry: EndpointRegistry,
    server_version: OnceCell<ApiVersion>,
    probes: AtomicU64,
}

impl CapabilityNegotiator {
    /// Create a negotiator that probes the server version lazily.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, registry: EndpointRegistry) -> Self {
        Self {
            transport,
            registry,
            server_version: OnceCell::new(),
            probes: AtomicU64::new(0),
        }
    }

    /// Create a negotiator with a server version already known (e.g. from login).
    #[must_use]
    pub fn with_server_version(
        transport: Arc<dyn Transport>,
        registry: EndpointRegistry,
        version: ApiVersion,
    ) -> Self {
        Self {
            transport,
            registry,
            server_version: OnceCell::new_with(Some(version)),
            probes: AtomicU64::new(0),
        }
    }

    /// The endpoint registry.
    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Number of server-version probes issued so far.
    #[must_use]
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest API version the connected server supports.
    ///
    /// The first call probes the server; concurrent first callers share that
    /// single probe. A failed probe is not cached.
    ///
    /// # Errors
    ///
    /// Returns the transport or parse error from the probe.
    pub async fn server_version(&self) -> Result<ApiVersion> {
        self.server_version
            .get_or_try_init(|| async {
                self.probes.fetch_add(1, Ordering::SeqCst);
                let doc = self.transport.fetch(VERSIONS_PATH, None).await?;
                let version = parse_supported_versions(&doc)?;
                debug!(%version, "probed server API version");
                Ok(version)
            })
            .await
            .copied()
    }

    /// Version to use when calling `endpoint`.
    ///
    /// Returns the endpoint's registered minimum version, not the server's.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownEndpoint`] if the endpoint is not registered
    /// * [`Error::UnsupportedEndpoint`] if the server is older than required
    /// * any error from the server-version probe
    pub async fn check_endpoint_compatibility(&self, endpoint: &str) -> Result<ApiVersion> {
        let required = self
            .registry
            .minimum_version(endpoint)
            .ok_or_else(|| {
                Error::UnknownEndpoint(format!(
                    "minimum API version for endpoint '{endpoint}' is not defined"
                ))
            })?;

        let server = self.server_version().await?;
        if server < required {
            return Err(Error::UnsupportedEndpoint {
                endpoint: endpoint.to_string(),
                required_version: required.to_string(),
                server_version: server.to_string(),
            });
        }
        Ok(required)
    }
}

impl std::fmt::Debug for CapabilityNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityNegotiator")
            .field("registry", &self.registry)
            .field("server_version", &self.server_version.get())
            .field("probes", &self.probe_count())
            .finish_non_exhaustive()
    }
}
