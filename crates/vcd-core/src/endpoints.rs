//! OpenAPI endpoint registry.
//!
//! Each versioned OpenAPI endpoint has a minimum API version below which the
//! server does not implement it. The registry maps endpoint identifiers (the
//! path template under `/cloudapi/`) to that minimum. It is append-only:
//! entries can be added but never removed or silently changed.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::version::ApiVersion;

/// OpenAPI version prefix used by every endpoint below.
pub const OPENAPI_PATH_V1: &str = "1.0.0/";

/// VDC compute policies.
pub const ENDPOINT_VDC_COMPUTE_POLICIES: &str = "1.0.0/vdcComputePolicies/";
/// VDC capabilities (`{}` is the VDC URN).
pub const ENDPOINT_VDC_CAPABILITIES: &str = "1.0.0/vdcs/{}/capabilities";
/// NSX-T edge gateways.
pub const ENDPOINT_EDGE_GATEWAYS: &str = "1.0.0/edgeGateways/";
/// Roles.
pub const ENDPOINT_ROLES: &str = "1.0.0/roles/";
/// Rights.
pub const ENDPOINT_RIGHTS: &str = "1.0.0/rights/";
/// Audit trail.
pub const ENDPOINT_AUDIT_TRAIL: &str = "1.0.0/auditTrail/";
/// External networks.
pub const ENDPOINT_EXTERNAL_NETWORKS: &str = "1.0.0/externalNetworks/";
/// Sessions.
pub const ENDPOINT_SESSIONS: &str = "1.0.0/sessions";

const BUILTIN_ENDPOINTS: &[(&str, ApiVersion)] = &[
    (ENDPOINT_VDC_COMPUTE_POLICIES, ApiVersion::new(32, 0)),
    (ENDPOINT_VDC_CAPABILITIES, ApiVersion::new(32, 0)),
    (ENDPOINT_EDGE_GATEWAYS, ApiVersion::new(34, 0)),
    (ENDPOINT_ROLES, ApiVersion::new(31, 0)),
    (ENDPOINT_RIGHTS, ApiVersion::new(31, 0)),
    (ENDPOINT_AUDIT_TRAIL, ApiVersion::new(33, 0)),
    (ENDPOINT_EXTERNAL_NETWORKS, ApiVersion::new(33, 0)),
    (ENDPOINT_SESSIONS, ApiVersion::new(33, 0)),
];

/// Mapping from endpoint identifier to its minimum API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistry {
    minimums: HashMap<String, ApiVersion>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            minimums: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in endpoints.
    #[must_use]
    pub fn builtin() -> Self {
        let minimums = BUILTIN_ENDPOINTS
            .iter()
            .map(|(endpoint, version)| ((*endpoint).to_string(), *version))
            .collect();
        Self { minimums }
    }

    /// Add an endpoint.
    ///
    /// Registering an endpoint again with the same version is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the endpoint is already registered with
    /// a different minimum version.
    pub fn register(&mut self, endpoint: impl Into<String>, minimum: ApiVersion) -> Result<()> {
        let endpoint = endpoint.into();
        match self.minimums.get(&endpoint) {
            Some(existing) if *existing != minimum => Err(Error::Conflict(format!(
                "endpoint '{endpoint}' already requires {existing}, refusing {minimum}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.minimums.insert(endpoint, minimum);
                Ok(())
            }
        }
    }

    /// Builder form of [`EndpointRegistry::register`].
    ///
    /// # Errors
    ///
    /// See [`EndpointRegistry::register`].
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, minimum: ApiVersion) -> Result<Self> {
        self.register(endpoint, minimum)?;
        Ok(self)
    }

    /// Minimum version for an endpoint, if registered.
    #[must_use]
    pub fn minimum_version(&self, endpoint: &str) -> Option<ApiVersion> {
        self.minimums.get(endpoint).copied()
    }

    /// Number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.minimums.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.minimums.is_empty()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fill the `{}` placeholders of an endpoint template in order.
#[must_use]
pub fn expand_endpoint(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        if let Some(arg) = args.next() {
            out.push_str(arg);
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}
