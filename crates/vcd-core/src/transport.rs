//! Transport seam between the core and the HTTP layer.
//!
//! Everything above this trait (task polling, version probing, lookups)
//! deals only in HREFs and JSON documents. [`crate::client::ServiceClient`]
//! is the production implementation; tests substitute mocks.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::Result;
use crate::version::ApiVersion;

/// Document-level access to a vCD endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the document at `href`.
    ///
    /// `href` may be absolute or relative to the client's base URL. When
    /// `version` is set, the request is pinned to that API version.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport error for non-success responses.
    async fn fetch(&self, href: &str, version: Option<ApiVersion>) -> Result<Value>;

    /// Send a mutating request and return the response document.
    ///
    /// Asynchronous operations answer with a task document; synchronous ones
    /// with the entity or `Value::Null` for empty bodies.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport error for non-success responses.
    async fn send(
        &self,
        method: Method,
        href: &str,
        version: Option<ApiVersion>,
        body: Option<Value>,
    ) -> Result<Value>;
}
