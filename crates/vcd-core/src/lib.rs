//! # vcd-core
//!
//! Core types and utilities for working with VMware Cloud Director.
//!
//! This crate provides the session context, transport seam, error handling
//! and the resilience primitives shared by the vCD client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`ids`] - Identifier shapes, `equal_ids` and typed entity IDs
//! - [`version`] - API version parsing and comparison
//! - [`endpoints`] - OpenAPI endpoint registry with minimum versions
//! - [`capability`] - Endpoint capability negotiation
//! - [`retry`] - Bounded retry for allow-listed flaky reads
//! - [`transport`] - Document-level transport trait
//! - [`client`] - `reqwest` implementation of the transport
//! - [`config`] - Configuration structures for vCD sessions
//! - [`session`] - Explicit session context

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod ids;
pub mod retry;
pub mod session;
pub mod transport;
pub mod version;

// Re-export commonly used types
pub use error::{Error, Result};
pub use session::{Session, SessionBuilder};
pub use transport::Transport;
pub use version::ApiVersion;
