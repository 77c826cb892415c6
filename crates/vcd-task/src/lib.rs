//! Task tracking for VMware Cloud Director.
//!
//! Mutating vCD operations that do not complete synchronously answer with a
//! task document. [`TaskClient`] polls such a task until it reaches a
//! terminal status, with caller-controlled cancellation.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::TaskClient;
pub use models::{Reference, Task, TaskError, TaskStatus, TasksList};
pub use tokio_util::sync::CancellationToken;

/// Convenient result alias that reuses the shared vCD error type.
pub type Result<T> = vcd_core::Result<T>;
