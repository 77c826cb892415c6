//! Name-or-ID resolution for vCD entities.
//!
//! Users may refer to an entity by display name or by identifier (URN,
//! bare UUID or HREF). [`Resolver`] picks the matching lookup strategy from
//! the identifier's shape and calls only that strategy.

#![deny(missing_docs)]

pub mod resolver;

pub use resolver::{resolve_by_name_or_id, unique_match, NameOrIdLookup, Resolver, Strategy};

/// Convenient result alias that reuses the shared vCD error type.
pub type Result<T> = vcd_core::Result<T>;
