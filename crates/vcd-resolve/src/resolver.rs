//! Dispatch between by-name and by-ID lookups.
//!
//! The resolver decides which of two caller-supplied strategies applies to an
//! identifier and invokes exactly that one. Strategies own the matching:
//! they report [`Error::NotFound`] for zero matches and
//! [`Error::Ambiguous`] for duplicates (see [`unique_match`]). The resolver
//! never second-guesses their result and never falls back to the other
//! strategy.

use std::future::Future;

use async_trait::async_trait;
use tracing::debug;
use vcd_core::ids::{looks_like_id, IdPredicate};
use vcd_core::{Error, Result};

/// Which lookup the resolver will use for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Look up by display name.
    ByName,
    /// Look up by URN, UUID or HREF.
    ById,
}

/// Name-or-ID lookup for one entity kind.
#[async_trait]
pub trait NameOrIdLookup: Send + Sync {
    /// Entity returned by the lookups.
    type Entity: Send;

    /// Entity kind, used in error messages (e.g. "catalog").
    const KIND: &'static str;

    /// Find the single entity with this display name.
    async fn get_by_name(&self, name: &str, refresh: bool) -> Result<Self::Entity>;

    /// Find the entity with this identifier.
    async fn get_by_id(&self, id: &str, refresh: bool) -> Result<Self::Entity>;
}

/// Identifier resolver parameterized by the ID-shape predicate.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    is_id: IdPredicate,
}

impl Resolver {
    /// Resolver using the default URN/UUID/HREF predicate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_id: looks_like_id,
        }
    }

    /// Resolver using a custom predicate.
    #[must_use]
    pub const fn with_predicate(is_id: IdPredicate) -> Self {
        Self { is_id }
    }

    /// Strategy that applies to `identifier`.
    #[must_use]
    pub fn strategy_for(&self, identifier: &str) -> Strategy {
        if (self.is_id)(identifier) {
            Strategy::ById
        } else {
            Strategy::ByName
        }
    }

    /// Resolve `identifier` with one of two strategies.
    ///
    /// Strategies receive the identifier and the `refresh` flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty identifier; otherwise
    /// the chosen strategy's error, unchanged.
    pub async fn resolve<T, N, NF, I, IF>(
        &self,
        identifier: &str,
        refresh: bool,
        by_name: N,
        by_id: I,
    ) -> Result<T>
    where
        N: FnOnce(String, bool) -> NF,
        NF: Future<Output = Result<T>>,
        I: FnOnce(String, bool) -> IF,
        IF: Future<Output = Result<T>>,
    {
        if identifier.trim().is_empty() {
            return Err(Error::InvalidRequest("empty identifier".to_string()));
        }

        let strategy = self.strategy_for(identifier);
        debug!(identifier, ?strategy, refresh, "resolving entity");
        match strategy {
            Strategy::ById => by_id(identifier.to_string(), refresh).await,
            Strategy::ByName => by_name(identifier.to_string(), refresh).await,
        }
    }

    /// Resolve `identifier` through a [`NameOrIdLookup`].
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub async fn resolve_with<L>(&self, lookup: &L, identifier: &str, refresh: bool) -> Result<L::Entity>
    where
        L: NameOrIdLookup + ?Sized,
    {
        if identifier.trim().is_empty() {
            return Err(Error::InvalidRequest(format!("empty {} identifier", L::KIND)));
        }

        let strategy = self.strategy_for(identifier);
        debug!(kind = L::KIND, identifier, ?strategy, refresh, "resolving entity");
        match strategy {
            Strategy::ById => lookup.get_by_id(identifier, refresh).await,
            Strategy::ByName => lookup.get_by_name(identifier, refresh).await,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve with the default predicate.
///
/// # Errors
///
/// See [`Resolver::resolve`].
pub async fn resolve_by_name_or_id<T, N, NF, I, IF>(
    identifier: &str,
    refresh: bool,
    by_name: N,
    by_id: I,
) -> Result<T>
where
    N: FnOnce(String, bool) -> NF,
    NF: Future<Output = Result<T>>,
    I: FnOnce(String, bool) -> IF,
    IF: Future<Output = Result<T>>,
{
    Resolver::new()
        .resolve(identifier, refresh, by_name, by_id)
        .await
}

/// Reduce candidate matches to exactly one.
///
/// Strategies call this with every entity matching the lookup key.
///
/// # Errors
///
/// [`Error::NotFound`] for no matches, [`Error::Ambiguous`] for several.
pub fn unique_match<T>(kind: &str, identifier: &str, mut matches: Vec<T>) -> Result<T> {
    match matches.len() {
        0 => Err(Error::NotFound(format!("{kind} '{identifier}'"))),
        1 => Ok(matches.remove(0)),
        n => Err(Error::Ambiguous {
            kind: kind.to_string(),
            identifier: identifier.to_string(),
            matches: n,
        }),
    }
}
