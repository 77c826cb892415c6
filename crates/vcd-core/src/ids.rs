//! Identifier shapes and comparison for vCD entities.
//!
//! vCD refers to the same entity in three ways: a URN
//! (`urn:vcloud:catalog:<uuid>`), a bare UUID, and an HREF whose last path
//! segment ends in the UUID (`https://host/api/vApp/vapp-<uuid>`). This module
//! classifies those shapes, extracts the UUID from any of them, and provides
//! typed wrappers per entity kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Namespace used by vCD URNs.
pub const URN_NAMESPACE: &str = "vcloud";

const HYPHENATED_UUID_LEN: usize = 36;

/// Predicate deciding whether an identifier should be resolved as an ID.
///
/// The resolver takes one of these so callers with different response shapes
/// can share the same lookup logic.
pub type IdPredicate = fn(&str) -> bool;

/// Lexical shape of a caller-supplied identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierShape {
    /// `urn:<namespace>:<kind>:<uuid>`
    Urn,
    /// A hyphenated UUID
    Uuid,
    /// An absolute or rooted HREF ending in a UUID
    Href,
    /// Anything else; treated as a display name
    Name,
}

impl IdentifierShape {
    /// Classify an identifier.
    #[must_use]
    pub fn of(identifier: &str) -> Self {
        let identifier = identifier.trim();
        if is_urn(identifier) {
            Self::Urn
        } else if parse_hyphenated(identifier).is_some() {
            Self::Uuid
        } else if is_href(identifier) && uuid_from_href(identifier).is_some() {
            Self::Href
        } else {
            Self::Name
        }
    }

    /// Returns true for every shape except [`IdentifierShape::Name`].
    #[must_use]
    pub const fn is_id(&self) -> bool {
        !matches!(self, Self::Name)
    }
}

/// Default identifier predicate: true only for confident URN, UUID or HREF shapes.
#[must_use]
pub fn looks_like_id(identifier: &str) -> bool {
    IdentifierShape::of(identifier).is_id()
}

/// Returns true if `input` is a URN whose last component is a UUID.
#[must_use]
pub fn is_urn(input: &str) -> bool {
    urn_parts(input).is_some()
}

fn urn_parts(input: &str) -> Option<(&str, Uuid)> {
    let rest = input
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("urn:"))
        .map(|_| &input[4..])?;
    let (head, tail) = rest.rsplit_once(':')?;
    let kind = head.rsplit_once(':').map_or(head, |(_, kind)| kind);
    if kind.is_empty() {
        return None;
    }
    parse_hyphenated(tail).map(|uuid| (kind, uuid))
}

fn is_href(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://") || input.starts_with('/')
}

fn parse_hyphenated(input: &str) -> Option<Uuid> {
    if input.len() != HYPHENATED_UUID_LEN {
        return None;
    }
    Uuid::parse_str(input).ok()
}

/// Extract the UUID from a URN or a bare UUID.
#[must_use]
pub fn bare_uuid(id: &str) -> Option<Uuid> {
    let id = id.trim();
    parse_hyphenated(id).or_else(|| urn_parts(id).map(|(_, uuid)| uuid))
}

/// Extract the UUID from the last path segment of an HREF.
///
/// The segment may carry a type prefix, as in `vm-<uuid>`.
#[must_use]
pub fn uuid_from_href(href: &str) -> Option<Uuid> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if segment.len() < HYPHENATED_UUID_LEN {
        return None;
    }
    let start = segment.len() - HYPHENATED_UUID_LEN;
    if !segment.is_char_boundary(start) {
        return None;
    }
    parse_hyphenated(&segment[start..])
}

/// Extract a UUID from any supported identifier shape.
#[must_use]
pub fn extract_uuid(identifier: &str) -> Option<Uuid> {
    bare_uuid(identifier).or_else(|| uuid_from_href(identifier))
}

/// Compare a wanted identifier against an entity's ID and HREF.
///
/// `wanted` may be a URN, bare UUID or HREF. The entity's `id` is preferred
/// when it parses; otherwise the UUID is taken from `href`. Returns false when
/// both `id` and `href` are empty or no UUID can be extracted.
#[must_use]
pub fn equal_ids(wanted: &str, id: &str, href: &str) -> bool {
    if id.is_empty() && href.is_empty() {
        return false;
    }
    let Some(wanted) = extract_uuid(wanted) else {
        return false;
    };

    if !id.is_empty() {
        if let Some(candidate) = bare_uuid(id) {
            return candidate == wanted;
        }
    }

    uuid_from_href(href).is_some_and(|candidate| candidate == wanted)
}

/// Render a URN for the given entity kind and UUID.
#[must_use]
pub fn build_urn(kind: &str, uuid: &Uuid) -> String {
    format!("urn:{URN_NAMESPACE}:{kind}:{uuid}")
}

/// Macro to generate strongly-typed entity identifiers.
macro_rules! entity_id {
    ($name:ident, $kind:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            /// URN kind segment for this entity.
            pub const KIND: &'static str = $kind;

            /// Creates an identifier from a [`Uuid`].
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a new random identifier (v4).
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner [`Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the URN form, e.g. `urn:vcloud:catalog:<uuid>`.
            #[must_use]
            pub fn urn(&self) -> String {
                build_urn(Self::KIND, &self.0)
            }

            /// Parses a URN, bare UUID or HREF.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidId`] if no UUID can be extracted or a
            /// URN names a different entity kind.
            pub fn parse(input: &str) -> Result<Self> {
                if let Some((kind, uuid)) = urn_parts(input.trim()) {
                    if kind != Self::KIND {
                        return Err(Error::InvalidId(format!(
                            "expected a {} URN, got '{input}'",
                            Self::KIND
                        )));
                    }
                    return Ok(Self(uuid));
                }
                extract_uuid(input)
                    .map(Self)
                    .ok_or_else(|| Error::InvalidId(input.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.urn()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.urn())
            }
        }
    };
}

entity_id!(OrgId, "org", "Organization identifier");
entity_id!(VdcId, "vdc", "Virtual datacenter identifier");
entity_id!(CatalogId, "catalog", "Catalog identifier");
entity_id!(VAppId, "vapp", "vApp identifier");
entity_id!(VmId, "vm", "Virtual machine identifier");
entity_id!(EdgeGatewayId, "gateway", "Edge gateway identifier");
entity_id!(TaskId, "task", "Task identifier");
entity_id!(ComputePolicyId, "vdcComputePolicy", "VDC compute policy identifier");
