//! Identifier types for hubs, stations, lines and modes.
//!
//! Upstream identifiers are opaque strings (e.g. `940GZZLUKSX`, `HUBKGX`,
//! `northern`, `tube`). Each gets its own newtype so a line identifier can
//! never be passed where a station identifier is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix the upstream API uses for synthetic hub groupings.
const SYNTHETIC_HUB_PREFIX: &str = "HUB";

/// Error returned when an identifier is empty or contains whitespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} identifier {value:?}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    value: String,
    reason: &'static str,
}

fn validate(kind: &'static str, value: String) -> Result<String, InvalidId> {
    if value.is_empty() {
        return Err(InvalidId {
            kind,
            value,
            reason: "must not be empty",
        });
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(InvalidId {
            kind,
            value,
            reason: "must not contain whitespace",
        });
    }
    Ok(value)
}

/// Identifier of a physical station (a stop point).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
        validate("station", s.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a hub.
///
/// Either the identifier of one of its constituent stations, or a synthetic
/// `HUB…` identifier when the source groups stations under one.
///
/// # Examples
///
/// ```
/// use hub_planner::domain::HubId;
///
/// let kx = HubId::parse("HUBKGX").unwrap();
/// assert!(kx.is_synthetic());
///
/// let bank = HubId::parse("940GZZLUBNK").unwrap();
/// assert!(!bank.is_synthetic());
///
/// assert!(HubId::parse("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HubId(String);

impl HubId {
    /// Parse a hub identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
        validate("hub", s.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a synthetic grouping identifier rather than a station.
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_HUB_PREFIX)
    }
}

impl From<StationId> for HubId {
    fn from(id: StationId) -> Self {
        HubId(id.0)
    }
}

/// Identifier of a transit line (the routing key of a line edge).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineId(String);

impl LineId {
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
        validate("line", s.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A transport mode, e.g. `tube`, `dlr`, `national-rail`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mode(String);

impl Mode {
    /// Parse a mode name. Mode names are case-insensitive and stored lowercase.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
        validate("mode", s.into().to_ascii_lowercase()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn walking() -> Self {
        Mode("walking".to_string())
    }

    pub fn is_walking(&self) -> bool {
        self.0 == "walking"
    }
}

macro_rules! string_conversions {
    ($($ty:ident),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $ty::parse(s)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> String {
                id.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), self.0)
            }
        }
    )*};
}

string_conversions!(StationId, HubId, LineId, Mode);
