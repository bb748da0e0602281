//! Shared newtypes used across all engine modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw strings the contract layer and storage use, so they
//! can appear directly in persisted and wire-facing types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

// ─── AddressStr ──────────────────────────────────────────────────────────────

/// An EVM-style account address stored as a `0x`-prefixed hex string.
///
/// Serializes transparently as a JSON string. Can be used as a HashMap key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressStr(String);

/// The all-zero address, used when no referrer is supplied.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

impl AddressStr {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn zero() -> Self {
        Self(ZERO_ADDRESS.to_string())
    }

    /// Raw 20-byte form, without the `0x` prefix.
    pub fn to_bytes(&self) -> Result<[u8; 20], String> {
        let stripped = self.0.strip_prefix("0x").unwrap_or(&self.0);
        let raw = hex::decode(stripped).map_err(|e| e.to_string())?;
        raw.try_into()
            .map_err(|_| format!("address {} is not 20 bytes", self.0))
    }
}

impl std::fmt::Display for AddressStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AddressStr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AddressStr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for AddressStr {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AddressStr(s.to_string()))
    }
}

impl Serialize for AddressStr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AddressStr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AddressStr(s))
    }
}

// ─── ActionKind ──────────────────────────────────────────────────────────────

/// The discrete game actions the contract accepts, with their `u8` wire
/// values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Collect,
    Dodge,
    Scan,
    Boost,
    Claim,
}

impl ActionKind {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Collect => 0,
            Self::Dodge => 1,
            Self::Scan => 2,
            Self::Boost => 3,
            Self::Claim => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Dodge => "dodge",
            Self::Scan => "scan",
            Self::Boost => "boost",
            Self::Claim => "claim",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── EntryId ─────────────────────────────────────────────────────────────────

/// Opaque unique identifier for one user-triggered action.
///
/// Derived from the submission time plus a process-local sequence number;
/// timestamp alone can collide when actions arrive faster than the clock
/// ticks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

static ENTRY_SEQ: AtomicU64 = AtomicU64::new(0);

impl EntryId {
    /// Allocate the next id for an action of the given kind.
    pub fn next(kind: ActionKind) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = ENTRY_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}-{}", millis, kind.as_str(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Utilities ───────────────────────────────────────────────────────────────

/// Encode a free-form note into call metadata bytes. Absent notes become the
/// empty byte string, matching the contract's `0x` sentinel.
pub fn note_to_metadata(note: Option<&str>) -> Vec<u8> {
    note.map(|n| n.as_bytes().to_vec()).unwrap_or_default()
}
