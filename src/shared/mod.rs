//! Shared newtypes and pure numeric utilities used across all modules.
//!
//! The newtypes are serialization-transparent: they serialize/deserialize as
//! plain strings, so configuration files and UI state can carry them directly.

pub mod amount;
pub mod step;

pub use amount::{from_chain_amount, to_chain_amount, to_chain_price, try_to_chain_amount, ChainAmount};
pub use step::{
    is_step_aligned, limit_fraction_digits, snap_text_to_step, snap_to_decimals, snap_to_step,
    step_text, TextSnap,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── NetworkId ───────────────────────────────────────────────────────────────

/// Identifier of a chain network (e.g. `"warpx"`), the key of the session
/// registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::from(crate::network::DEFAULT_NETWORK_ID)
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NetworkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for NetworkId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NetworkId(s.to_string()))
    }
}

impl Serialize for NetworkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(NetworkId(s))
    }
}

// ─── AccountAddress ──────────────────────────────────────────────────────────

/// An account address as reported by the wallet extension.
///
/// Kept opaque: the extension is the authority on address encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for display, e.g. `5GrwvaEF...oHGKutQY`.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 16 {
            return self.0.clone();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl std::fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AccountAddress(s))
    }
}

// ─── Side ────────────────────────────────────────────────────────────────────

/// Order side: Bid (buy) or Ask (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "Buy"),
            Side::Ask => write!(f, "Sell"),
        }
    }
}
