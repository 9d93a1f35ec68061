//! Identifier newtypes.
//!
//! Venues and symbols are plain strings on the wire; wrapping them keeps a
//! buy venue from being passed where a symbol is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Exchange or trading account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VenueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Trading pair in `BASE/QUOTE` form, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset, the part before the slash.
    #[must_use]
    pub fn base(&self) -> &str {
        self.split().map_or(self.0.as_str(), |(base, _)| base)
    }

    /// Quote currency, the part after the slash.
    #[must_use]
    pub fn quote(&self) -> &str {
        self.split().map_or("", |(_, quote)| quote)
    }

    /// Returns true if both halves are present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        matches!(self.split(), Some((base, quote)) if !base.is_empty() && !quote.is_empty())
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('/')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_splits_into_base_and_quote() {
        let symbol = Symbol::from("ETH/USDC");
        assert_eq!(symbol.base(), "ETH");
        assert_eq!(symbol.quote(), "USDC");
        assert!(symbol.is_well_formed());
    }

    #[test]
    fn symbol_without_slash_is_malformed() {
        let symbol = Symbol::from("ETHUSDC");
        assert_eq!(symbol.base(), "ETHUSDC");
        assert_eq!(symbol.quote(), "");
        assert!(!symbol.is_well_formed());
    }

    #[test]
    fn transaction_ids_are_unique() {
        assert_ne!(TransactionId::generate(), TransactionId::generate());
    }

    #[test]
    fn transaction_id_display_is_prefixed() {
        let id = TransactionId::generate();
        assert!(id.to_string().starts_with("tx-"));
    }
}
