//! Value Objects for the Vendo Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Transaction id must be non-empty
    #[error("Invalid transaction id: {0}")]
    InvalidTxId(String),

    /// UTXO reference must be `txid#index`
    #[error("Invalid utxo reference: {0}")]
    InvalidUtxoRef(String),

    /// Address must be non-empty
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Token reference must be non-empty
    #[error("Invalid token reference: {0}")]
    InvalidTokenRef(String),

    /// Policy id must be non-empty
    #[error("Invalid policy id: {0}")]
    InvalidPolicyId(String),

    /// Price table validation error
    #[error("Invalid price table: {0}")]
    InvalidPriceTable(String),

    /// Unknown network selector
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}

// =============================================================================
// Lovelace
// =============================================================================

/// Lovelace is the integral on-chain amount (1 ADA = 1_000_000 lovelace).
///
/// Payment matching is exact, so amounts stay integral end to end; there is
/// no fractional arithmetic anywhere in the domain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Lovelace(u64);

impl Lovelace {
    /// The zero amount
    pub const ZERO: Lovelace = Lovelace(0);

    /// Create a new amount
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the underlying integer value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Lovelace) -> Lovelace {
        Lovelace(self.0.saturating_sub(other.0))
    }

    /// Price of a single item when this amount buys `count` items.
    ///
    /// Integer division; the remainder stays with the project, matching the
    /// truncation the partial-refund arithmetic is specified with.
    pub fn per_item(self, count: u32) -> Lovelace {
        if count == 0 {
            return Lovelace::ZERO;
        }
        Lovelace(self.0 / u64::from(count))
    }

    /// Scale by an item count (refund = per_item * items_not_granted).
    pub fn times(self, count: u32) -> Lovelace {
        Lovelace(self.0 * u64::from(count))
    }
}

impl fmt::Display for Lovelace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TxId
// =============================================================================

/// TxId is the hash of an on-chain transaction.
///
/// # Invariants
/// - Must be non-empty
/// - Must not contain the `#` reference separator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Create a new TxId with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTxId` if empty or containing `#`
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidTxId("empty hash".to_string()));
        }
        if value.contains('#') {
            return Err(DomainError::InvalidTxId(value));
        }
        Ok(Self(value))
    }

    /// Get the hash string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// UtxoRef
// =============================================================================

/// UtxoRef uniquely identifies an unspent transaction output.
///
/// Serialized as the string `"<txid>#<index>"`, which is also the sales
/// ledger document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoRef {
    /// Creating transaction hash
    pub tx_id: TxId,
    /// Output index within that transaction
    pub index: u32,
}

impl UtxoRef {
    /// Create a new reference
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

impl FromStr for UtxoRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s
            .rsplit_once('#')
            .ok_or_else(|| DomainError::InvalidUtxoRef(s.to_string()))?;
        let index = index
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidUtxoRef(s.to_string()))?;
        Ok(Self {
            tx_id: TxId::new(hash)?,
            index,
        })
    }
}

impl Serialize for UtxoRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UtxoRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Address / PolicyId / TokenRef
// =============================================================================

/// A payment address on the underlying ledger.
///
/// # Invariants
/// - Must be non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create a new Address with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAddress` if empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidAddress("empty address".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The minting policy a drop is issued under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    /// Create a new PolicyId with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPolicyId` if empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidPolicyId("empty policy".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the policy id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TokenRef names one not-yet-issued collectible's metadata.
///
/// Opaque to the core: typically a metadata file reference produced by the
/// offline artwork pipeline. Total order matters for first-come assignment;
/// each TokenRef is consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRef(String);

impl TokenRef {
    /// Create a new TokenRef with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTokenRef` if empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidTokenRef("empty reference".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the reference string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Network
// =============================================================================

/// Network selector for the underlying ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network
    Mainnet,
    /// Test network
    Testnet,
}

impl FromStr for Network {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(DomainError::InvalidNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

// =============================================================================
// Utxo
// =============================================================================

/// An unspent value record observed at the watched payment address.
///
/// Immutable once observed; disappears from the visible set once spent.
/// `slot` is the observation order the chain assigned to the creating
/// transaction and drives first-come-first-served fairness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Unique reference (txid + output index)
    pub reference: UtxoRef,
    /// Attached lovelace amount
    pub amount: Lovelace,
    /// Native asset quantities attached to the output, keyed by asset name
    #[serde(default)]
    pub assets: BTreeMap<String, u64>,
    /// Slot the creating transaction was observed in
    pub slot: u64,
}

impl Utxo {
    /// Create a plain value-only UTXO (no native assets).
    pub fn new(reference: UtxoRef, amount: Lovelace, slot: u64) -> Self {
        Self {
            reference,
            amount,
            assets: BTreeMap::new(),
            slot,
        }
    }
}

// =============================================================================
// PriceTable
// =============================================================================

/// Static mapping from exact payment amount to item count.
///
/// Persisted as a `{ "<lovelace>": count }` JSON document. Lookup is exact:
/// an amount absent from the table is an unrelated transfer, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PriceTable(BTreeMap<Lovelace, u32>);

impl PriceTable {
    /// Build a price table from (amount, count) entries.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPriceTable` on an empty table or a zero
    /// item count.
    pub fn new(entries: BTreeMap<Lovelace, u32>) -> Result<Self, DomainError> {
        let table = Self(entries);
        table.validate(usize::MAX)?;
        Ok(table)
    }

    /// Item count for an exact payment amount.
    pub fn lookup(&self, amount: Lovelace) -> Option<u32> {
        self.0.get(&amount).copied()
    }

    /// Number of price points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the table has no price points.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest item count any single payment can request.
    pub fn max_count(&self) -> u32 {
        self.0.values().copied().max().unwrap_or(0)
    }

    /// Startup validation: non-empty, positive counts, and no bundle larger
    /// than what fits in a single mint transaction.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPriceTable` describing the offending
    /// entry.
    pub fn validate(&self, max_items_per_tx: usize) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidPriceTable("no price points".to_string()));
        }
        for (amount, count) in &self.0 {
            if *count == 0 {
                return Err(DomainError::InvalidPriceTable(format!(
                    "zero item count for amount {}",
                    amount
                )));
            }
            if *count as usize > max_items_per_tx {
                return Err(DomainError::InvalidPriceTable(format!(
                    "bundle of {} items for amount {} exceeds max {} per transaction",
                    count, amount, max_items_per_tx
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str) -> TxId {
        TxId::new(hash).unwrap()
    }

    #[test]
    fn test_lovelace_per_item_truncates() {
        // 10 ADA for 3 items: per-item truncates to 3_333_333
        let amount = Lovelace::new(10_000_000);
        assert_eq!(amount.per_item(3), Lovelace::new(3_333_333));
        assert_eq!(amount.per_item(3).times(2), Lovelace::new(6_666_666));
    }

    #[test]
    fn test_lovelace_per_item_zero_count() {
        assert_eq!(Lovelace::new(5).per_item(0), Lovelace::ZERO);
    }

    #[test]
    fn test_txid_rejects_empty_and_separator() {
        assert!(TxId::new("").is_err());
        assert!(TxId::new("abc#0").is_err());
        assert!(TxId::new("abc123").is_ok());
    }

    #[test]
    fn test_utxo_ref_display_roundtrip() {
        let reference = UtxoRef::new(tx("deadbeef"), 3);
        assert_eq!(reference.to_string(), "deadbeef#3");

        let parsed: UtxoRef = "deadbeef#3".parse().unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn test_utxo_ref_parse_rejects_garbage() {
        assert!("deadbeef".parse::<UtxoRef>().is_err());
        assert!("#1".parse::<UtxoRef>().is_err());
        assert!("deadbeef#x".parse::<UtxoRef>().is_err());
    }

    #[test]
    fn test_utxo_ref_serializes_as_string() {
        let reference = UtxoRef::new(tx("aa"), 0);
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"aa#0\"");

        let parsed: UtxoRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_price_table_lookup() {
        let mut entries = BTreeMap::new();
        entries.insert(Lovelace::new(8_000_000), 1);
        entries.insert(Lovelace::new(20_000_000), 3);
        let table = PriceTable::new(entries).unwrap();

        assert_eq!(table.lookup(Lovelace::new(8_000_000)), Some(1));
        assert_eq!(table.lookup(Lovelace::new(20_000_000)), Some(3));
        assert_eq!(table.lookup(Lovelace::new(1)), None);
        assert_eq!(table.max_count(), 3);
    }

    #[test]
    fn test_price_table_rejects_empty_and_zero_count() {
        assert!(PriceTable::new(BTreeMap::new()).is_err());

        let mut entries = BTreeMap::new();
        entries.insert(Lovelace::new(8_000_000), 0);
        assert!(PriceTable::new(entries).is_err());
    }

    #[test]
    fn test_price_table_validate_against_tx_ceiling() {
        let mut entries = BTreeMap::new();
        entries.insert(Lovelace::new(40_000_000), 8);
        let table = PriceTable::new(entries).unwrap();

        assert!(table.validate(10).is_ok());
        assert!(table.validate(5).is_err());
    }

    #[test]
    fn test_price_table_json_document() {
        let json = r#"{ "8000000": 1, "20000000": 3 }"#;
        let table: PriceTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.lookup(Lovelace::new(8_000_000)), Some(1));

        let back = serde_json::to_string(&table).unwrap();
        let reparsed: PriceTable = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn test_utxo_json_defaults_assets() {
        let json = r#"{ "reference": "aa#0", "amount": 8000000, "slot": 42 }"#;
        let utxo: Utxo = serde_json::from_str(json).unwrap();
        assert!(utxo.assets.is_empty());
        assert_eq!(utxo.slot, 42);
    }
}
