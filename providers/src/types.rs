//! Shared Types
//!
//! Request/response shapes for the provider contract and the router.

use serde::{Deserialize, Serialize};
use std::fmt;

use veilkit_crypto::Groth16Proof;

// ============================================================================
// Providers and Capabilities
// ============================================================================

/// The backend protocols this toolkit can route to.
///
/// Variant order is the alphabetical order of the wire identifiers; router
/// tie-breaks rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    Arcium,
    Noir,
    PrivacyCash,
    ShadowWire,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Arcium => "arcium",
            ProviderId::Noir => "noir",
            ProviderId::PrivacyCash => "privacy-cash",
            ProviderId::ShadowWire => "shadowwire",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transfer hides from chain observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyLevel {
    /// No privacy; routed for API uniformity only.
    Transparent,
    /// Amounts encrypted, parties visible.
    AmountHidden,
    /// Pool-based unlinkability of sender and receiver.
    Shielded,
    /// Shielded plus relayer-submitted transactions.
    Anonymous,
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrivacyLevel::Transparent => "transparent",
            PrivacyLevel::AmountHidden => "amount-hidden",
            PrivacyLevel::Shielded => "shielded",
            PrivacyLevel::Anonymous => "anonymous",
        };
        f.write_str(s)
    }
}

/// Which token symbols an adapter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSupport {
    /// Any symbol (the ZK adapter proves over arbitrary assets).
    Any,
    /// An explicit allow list.
    List(Vec<&'static str>),
}

impl TokenSupport {
    pub fn supports(&self, symbol: &str) -> bool {
        match self {
            TokenSupport::Any => true,
            TokenSupport::List(symbols) => symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol)),
        }
    }
}

// ============================================================================
// Operation Requests
// ============================================================================

/// A private transfer to a recipient address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub token: String,
    pub amount: f64,
    pub recipient: String,
    pub privacy_level: PrivacyLevel,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Move funds from the transparent balance into the private domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub token: String,
    pub amount: f64,
    pub privacy_level: PrivacyLevel,
}

/// Move funds out of the private domain to a transparent address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub token: String,
    pub amount: f64,
    pub recipient: String,
    pub privacy_level: PrivacyLevel,
    /// Deposit note string, for note-based pools.
    #[serde(default)]
    pub note: Option<String>,
}

/// Cost estimation input; never touches remote state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub token: String,
    pub amount: f64,
    pub privacy_level: PrivacyLevel,
}

/// Proof generation input for proof-capable adapters.
#[derive(Debug, Clone)]
pub struct ProveRequest {
    pub circuit: String,
    /// Named inputs as decimal field-element strings.
    pub inputs: std::collections::HashMap<String, String>,
}

// ============================================================================
// Operation Results
// ============================================================================

/// Normalized result of a transfer, deposit, or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReceipt {
    pub provider: ProviderId,
    pub token: String,
    pub amount: f64,
    pub fee: f64,
    /// Transaction signature or remote transaction id, when one exists.
    #[serde(default)]
    pub signature: Option<String>,
    /// Commitment published by a deposit.
    #[serde(default)]
    pub commitment: Option<String>,
    /// Nullifier hash published by a withdrawal.
    #[serde(default)]
    pub nullifier_hash: Option<String>,
    /// Encoded deposit note returned to the caller for safekeeping.
    #[serde(default)]
    pub note: Option<String>,
}

/// A token balance as seen by one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub token: String,
    pub amount: f64,
}

/// Cost estimate for an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub fee: f64,
    pub latency_ms: u64,
    #[serde(default)]
    pub anonymity_set: Option<u64>,
    /// Non-fatal findings; "below minimum" warnings block router selection.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A generated proof plus the verification key when one is loaded.
#[derive(Debug, Clone)]
pub struct ProofBundle {
    pub proof: Groth16Proof,
    pub verification_key: Option<Vec<u8>>,
}

// ============================================================================
// Router Selection
// ============================================================================

/// Declarative request the router resolves to an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub privacy_level: PrivacyLevel,
    pub token: String,
    pub amount: f64,
    #[serde(default)]
    pub max_fee: Option<f64>,
    #[serde(default)]
    pub max_latency_ms: Option<u64>,
    #[serde(default)]
    pub require_compliance: bool,
    #[serde(default)]
    pub preferred_provider: Option<ProviderId>,
}

/// One scored candidate.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub provider: ProviderId,
    pub estimate: CostEstimate,
    pub score: i64,
    pub reasons: Vec<String>,
}

/// Router output: the recommendation, the rest ranked, and why.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub recommended: ScoredCandidate,
    pub alternatives: Vec<ScoredCandidate>,
    pub explanation: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_alphabetical_order() {
        let mut ids = [
            ProviderId::ShadowWire,
            ProviderId::Arcium,
            ProviderId::PrivacyCash,
            ProviderId::Noir,
        ];
        ids.sort();
        let strs: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        let mut sorted = strs.clone();
        sorted.sort();
        assert_eq!(strs, sorted, "enum order must match string order");
    }

    #[test]
    fn test_token_support() {
        let list = TokenSupport::List(vec!["SOL", "USDC"]);
        assert!(list.supports("SOL"));
        assert!(list.supports("usdc"));
        assert!(!list.supports("BONK"));
        assert!(TokenSupport::Any.supports("BONK"));
    }

    #[test]
    fn test_privacy_level_display() {
        assert_eq!(PrivacyLevel::AmountHidden.to_string(), "amount-hidden");
    }
}
