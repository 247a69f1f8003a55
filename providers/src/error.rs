//! Provider Error Taxonomy
//!
//! Every adapter maps its backend's failures onto these kinds. Validation
//! errors are raised locally and never retried; transport errors are retried
//! per the backoff policy and then surfaced as `Network`; server-reported
//! business errors are mapped by keyword and never retried.

use thiserror::Error;

use crate::types::{PrivacyLevel, ProviderId};
use veilkit_crypto::CryptoError;

/// Errors surfaced by adapters and the router.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider {0} is not available")]
    ProviderNotAvailable(ProviderId),

    #[error("token {token} is not supported by {provider}")]
    UnsupportedToken { token: String, provider: String },

    #[error("privacy level {level} is not supported by {provider}")]
    UnsupportedPrivacyLevel {
        level: PrivacyLevel,
        provider: String,
    },

    #[error("insufficient balance: required {required} {token}, available {available}")]
    InsufficientBalance {
        required: f64,
        available: f64,
        token: String,
    },

    #[error("amount {amount} {token} is below the {provider} minimum of {minimum}")]
    AmountBelowMinimum {
        amount: f64,
        minimum: f64,
        token: String,
        provider: String,
    },

    #[error("amount {amount} {token} is above the {provider} maximum of {maximum}")]
    AmountAboveMaximum {
        amount: f64,
        maximum: f64,
        token: String,
        provider: String,
    },

    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("proof generation failed for circuit {circuit}: {cause}")]
    ProofGeneration { circuit: String, cause: String },

    #[error("proof verification failed: {0}")]
    ProofVerification(String),

    #[error("transaction failed: {cause}")]
    Transaction {
        cause: String,
        signature: Option<String>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out during {0}")]
    Timeout(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("no suitable provider: {}", format_exclusions(.0))]
    NoSuitableProvider(Vec<ExclusionReason>),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Why the router excluded one adapter (the first failing rule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionReason {
    pub provider: ProviderId,
    pub reason: String,
}

fn format_exclusions(reasons: &[ExclusionReason]) -> String {
    if reasons.is_empty() {
        return "no providers registered".to_string();
    }
    reasons
        .iter()
        .map(|r| format!("{}: {}", r.provider, r.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Transport-level errors are the only retryable kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_split() {
        assert!(ProviderError::Network("connection reset".into()).is_retryable());
        assert!(!ProviderError::WalletNotConnected.is_retryable());
        assert!(!ProviderError::Timeout("confirm".into()).is_retryable());
        assert!(!ProviderError::Transaction {
            cause: "simulation failed".into(),
            signature: None,
        }
        .is_retryable());
    }

    #[test]
    fn test_no_suitable_provider_lists_reasons() {
        let err = ProviderError::NoSuitableProvider(vec![
            ExclusionReason {
                provider: ProviderId::Arcium,
                reason: "does not support token XYZ".into(),
            },
            ExclusionReason {
                provider: ProviderId::ShadowWire,
                reason: "fee 3.00 exceeds max 2.00".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("arcium: does not support token XYZ"));
        assert!(msg.contains("shadowwire: fee 3.00 exceeds max 2.00"));
    }
}
