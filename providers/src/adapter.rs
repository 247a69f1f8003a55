//! Provider Contract
//!
//! One trait, four implementations. An adapter is a set of operations plus a
//! capability matrix, not a hierarchy; new backends are added by implementing
//! this trait and registering with the router.
//!
//! Adapters keep operation-local state (note maps, session handles) behind
//! interior mutability so the trait surface is `&self` throughout and
//! instances can be shared.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProofBundle, ProveRequest, ProviderId, TokenSupport, TransferRequest, WithdrawRequest,
};
use crate::wallet::{Chain, Wallet};

/// The uniform operation surface every privacy backend implements.
#[async_trait]
pub trait PrivacyProvider: Send + Sync {
    /// Stable identifier used in routing and diagnostics.
    fn provider_id(&self) -> ProviderId;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Privacy levels this backend can deliver.
    fn supported_privacy_levels(&self) -> &[PrivacyLevel];

    /// Token symbols this backend accepts.
    fn supported_tokens(&self) -> TokenSupport;

    /// Whether the backend offers a compliance/audit surface.
    fn supports_compliance(&self) -> bool {
        false
    }

    /// Bind the chain and optional wallet collaborators and probe readiness.
    ///
    /// Idempotent. Probe failures are warnings, not fatal, unless the backend
    /// cannot run any operation without the missing piece.
    async fn initialize(&self, chain: Arc<dyn Chain>, wallet: Option<Arc<dyn Wallet>>)
        -> Result<()>;

    fn is_ready(&self) -> bool;

    /// Balance of `token` for `address` (the wallet address when `None`).
    async fn balance(&self, token: &str, address: Option<&str>) -> Result<Balance>;

    async fn transfer(&self, request: &TransferRequest) -> Result<OperationReceipt>;

    async fn deposit(&self, request: &DepositRequest) -> Result<OperationReceipt>;

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<OperationReceipt>;

    /// Pure local estimation; must not block on remote state.
    async fn estimate(&self, request: &EstimateRequest) -> Result<CostEstimate>;

    /// Proof generation, for backends that have a proving path.
    async fn prove(&self, request: &ProveRequest) -> Result<ProofBundle> {
        Err(ProviderError::ProofGeneration {
            circuit: request.circuit.clone(),
            cause: format!("{} does not generate proofs", self.provider_id()),
        })
    }
}

/// Pre-operation checks shared by all adapters.
///
/// Order matters for router diagnostics: readiness, token support, privacy
/// level, then amount bounds from the provider's fee table.
pub fn precheck(
    provider: &dyn PrivacyProvider,
    registry: &TokenRegistry,
    token: &str,
    amount: f64,
    level: PrivacyLevel,
) -> Result<()> {
    let id = provider.provider_id();

    if !provider.is_ready() {
        return Err(ProviderError::ProviderNotAvailable(id));
    }
    if !provider.supported_tokens().supports(token) {
        return Err(ProviderError::UnsupportedToken {
            token: token.to_string(),
            provider: id.to_string(),
        });
    }
    if !provider.supported_privacy_levels().contains(&level) {
        return Err(ProviderError::UnsupportedPrivacyLevel {
            level,
            provider: id.to_string(),
        });
    }

    if let Some(table) = registry.fee_table(token, id) {
        if amount < table.min_amount {
            return Err(ProviderError::AmountBelowMinimum {
                amount,
                minimum: table.min_amount,
                token: token.to_string(),
                provider: id.to_string(),
            });
        }
        if let Some(max) = table.max_amount {
            if amount > max {
                return Err(ProviderError::AmountAboveMaximum {
                    amount,
                    maximum: max,
                    token: token.to_string(),
                    provider: id.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Registry-driven estimate shared by the adapters.
///
/// Fee falls back to a flat default fraction when the provider has no
/// published row for the token (possible only for `TokenSupport::Any`
/// backends).
pub(crate) fn estimate_from_registry(
    registry: &TokenRegistry,
    provider: ProviderId,
    token: &str,
    amount: f64,
    latency_ms: u64,
    default_fraction: f64,
) -> CostEstimate {
    let table = registry.fee_table(token, provider);
    let fraction = table.map(|t| t.fee_fraction).unwrap_or(default_fraction);
    let anonymity_set = table.and_then(|t| t.anonymity_set);

    let mut warnings = Vec::new();
    if let Some(t) = table {
        if amount < t.min_amount {
            warnings.push(format!(
                "amount {amount} below minimum {} {token}",
                t.min_amount
            ));
        }
        if let Some(max) = t.max_amount {
            if amount > max {
                warnings.push(format!("amount {amount} above maximum {max} {token}"));
            }
        }
    }

    CostEstimate {
        fee: amount * fraction,
        latency_ms,
        anonymity_set,
        warnings,
    }
}
