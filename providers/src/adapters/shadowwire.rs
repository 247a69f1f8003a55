//! ShadowWire Adapter
//!
//! Stateless remote relayer. Every operation is a canonical JSON message
//! signed by the injected wallet and POSTed to the provider's REST API:
//!
//! ```text
//! POST /v1/transfer   { action, sender, recipient, amount, token, timestamp, signature }
//! POST /v1/deposit    (same shape, recipient = sender)
//! POST /v1/withdraw
//! GET  /v1/balance/{address}?token=SYM
//! GET  /health
//! ```
//!
//! Transport errors and 5xx responses are retried with backoff; 4xx and
//! server-reported business errors are not.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::adapter::{estimate_from_registry, precheck, PrivacyProvider};
use crate::error::{ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProviderId, TokenSupport, TransferRequest, WithdrawRequest,
};
use crate::wallet::{Chain, Wallet};
use veilkit_config::{RetryConfig, ShadowWireConfig, TimeoutConfig, VeilConfig};

const SUPPORTED_LEVELS: &[PrivacyLevel] = &[PrivacyLevel::Transparent, PrivacyLevel::AmountHidden];
const ESTIMATED_LATENCY_MS: u64 = 2_000;
const DEFAULT_FEE_FRACTION: f64 = 0.01;

/// Configuration for the ShadowWire adapter.
#[derive(Debug, Clone)]
pub struct ShadowWireAdapterConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
}

impl Default for ShadowWireAdapterConfig {
    fn default() -> Self {
        Self::from_parts(&ShadowWireConfig::default(), &VeilConfig::default())
    }
}

impl ShadowWireAdapterConfig {
    fn from_parts(sw: &ShadowWireConfig, cfg: &VeilConfig) -> Self {
        Self {
            base_url: sw.base_url.clone(),
            api_key: sw.api_key.clone(),
            access_token: sw.access_token.clone(),
            timeouts: cfg.timeouts.clone(),
            retry: cfg.retry.clone(),
        }
    }

    /// Build from the process-wide configuration.
    pub fn from_global() -> Self {
        let cfg = VeilConfig::global();
        Self::from_parts(&cfg.shadowwire, cfg)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Canonical message the wallet signs; field order is the signing contract.
#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    action: &'static str,
    sender: String,
    recipient: String,
    amount: f64,
    token: String,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct SignedEnvelope {
    #[serde(flatten)]
    message: ApiMessage,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[allow(dead_code)]
    commitment: Option<String>,
    fee: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    success: bool,
    balance: Option<f64>,
    error: Option<String>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Remote-API privacy relayer adapter.
pub struct ShadowWireAdapter {
    config: ShadowWireAdapterConfig,
    http: reqwest::Client,
    retry: RetryPolicy,
    wallet: RwLock<Option<Arc<dyn Wallet>>>,
    ready: AtomicBool,
}

impl ShadowWireAdapter {
    pub fn new(config: ShadowWireAdapterConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.api_secs))
            .build()
            .expect("failed to build HTTP client");
        let retry = RetryPolicy::from(&config.retry);

        Self {
            config,
            http,
            retry,
            wallet: RwLock::new(None),
            ready: AtomicBool::new(false),
        }
    }

    /// Construct from the process-wide configuration.
    pub fn from_global_config() -> Self {
        Self::new(ShadowWireAdapterConfig::from_global())
    }

    fn wallet(&self) -> Result<Arc<dyn Wallet>> {
        self.wallet
            .read()
            .expect("wallet lock poisoned")
            .clone()
            .ok_or(ProviderError::WalletNotConnected)
    }

    fn auth(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-Key", key);
        }
        if let Some(token) = &self.config.access_token {
            request = request.header("X-Access-Token", token);
        }
        request
    }

    /// Probe the provider's health endpoint.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.auth(self.http.get(&url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("shadowwire health check failed: {e}");
                false
            }
        }
    }

    fn fallback_fee(&self, registry: &TokenRegistry, token: &str, amount: f64) -> f64 {
        let fraction = registry
            .fee_table(token, ProviderId::ShadowWire)
            .map(|t| t.fee_fraction)
            .unwrap_or(DEFAULT_FEE_FRACTION);
        amount * fraction
    }

    async fn signed_message(
        &self,
        action: &'static str,
        recipient: &str,
        amount: f64,
        token: &str,
    ) -> Result<SignedEnvelope> {
        let wallet = self.wallet()?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let message = ApiMessage {
            action,
            sender: wallet.address(),
            recipient: recipient.to_string(),
            amount,
            token: token.to_string(),
            timestamp,
        };
        let bytes = serde_json::to_vec(&message)
            .map_err(|e| ProviderError::InvalidFormat(format!("message encode: {e}")))?;
        let signature = wallet.sign_message(&bytes).await?;

        Ok(SignedEnvelope {
            message,
            signature: BASE64.encode(signature),
        })
    }

    /// Map server-reported business errors onto the taxonomy by keyword.
    fn map_api_error(error: &str, amount: f64, token: &str, recipient: &str) -> ProviderError {
        let lower = error.to_ascii_lowercase();
        if lower.contains("not found") {
            ProviderError::RecipientNotFound(recipient.to_string())
        } else if lower.contains("insufficient") {
            ProviderError::InsufficientBalance {
                required: amount,
                available: 0.0,
                token: token.to_string(),
            }
        } else {
            ProviderError::Transaction {
                cause: error.to_string(),
                signature: None,
            }
        }
    }

    async fn post_once(&self, url: &str, envelope: &SignedEnvelope) -> Result<ApiResponse> {
        let response = self
            .auth(self.http.post(url))
            .json(envelope)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("POST {url}: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Network(format!("{url} returned {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transaction {
                cause: format!("{url} returned {status}: {body}"),
                signature: None,
            });
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| ProviderError::InvalidFormat(format!("response decode: {e}")))
    }

    async fn submit(
        &self,
        path: &str,
        action: &'static str,
        recipient: &str,
        amount: f64,
        token: &str,
    ) -> Result<ApiResponse> {
        let envelope = self.signed_message(action, recipient, amount, token).await?;
        let url = format!("{}{path}", self.config.base_url);

        debug!("shadowwire {action}: {amount} {token} -> {recipient}");
        let response = retry_with_backoff(
            &self.retry,
            action,
            ProviderError::is_retryable,
            || self.post_once(&url, &envelope),
        )
        .await?;

        if !response.success {
            let error = response.error.as_deref().unwrap_or("unknown server error");
            return Err(Self::map_api_error(error, amount, token, recipient));
        }
        Ok(response)
    }

    fn receipt(
        &self,
        registry: &TokenRegistry,
        response: ApiResponse,
        token: &str,
        amount: f64,
    ) -> OperationReceipt {
        let fee = response
            .fee
            .unwrap_or_else(|| self.fallback_fee(registry, token, amount));
        OperationReceipt {
            provider: ProviderId::ShadowWire,
            token: token.to_string(),
            amount,
            fee,
            signature: response.transaction_id,
            commitment: None,
            nullifier_hash: None,
            note: None,
        }
    }
}

#[async_trait]
impl PrivacyProvider for ShadowWireAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::ShadowWire
    }

    fn display_name(&self) -> &'static str {
        "ShadowWire Relayer"
    }

    fn supported_privacy_levels(&self) -> &[PrivacyLevel] {
        SUPPORTED_LEVELS
    }

    fn supported_tokens(&self) -> TokenSupport {
        TokenSupport::List(vec!["SOL", "USDC", "USDT"])
    }

    fn supports_compliance(&self) -> bool {
        // The relayer keeps an auditable transaction log
        true
    }

    async fn initialize(
        &self,
        _chain: Arc<dyn Chain>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Result<()> {
        *self.wallet.write().expect("wallet lock poisoned") = wallet;
        self.ready.store(true, Ordering::SeqCst);

        if !self.health_check().await {
            warn!("shadowwire provider unreachable at initialize; operations may fail");
        } else {
            info!("shadowwire provider ready at {}", self.config.base_url);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn balance(&self, token: &str, address: Option<&str>) -> Result<Balance> {
        let address = match address {
            Some(a) => a.to_string(),
            None => self.wallet()?.address(),
        };
        let url = format!(
            "{}/v1/balance/{address}?token={token}",
            self.config.base_url
        );

        let response = retry_with_backoff(
            &self.retry,
            "balance",
            ProviderError::is_retryable,
            || async {
                let response = self
                    .auth(self.http.get(&url))
                    .send()
                    .await
                    .map_err(|e| ProviderError::Network(format!("GET {url}: {e}")))?;
                if response.status().is_server_error() {
                    return Err(ProviderError::Network(format!(
                        "{url} returned {}",
                        response.status()
                    )));
                }
                response
                    .json::<BalanceResponse>()
                    .await
                    .map_err(|e| ProviderError::InvalidFormat(format!("balance decode: {e}")))
            },
        )
        .await?;

        if !response.success {
            let error = response.error.as_deref().unwrap_or("unknown server error");
            return Err(Self::map_api_error(error, 0.0, token, &address));
        }
        Ok(Balance {
            token: token.to_string(),
            amount: response.balance.unwrap_or(0.0),
        })
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<OperationReceipt> {
        let registry = TokenRegistry::standard();
        precheck(
            self,
            registry,
            &request.token,
            request.amount,
            request.privacy_level,
        )?;

        let response = self
            .submit(
                "/v1/transfer",
                "transfer",
                &request.recipient,
                request.amount,
                &request.token,
            )
            .await?;
        Ok(self.receipt(registry, response, &request.token, request.amount))
    }

    async fn deposit(&self, request: &DepositRequest) -> Result<OperationReceipt> {
        let registry = TokenRegistry::standard();
        precheck(
            self,
            registry,
            &request.token,
            request.amount,
            request.privacy_level,
        )?;

        let self_address = self.wallet()?.address();
        let response = self
            .submit(
                "/v1/deposit",
                "deposit",
                &self_address,
                request.amount,
                &request.token,
            )
            .await?;
        Ok(self.receipt(registry, response, &request.token, request.amount))
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<OperationReceipt> {
        let registry = TokenRegistry::standard();
        precheck(
            self,
            registry,
            &request.token,
            request.amount,
            request.privacy_level,
        )?;

        let response = self
            .submit(
                "/v1/withdraw",
                "withdraw",
                &request.recipient,
                request.amount,
                &request.token,
            )
            .await?;
        Ok(self.receipt(registry, response, &request.token, request.amount))
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<CostEstimate> {
        Ok(estimate_from_registry(
            TokenRegistry::standard(),
            ProviderId::ShadowWire,
            &request.token,
            request.amount,
            ESTIMATED_LATENCY_MS,
            DEFAULT_FEE_FRACTION,
        ))
    }
}
