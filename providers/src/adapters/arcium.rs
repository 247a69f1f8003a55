//! Arcium MPC Adapter
//!
//! Confidential transfers through a C-SPL token program backed by an MPC
//! cluster ("MXE"). Amounts are encrypted client-side with the session's
//! shared secret; shield/unshield move visible amounts across the
//! confidential boundary.
//!
//! Instruction layouts:
//!
//! ```text
//! transfer  0x01 | sender(32) | recipient(32) | ciphertext(var)
//! shield    0x02 | amount u64 LE
//! unshield  0x03 | recipient(32) | amount u64 LE
//! ```
//!
//! The transfer ciphertext segment is the 16-byte encryption nonce followed
//! by the AEAD output.

use async_trait::async_trait;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::adapter::{estimate_from_registry, precheck, PrivacyProvider};
use crate::error::{ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProviderId, TokenSupport, TransferRequest, WithdrawRequest,
};
use crate::wallet::{Chain, Wallet};
use veilkit_config::{TimeoutConfig, VeilConfig, PROGRAMS};
use veilkit_mpc::{EncryptedValue, MxeCipher};

const SUPPORTED_LEVELS: &[PrivacyLevel] = &[PrivacyLevel::AmountHidden, PrivacyLevel::Shielded];
const ESTIMATED_LATENCY_MS: u64 = 4_000;
const DEFAULT_FEE_FRACTION: f64 = 0.002;

const OP_TRANSFER: u8 = 0x01;
const OP_SHIELD: u8 = 0x02;
const OP_UNSHIELD: u8 = 0x03;

/// An MPC computation session: an opaque handle plus the value cipher keyed
/// to the MXE cluster.
pub struct MpcSession {
    pub id: [u8; 16],
    cipher: MxeCipher,
}

impl MpcSession {
    fn open(mxe_public: [u8; 32]) -> Self {
        let mut id = [0u8; 16];
        OsRng.fill_bytes(&mut id);
        Self {
            id,
            cipher: MxeCipher::new(mxe_public),
        }
    }
}

/// MPC confidential-token adapter.
pub struct ArciumAdapter {
    cspl_program: Pubkey,
    mxe_public: [u8; 32],
    timeouts: TimeoutConfig,
    session: RwLock<Option<Arc<MpcSession>>>,
    chain: RwLock<Option<Arc<dyn Chain>>>,
    wallet: RwLock<Option<Arc<dyn Wallet>>>,
}

impl ArciumAdapter {
    pub fn new(cspl_program: Pubkey, mxe_public: [u8; 32]) -> Self {
        Self {
            cspl_program,
            mxe_public,
            timeouts: TimeoutConfig::default(),
            session: RwLock::new(None),
            chain: RwLock::new(None),
            wallet: RwLock::new(None),
        }
    }

    /// Construct from the process-wide configuration; requires the MXE
    /// public key to be configured.
    pub fn from_global_config() -> Result<Self> {
        let cfg = VeilConfig::global();
        let hex_key = cfg.solana.mxe_public_key.as_deref().ok_or_else(|| {
            ProviderError::InvalidFormat("mxe_public_key is not configured".into())
        })?;
        let raw = hex::decode(hex_key)
            .map_err(|e| ProviderError::InvalidFormat(format!("mxe_public_key hex: {e}")))?;
        let mxe_public: [u8; 32] = raw.try_into().map_err(|_| {
            ProviderError::InvalidFormat("mxe_public_key must be 32 bytes".into())
        })?;

        let mut adapter = Self::new(PROGRAMS.cspl_program, mxe_public);
        adapter.timeouts = cfg.timeouts.clone();
        Ok(adapter)
    }

    fn chain(&self) -> Result<Arc<dyn Chain>> {
        self.chain
            .read()
            .expect("chain lock poisoned")
            .clone()
            .ok_or(ProviderError::ProviderNotAvailable(ProviderId::Arcium))
    }

    fn wallet(&self) -> Result<Arc<dyn Wallet>> {
        self.wallet
            .read()
            .expect("wallet lock poisoned")
            .clone()
            .ok_or(ProviderError::WalletNotConnected)
    }

    fn session(&self) -> Result<Arc<MpcSession>> {
        self.session
            .read()
            .expect("session lock poisoned")
            .clone()
            .ok_or(ProviderError::ProviderNotAvailable(ProviderId::Arcium))
    }

    fn parse_recipient(address: &str) -> Result<Pubkey> {
        Pubkey::from_str(address)
            .map_err(|_| ProviderError::RecipientNotFound(address.to_string()))
    }

    fn fee_for(&self, registry: &TokenRegistry, token: &str, amount: f64) -> f64 {
        let fraction = registry
            .fee_table(token, ProviderId::Arcium)
            .map(|t| t.fee_fraction)
            .unwrap_or(DEFAULT_FEE_FRACTION);
        amount * fraction
    }

    async fn submit_and_confirm(&self, instruction: Instruction, op: &str) -> Result<String> {
        let chain = self.chain()?;

        let signature = tokio::time::timeout(
            Duration::from_secs(self.timeouts.rpc_secs),
            chain.send_instruction(instruction),
        )
        .await
        .map_err(|_| ProviderError::Network(format!("{op} submission timed out")))??;

        tokio::time::timeout(
            Duration::from_secs(self.timeouts.confirm_secs),
            chain.confirm_transaction(&signature),
        )
        .await
        .map_err(|_| ProviderError::Timeout(format!("{op} confirmation")))??;

        debug!("arcium {op} confirmed: {signature}");
        Ok(signature)
    }

    fn receipt(&self, token: &str, amount: f64, fee: f64, signature: String) -> OperationReceipt {
        OperationReceipt {
            provider: ProviderId::Arcium,
            token: token.to_string(),
            amount,
            fee,
            signature: Some(signature),
            commitment: None,
            nullifier_hash: None,
            note: None,
        }
    }

    /// Encrypt a set of inputs with the session cipher and hand them to an
    /// opaque computation.
    ///
    /// The template for application-defined confidential computations: the
    /// closure receives ciphertexts only and never sees the shared secret.
    pub fn confidential_compute<T, F>(&self, inputs: &[BigUint], compute: F) -> Result<T>
    where
        F: FnOnce(&[EncryptedValue]) -> Result<T>,
    {
        let session = self.session()?;
        let encrypted: Vec<EncryptedValue> = inputs
            .iter()
            .map(|v| session.cipher.encrypt(v))
            .collect::<std::result::Result<_, _>>()?;
        compute(&encrypted)
    }

    /// The session's public key, shared with the MXE during setup.
    pub fn session_public_key(&self) -> Result<[u8; 32]> {
        Ok(self.session()?.cipher.public_key())
    }
}

#[async_trait]
impl PrivacyProvider for ArciumAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Arcium
    }

    fn display_name(&self) -> &'static str {
        "Arcium MPC"
    }

    fn supported_privacy_levels(&self) -> &[PrivacyLevel] {
        SUPPORTED_LEVELS
    }

    fn supported_tokens(&self) -> TokenSupport {
        TokenSupport::List(vec!["SOL", "USDC", "USDT"])
    }

    async fn initialize(
        &self,
        chain: Arc<dyn Chain>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Result<()> {
        *self.chain.write().expect("chain lock poisoned") = Some(chain);
        *self.wallet.write().expect("wallet lock poisoned") = wallet;

        let mut session = self.session.write().expect("session lock poisoned");
        if session.is_none() {
            let opened = MpcSession::open(self.mxe_public);
            info!("arcium session opened: {}", hex::encode(opened.id));
            *session = Some(Arc::new(opened));
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
    }

    async fn balance(&self, token: &str, address: Option<&str>) -> Result<Balance> {
        let chain = self.chain()?;
        let owner = match address {
            Some(a) => Self::parse_recipient(a)?,
            None => self.wallet()?.pubkey(),
        };
        let amount = chain.get_balance(&owner, token).await?;
        Ok(Balance {
            token: token.to_string(),
            amount,
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

        let wallet = self.wallet()?;
        let session = self.session()?;
        let recipient = Self::parse_recipient(&request.recipient)?;
        let base_units = registry.to_base_units(request.amount, &request.token)?;

        let encrypted = session.cipher.encrypt_for_cspl(base_units)?;

        let mut data = Vec::with_capacity(1 + 32 + 32 + 16 + encrypted.ciphertext.len());
        data.push(OP_TRANSFER);
        data.extend_from_slice(&wallet.pubkey().to_bytes());
        data.extend_from_slice(&recipient.to_bytes());
        data.extend_from_slice(&encrypted.nonce);
        data.extend_from_slice(&encrypted.ciphertext);

        let instruction = Instruction {
            program_id: self.cspl_program,
            accounts: vec![
                AccountMeta::new(wallet.pubkey(), true),
                AccountMeta::new_readonly(recipient, false),
            ],
            data,
        };

        let signature = self.submit_and_confirm(instruction, "transfer").await?;
        let fee = self.fee_for(registry, &request.token, request.amount);
        Ok(self.receipt(&request.token, request.amount, fee, signature))
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

        let wallet = self.wallet()?;
        let base_units = registry.to_base_units(request.amount, &request.token)?;

        // Shield: the amount entering the confidential domain is visible
        let mut data = Vec::with_capacity(1 + 8);
        data.push(OP_SHIELD);
        data.extend_from_slice(&base_units.to_le_bytes());

        let instruction = Instruction {
            program_id: self.cspl_program,
            accounts: vec![AccountMeta::new(wallet.pubkey(), true)],
            data,
        };

        let signature = self.submit_and_confirm(instruction, "shield").await?;
        let fee = self.fee_for(registry, &request.token, request.amount);
        Ok(self.receipt(&request.token, request.amount, fee, signature))
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

        let wallet = self.wallet()?;
        let recipient = Self::parse_recipient(&request.recipient)?;
        let base_units = registry.to_base_units(request.amount, &request.token)?;

        // Unshield: visible amount leaving the confidential domain
        let mut data = Vec::with_capacity(1 + 32 + 8);
        data.push(OP_UNSHIELD);
        data.extend_from_slice(&recipient.to_bytes());
        data.extend_from_slice(&base_units.to_le_bytes());

        let instruction = Instruction {
            program_id: self.cspl_program,
            accounts: vec![
                AccountMeta::new(wallet.pubkey(), true),
                AccountMeta::new(recipient, false),
            ],
            data,
        };

        let signature = self.submit_and_confirm(instruction, "unshield").await?;
        let fee = self.fee_for(registry, &request.token, request.amount);
        Ok(self.receipt(&request.token, request.amount, fee, signature))
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<CostEstimate> {
        Ok(estimate_from_registry(
            TokenRegistry::standard(),
            ProviderId::Arcium,
            &request.token,
            request.amount,
            ESTIMATED_LATENCY_MS,
            DEFAULT_FEE_FRACTION,
        ))
    }
}
