//! PrivacyCash Pool Adapter
//!
//! Note-based shielded pool. Deposits publish a commitment and hand the
//! caller an encoded note; withdrawals consume a note by publishing its
//! nullifier hash with a Merkle proof against a known root.
//!
//! Instruction layouts:
//!
//! ```text
//! deposit   0x01 | commitment(32) | amount u64 LE         at PDA ["pool", mint]
//! withdraw  0x02 | nullifier_hash(32) | root(32)
//!                | u32 proof_len LE | proof_bytes         at PDAs ["pool", mint],
//!                                                         ["nullifier", nullifier_hash]
//! ```
//!
//! The unspent-note map is exclusive per-instance state, mutated only after
//! on-chain confirmation; a cancelled or failed withdrawal keeps the note.

use async_trait::async_trait;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::adapter::{estimate_from_registry, precheck, PrivacyProvider};
use crate::adapters::noir::CircuitBackend;
use crate::error::{ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProviderId, TokenSupport, TransferRequest, WithdrawRequest,
};
use crate::wallet::{Chain, Wallet};
use veilkit_config::{TimeoutConfig, VeilConfig, PROGRAMS};
use veilkit_crypto::serialize_proof;
use veilkit_privacy::{
    decode_note, encode_note, generate_deposit_note, verify_note, DepositNote, MerkleProof,
    MerkleTree,
};

const SUPPORTED_LEVELS: &[PrivacyLevel] = &[PrivacyLevel::Shielded, PrivacyLevel::Anonymous];
const ESTIMATED_LATENCY_MS: u64 = 15_000;
const DEFAULT_FEE_FRACTION: f64 = 0.003;

const OP_DEPOSIT: u8 = 0x01;
const OP_WITHDRAW: u8 = 0x02;

/// Withdrawal progression; only `Confirmed` removes the local note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawStage {
    Ready,
    ProofFetched,
    ProofGenerated,
    Submitted,
    Confirmed,
    Failed,
}

/// Note-based shielded pool adapter.
pub struct PrivacyCashAdapter {
    pool_program: Pubkey,
    indexer_url: Option<String>,
    http: reqwest::Client,
    timeouts: TimeoutConfig,
    backend: Arc<dyn CircuitBackend>,
    /// Unspent notes keyed by decimal commitment.
    notes: Mutex<HashMap<String, DepositNote>>,
    chain: RwLock<Option<Arc<dyn Chain>>>,
    wallet: RwLock<Option<Arc<dyn Wallet>>>,
}

impl PrivacyCashAdapter {
    pub fn new(
        pool_program: Pubkey,
        indexer_url: Option<String>,
        backend: Arc<dyn CircuitBackend>,
    ) -> Self {
        let timeouts = TimeoutConfig::default();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.api_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            pool_program,
            indexer_url,
            http,
            timeouts,
            backend,
            notes: Mutex::new(HashMap::new()),
            chain: RwLock::new(None),
            wallet: RwLock::new(None),
        }
    }

    /// Construct from the process-wide configuration.
    pub fn from_global_config(backend: Arc<dyn CircuitBackend>) -> Self {
        let cfg = VeilConfig::global();
        let mut adapter = Self::new(
            PROGRAMS.pool_program,
            Some(cfg.indexer.base_url.clone()),
            backend,
        );
        adapter.timeouts = cfg.timeouts.clone();
        adapter
    }

    fn chain(&self) -> Result<Arc<dyn Chain>> {
        self.chain
            .read()
            .expect("chain lock poisoned")
            .clone()
            .ok_or(ProviderError::ProviderNotAvailable(ProviderId::PrivacyCash))
    }

    fn wallet(&self) -> Result<Arc<dyn Wallet>> {
        self.wallet
            .read()
            .expect("wallet lock poisoned")
            .clone()
            .ok_or(ProviderError::WalletNotConnected)
    }

    fn pool_pda(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[b"pool", mint.as_ref()], &self.pool_program).0
    }

    fn nullifier_pda(&self, nullifier_hash: &[u8; 32]) -> Pubkey {
        Pubkey::find_program_address(&[b"nullifier", nullifier_hash], &self.pool_program).0
    }

    fn fee_for(&self, registry: &TokenRegistry, token: &str, amount: f64) -> f64 {
        let fraction = registry
            .fee_table(token, ProviderId::PrivacyCash)
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

        Ok(signature)
    }

    /// Fetch the note's Merkle proof from the indexer, falling back to a
    /// locally simulated single-leaf proof when no indexer is reachable.
    async fn fetch_merkle_proof(&self, note: &DepositNote) -> Result<MerkleProof> {
        if let Some(base) = &self.indexer_url {
            let url = format!("{base}/merkle/proof/{}", note.commitment.to_decimal());
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<MerkleProof>().await {
                        Ok(proof) => return Ok(proof),
                        Err(e) => warn!("indexer proof decode failed: {e}, simulating locally"),
                    }
                }
                Ok(response) => {
                    warn!("indexer returned {}, simulating locally", response.status())
                }
                Err(e) => warn!("indexer unreachable: {e}, simulating locally"),
            }
        }

        let mut tree = MerkleTree::default();
        let index = tree.insert(note.commitment)?;
        Ok(tree.generate_proof(index)?)
    }

    async fn prove_withdrawal(&self, note: &DepositNote, proof: &MerkleProof) -> Result<Vec<u8>> {
        let path_elements = proof
            .path_elements
            .iter()
            .map(|e| e.to_decimal())
            .collect::<Vec<_>>()
            .join(",");
        let path_indices = proof
            .path_indices
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let inputs = HashMap::from([
            ("root".to_string(), proof.root.to_decimal()),
            ("nullifierHash".to_string(), note.nullifier_hash.to_decimal()),
            ("secret".to_string(), note.secret.to_decimal()),
            ("nullifier".to_string(), note.nullifier.to_decimal()),
            ("pathElements".to_string(), path_elements),
            ("pathIndices".to_string(), path_indices),
        ]);

        let groth16 = tokio::time::timeout(
            Duration::from_secs(self.timeouts.prove_secs),
            self.backend.compute_proof(
                "withdrawal",
                &inputs,
                &["root".to_string(), "nullifierHash".to_string()],
            ),
        )
        .await
        .map_err(|_| ProviderError::Timeout("withdrawal proof generation".into()))??;

        Ok(serialize_proof(&groth16)?)
    }

    /// Unspent notes held by this instance, for caller-side persistence.
    pub fn export_notes(&self) -> Vec<DepositNote> {
        self.notes
            .lock()
            .expect("note lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Import a previously exported note string into the unspent set.
    pub fn import_note(&self, note_string: &str) -> Result<()> {
        let note = decode_note(note_string)?;
        if !verify_note(&note) {
            return Err(ProviderError::InvalidFormat(
                "note failed verification".into(),
            ));
        }
        self.notes
            .lock()
            .expect("note lock poisoned")
            .insert(note.commitment.to_decimal(), note);
        Ok(())
    }

    /// Whether a note with this decimal commitment is still unspent locally.
    pub fn has_note(&self, commitment: &str) -> bool {
        self.notes
            .lock()
            .expect("note lock poisoned")
            .contains_key(commitment)
    }
}

#[async_trait]
impl PrivacyProvider for PrivacyCashAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::PrivacyCash
    }

    fn display_name(&self) -> &'static str {
        "Privacy Cash Pool"
    }

    fn supported_privacy_levels(&self) -> &[PrivacyLevel] {
        SUPPORTED_LEVELS
    }

    fn supported_tokens(&self) -> TokenSupport {
        TokenSupport::List(vec!["SOL", "USDC"])
    }

    async fn initialize(
        &self,
        chain: Arc<dyn Chain>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Result<()> {
        *self.chain.write().expect("chain lock poisoned") = Some(chain);
        *self.wallet.write().expect("wallet lock poisoned") = wallet;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.chain.read().expect("chain lock poisoned").is_some()
    }

    /// Pool balance is the sum of locally held unspent notes.
    async fn balance(&self, token: &str, _address: Option<&str>) -> Result<Balance> {
        let total = self
            .notes
            .lock()
            .expect("note lock poisoned")
            .values()
            .filter(|n| n.token.eq_ignore_ascii_case(token))
            .map(|n| n.amount)
            .sum();
        Ok(Balance {
            token: token.to_string(),
            amount: total,
        })
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
        let info = registry.token(&request.token)?;
        let base_units = registry.to_base_units(request.amount, &request.token)?;

        let note = generate_deposit_note(request.amount, &request.token)?;
        debug!(
            "pool deposit: {} {} commitment {}",
            request.amount,
            request.token,
            note.commitment.to_decimal()
        );

        let mut data = Vec::with_capacity(1 + 32 + 8);
        data.push(OP_DEPOSIT);
        data.extend_from_slice(&note.commitment.to_bytes_be());
        data.extend_from_slice(&base_units.to_le_bytes());

        let instruction = Instruction {
            program_id: self.pool_program,
            accounts: vec![
                AccountMeta::new(wallet.pubkey(), true),
                AccountMeta::new(self.pool_pda(&info.mint), false),
            ],
            data,
        };

        let signature = self.submit_and_confirm(instruction, "deposit").await?;

        // Only a confirmed deposit enters the unspent set
        let encoded = encode_note(&note)?;
        let commitment = note.commitment.to_decimal();
        self.notes
            .lock()
            .expect("note lock poisoned")
            .insert(commitment.clone(), note);
        info!("pool deposit confirmed: {signature}");

        Ok(OperationReceipt {
            provider: ProviderId::PrivacyCash,
            token: request.token.clone(),
            amount: request.amount,
            fee: self.fee_for(registry, &request.token, request.amount),
            signature: Some(signature),
            commitment: Some(commitment),
            nullifier_hash: None,
            note: Some(encoded),
        })
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

        let note_string = request.note.as_deref().ok_or_else(|| {
            ProviderError::InvalidFormat("pool withdrawal requires a deposit note".into())
        })?;
        let note = decode_note(note_string)?;
        if !verify_note(&note) {
            return Err(ProviderError::InvalidFormat(
                "note failed verification".into(),
            ));
        }
        if !note.token.eq_ignore_ascii_case(&request.token) {
            return Err(ProviderError::InvalidFormat(format!(
                "note is denominated in {}, not {}",
                note.token, request.token
            )));
        }

        let wallet = self.wallet()?;
        let chain = self.chain()?;
        let info = registry.token(&request.token)?;
        let nullifier_hash_bytes = note.nullifier_hash.to_bytes_be();

        let mut stage = WithdrawStage::Ready;
        debug!("withdraw stage: {stage:?}");

        // Replay protection: the nullifier PDA exists once the note is spent
        let nullifier_pda = self.nullifier_pda(&nullifier_hash_bytes);
        if chain.account_exists(&nullifier_pda).await? {
            stage = WithdrawStage::Failed;
            warn!("withdraw rejected at {stage:?}: nullifier already spent");
            return Err(ProviderError::Transaction {
                cause: "nullifier already spent".into(),
                signature: None,
            });
        }

        let merkle_proof = self.fetch_merkle_proof(&note).await?;
        stage = WithdrawStage::ProofFetched;
        debug!("withdraw stage: {stage:?}");

        let proof_bytes = self.prove_withdrawal(&note, &merkle_proof).await?;
        stage = WithdrawStage::ProofGenerated;
        debug!("withdraw stage: {stage:?}");

        let mut data = Vec::with_capacity(1 + 32 + 32 + 4 + proof_bytes.len());
        data.push(OP_WITHDRAW);
        data.extend_from_slice(&nullifier_hash_bytes);
        data.extend_from_slice(&merkle_proof.root.to_bytes_be());
        data.extend_from_slice(&(proof_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&proof_bytes);

        let instruction = Instruction {
            program_id: self.pool_program,
            accounts: vec![
                AccountMeta::new(wallet.pubkey(), true),
                AccountMeta::new(self.pool_pda(&info.mint), false),
                AccountMeta::new(nullifier_pda, false),
            ],
            data,
        };

        let signature = match self.submit_and_confirm(instruction, "withdraw").await {
            Ok(signature) => signature,
            Err(err) => {
                stage = WithdrawStage::Failed;
                warn!("withdraw failed after {stage:?}: {err}");
                return Err(err);
            }
        };
        stage = WithdrawStage::Submitted;
        debug!("withdraw stage: {stage:?}");

        // Confirmed: the note leaves the unspent set
        self.notes
            .lock()
            .expect("note lock poisoned")
            .remove(&note.commitment.to_decimal());
        stage = WithdrawStage::Confirmed;
        info!("pool withdraw {stage:?}: {signature}");

        Ok(OperationReceipt {
            provider: ProviderId::PrivacyCash,
            token: request.token.clone(),
            amount: note.amount,
            fee: self.fee_for(registry, &request.token, note.amount),
            signature: Some(signature),
            commitment: None,
            nullifier_hash: Some(note.nullifier_hash.to_decimal()),
            note: None,
        })
    }

    /// A pool transfer is a deposit followed by a withdrawal of the fresh
    /// note to the recipient; both legs pay their own fee.
    async fn transfer(&self, request: &TransferRequest) -> Result<OperationReceipt> {
        let deposit_receipt = self
            .deposit(&DepositRequest {
                token: request.token.clone(),
                amount: request.amount,
                privacy_level: request.privacy_level,
            })
            .await?;

        let note = deposit_receipt.note.clone().ok_or_else(|| {
            ProviderError::Transaction {
                cause: "deposit produced no note".into(),
                signature: deposit_receipt.signature.clone(),
            }
        })?;

        let withdraw_receipt = self
            .withdraw(&WithdrawRequest {
                token: request.token.clone(),
                amount: request.amount,
                recipient: request.recipient.clone(),
                privacy_level: request.privacy_level,
                note: Some(note),
            })
            .await?;

        Ok(OperationReceipt {
            provider: ProviderId::PrivacyCash,
            token: request.token.clone(),
            amount: request.amount,
            fee: deposit_receipt.fee + withdraw_receipt.fee,
            signature: withdraw_receipt.signature,
            commitment: deposit_receipt.commitment,
            nullifier_hash: withdraw_receipt.nullifier_hash,
            note: None,
        })
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<CostEstimate> {
        Ok(estimate_from_registry(
            TokenRegistry::standard(),
            ProviderId::PrivacyCash,
            &request.token,
            request.amount,
            ESTIMATED_LATENCY_MS,
            DEFAULT_FEE_FRACTION,
        ))
    }
}
