//! Noir ZK Adapter
//!
//! Carries a registry of circuit definitions and delegates witness/proof
//! computation to a compiled-circuit collaborator behind [`CircuitBackend`].
//! Proofs travel in the Groth16 envelope and are checked locally (structure
//! and signal consistency) or on-chain through the verifier program:
//!
//! ```text
//! verify  0x01 | u32 proof_len LE | proof_json | u32 inputs_len LE | inputs_json
//! ```
//!
//! The in-tree [`MockCircuitBackend`] produces well-formed placeholder
//! envelopes; a real prover implements the same trait.

use async_trait::async_trait;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::adapter::{estimate_from_registry, precheck, PrivacyProvider};
use crate::error::{ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProofBundle, ProveRequest, ProviderId, TokenSupport, TransferRequest, WithdrawRequest,
};
use crate::wallet::{Chain, Wallet};
use veilkit_config::{TimeoutConfig, VeilConfig, PROGRAMS};
use veilkit_crypto::{
    deserialize_proof, poseidon_hash, poseidon_hash_many, poseidon_hash_single, serialize_proof,
    FieldElement, Groth16Proof, PublicSignals,
};

const SUPPORTED_LEVELS: &[PrivacyLevel] = &[PrivacyLevel::Shielded, PrivacyLevel::Anonymous];
const ESTIMATED_LATENCY_MS: u64 = 8_000;
const DEFAULT_FEE_FRACTION: f64 = 0.001;

const OP_VERIFY: u8 = 0x01;

/// Named public/private inputs of one circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitDefinition {
    pub public_inputs: Vec<String>,
    pub private_inputs: Vec<String>,
}

impl CircuitDefinition {
    pub fn new(public_inputs: &[&str], private_inputs: &[&str]) -> Self {
        Self {
            public_inputs: public_inputs.iter().map(|s| s.to_string()).collect(),
            private_inputs: private_inputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The compiled-circuit collaborator: computes the witness and proof points.
#[async_trait]
pub trait CircuitBackend: Send + Sync {
    async fn compute_proof(
        &self,
        circuit: &str,
        inputs: &HashMap<String, String>,
        public_inputs: &[String],
    ) -> Result<Groth16Proof>;
}

/// Placeholder backend: well-formed envelopes with random proof points.
///
/// Public signals are copied faithfully, so structural verification and
/// routing behave as with a real prover; only the points are meaningless.
pub struct MockCircuitBackend;

#[async_trait]
impl CircuitBackend for MockCircuitBackend {
    async fn compute_proof(
        &self,
        circuit: &str,
        inputs: &HashMap<String, String>,
        public_inputs: &[String],
    ) -> Result<Groth16Proof> {
        let point = || FieldElement::random().to_decimal();

        let mut signals = PublicSignals::new();
        for name in public_inputs {
            let value = inputs.get(name).ok_or_else(|| ProviderError::ProofGeneration {
                circuit: circuit.to_string(),
                cause: format!("missing public input {name}"),
            })?;
            signals.insert(name.clone(), value.clone());
        }

        Ok(Groth16Proof::new(
            [point(), point(), "1".into()],
            [
                [point(), point()],
                [point(), point()],
                ["1".into(), "0".into()],
            ],
            [point(), point(), "1".into()],
            signals,
        ))
    }
}

struct CircuitEntry {
    definition: CircuitDefinition,
    proving_key: Option<Vec<u8>>,
    verification_key: Option<Vec<u8>>,
}

/// ZK proof-generation adapter.
pub struct NoirAdapter {
    verifier_program: Pubkey,
    timeouts: TimeoutConfig,
    backend: Arc<dyn CircuitBackend>,
    circuits: RwLock<HashMap<String, CircuitEntry>>,
    chain: RwLock<Option<Arc<dyn Chain>>>,
    wallet: RwLock<Option<Arc<dyn Wallet>>>,
    ready: AtomicBool,
}

impl NoirAdapter {
    pub fn new(verifier_program: Pubkey, backend: Arc<dyn CircuitBackend>) -> Self {
        let adapter = Self {
            verifier_program,
            timeouts: TimeoutConfig::default(),
            backend,
            circuits: RwLock::new(HashMap::new()),
            chain: RwLock::new(None),
            wallet: RwLock::new(None),
            ready: AtomicBool::new(false),
        };
        adapter.register_builtin_circuits();
        adapter
    }

    /// Construct from the process-wide configuration with the mock backend.
    pub fn from_global_config() -> Self {
        let mut adapter = Self::new(PROGRAMS.verifier_program, Arc::new(MockCircuitBackend));
        adapter.timeouts = VeilConfig::global().timeouts.clone();
        adapter
    }

    fn register_builtin_circuits(&self) {
        self.register_circuit(
            "private-transfer",
            CircuitDefinition::new(
                &["inputCommitment", "outputCommitment", "nullifierHash"],
                &["amount", "senderSalt", "recipientSalt", "nullifier", "recipient"],
            ),
        );
        self.register_circuit(
            "deposit",
            CircuitDefinition::new(&["commitment"], &["amount", "salt"]),
        );
        self.register_circuit(
            "withdrawal",
            CircuitDefinition::new(
                &["root", "nullifierHash"],
                &["secret", "nullifier", "pathElements", "pathIndices"],
            ),
        );
    }

    /// Add or replace a circuit definition.
    pub fn register_circuit(&self, name: &str, definition: CircuitDefinition) {
        self.circuits
            .write()
            .expect("circuit lock poisoned")
            .insert(
                name.to_string(),
                CircuitEntry {
                    definition,
                    proving_key: None,
                    verification_key: None,
                },
            );
    }

    /// Attach proving/verification keys to a registered circuit.
    pub fn load_circuit_keys(&self, name: &str, proving_key: Vec<u8>, verification_key: Vec<u8>) -> Result<()> {
        let mut circuits = self.circuits.write().expect("circuit lock poisoned");
        let entry = circuits
            .get_mut(name)
            .ok_or_else(|| ProviderError::ProofGeneration {
                circuit: name.to_string(),
                cause: "circuit is not registered".into(),
            })?;
        entry.proving_key = Some(proving_key);
        entry.verification_key = Some(verification_key);
        Ok(())
    }

    fn chain(&self) -> Result<Arc<dyn Chain>> {
        self.chain
            .read()
            .expect("chain lock poisoned")
            .clone()
            .ok_or(ProviderError::ProviderNotAvailable(ProviderId::Noir))
    }

    fn wallet(&self) -> Result<Arc<dyn Wallet>> {
        self.wallet
            .read()
            .expect("wallet lock poisoned")
            .clone()
            .ok_or(ProviderError::WalletNotConnected)
    }

    /// Structural verification against a verification key.
    ///
    /// Checks the envelope (tags, arities, decimal elements), that the key is
    /// non-empty, and that the proof's public signals match `inputs`. Pairing
    /// checks belong to the on-chain verifier.
    pub fn verify_local(
        &self,
        proof: &Groth16Proof,
        inputs: &HashMap<String, String>,
        verification_key: &[u8],
    ) -> Result<bool> {
        if verification_key.is_empty() {
            return Err(ProviderError::ProofVerification(
                "empty verification key".into(),
            ));
        }

        let bytes = serialize_proof(proof)?;
        deserialize_proof(&bytes)
            .map_err(|e| ProviderError::ProofVerification(e.to_string()))?;

        for (name, value) in proof.public_signals.iter() {
            if inputs.get(name).map(String::as_str) != Some(value) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Submit a proof to the on-chain verifier program.
    pub async fn verify_on_chain(&self, proof: &Groth16Proof) -> Result<String> {
        let wallet = self.wallet()?;
        let proof_bytes = serialize_proof(proof)?;
        let inputs_bytes = serde_json::to_vec(&proof.public_signals)
            .map_err(|e| ProviderError::InvalidFormat(format!("inputs encode: {e}")))?;

        let mut data =
            Vec::with_capacity(1 + 4 + proof_bytes.len() + 4 + inputs_bytes.len());
        data.push(OP_VERIFY);
        data.extend_from_slice(&(proof_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&proof_bytes);
        data.extend_from_slice(&(inputs_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&inputs_bytes);

        let instruction = Instruction {
            program_id: self.verifier_program,
            accounts: vec![AccountMeta::new(wallet.pubkey(), true)],
            data,
        };

        let chain = self.chain()?;
        let signature = tokio::time::timeout(
            Duration::from_secs(self.timeouts.rpc_secs),
            chain.send_instruction(instruction),
        )
        .await
        .map_err(|_| ProviderError::Network("proof submission timed out".into()))??;

        tokio::time::timeout(
            Duration::from_secs(self.timeouts.confirm_secs),
            chain.confirm_transaction(&signature),
        )
        .await
        .map_err(|_| ProviderError::Timeout("proof confirmation".into()))??;

        debug!("noir proof verified on-chain: {signature}");
        Ok(signature)
    }

    fn fee_for(&self, registry: &TokenRegistry, token: &str, amount: f64) -> f64 {
        let fraction = registry
            .fee_table(token, ProviderId::Noir)
            .map(|t| t.fee_fraction)
            .unwrap_or(DEFAULT_FEE_FRACTION);
        amount * fraction
    }

    fn amount_field(registry: &TokenRegistry, amount: f64, token: &str) -> Result<FieldElement> {
        // Known tokens scale through the registry; arbitrary assets use a
        // fixed 10^9 scale
        let base_units = if registry.contains(token) {
            registry.to_base_units(amount, token)?
        } else {
            (amount * 1e9).round() as u64
        };
        Ok(FieldElement::from_u64(base_units))
    }
}

#[async_trait]
impl PrivacyProvider for NoirAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Noir
    }

    fn display_name(&self) -> &'static str {
        "Noir ZK Circuits"
    }

    fn supported_privacy_levels(&self) -> &[PrivacyLevel] {
        SUPPORTED_LEVELS
    }

    fn supported_tokens(&self) -> TokenSupport {
        TokenSupport::Any
    }

    async fn initialize(
        &self,
        chain: Arc<dyn Chain>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Result<()> {
        *self.chain.write().expect("chain lock poisoned") = Some(chain);
        *self.wallet.write().expect("wallet lock poisoned") = wallet;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn balance(&self, token: &str, address: Option<&str>) -> Result<Balance> {
        let chain = self.chain()?;
        let owner = match address {
            Some(a) => a
                .parse()
                .map_err(|_| ProviderError::RecipientNotFound(a.to_string()))?,
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

        let amount = Self::amount_field(registry, request.amount, &request.token)?;
        let sender_salt = FieldElement::random();
        let recipient_salt = FieldElement::random();
        let nullifier = FieldElement::random();
        let recipient_field = FieldElement::from_bytes_be(request.recipient.as_bytes());

        let input_commitment = poseidon_hash(amount, sender_salt)?;
        let output_commitment =
            poseidon_hash_many(&[amount, recipient_salt, recipient_field])?;
        let nullifier_hash = poseidon_hash_single(nullifier)?;

        let inputs = HashMap::from([
            ("inputCommitment".to_string(), input_commitment.to_decimal()),
            ("outputCommitment".to_string(), output_commitment.to_decimal()),
            ("nullifierHash".to_string(), nullifier_hash.to_decimal()),
            ("amount".to_string(), amount.to_decimal()),
            ("senderSalt".to_string(), sender_salt.to_decimal()),
            ("recipientSalt".to_string(), recipient_salt.to_decimal()),
            ("nullifier".to_string(), nullifier.to_decimal()),
            ("recipient".to_string(), recipient_field.to_decimal()),
        ]);

        let bundle = self
            .prove(&ProveRequest {
                circuit: "private-transfer".to_string(),
                inputs,
            })
            .await?;
        let signature = self.verify_on_chain(&bundle.proof).await?;

        Ok(OperationReceipt {
            provider: ProviderId::Noir,
            token: request.token.clone(),
            amount: request.amount,
            fee: self.fee_for(registry, &request.token, request.amount),
            signature: Some(signature),
            commitment: Some(output_commitment.to_decimal()),
            nullifier_hash: Some(nullifier_hash.to_decimal()),
            note: None,
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

        let amount = Self::amount_field(registry, request.amount, &request.token)?;
        let salt = FieldElement::random();
        let commitment = poseidon_hash(amount, salt)?;

        let inputs = HashMap::from([
            ("commitment".to_string(), commitment.to_decimal()),
            ("amount".to_string(), amount.to_decimal()),
            ("salt".to_string(), salt.to_decimal()),
        ]);

        let bundle = self
            .prove(&ProveRequest {
                circuit: "deposit".to_string(),
                inputs,
            })
            .await?;
        let signature = self.verify_on_chain(&bundle.proof).await?;

        Ok(OperationReceipt {
            provider: ProviderId::Noir,
            token: request.token.clone(),
            amount: request.amount,
            fee: self.fee_for(registry, &request.token, request.amount),
            signature: Some(signature),
            commitment: Some(commitment.to_decimal()),
            nullifier_hash: None,
            note: None,
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

        let secret = FieldElement::random();
        let nullifier = FieldElement::random();
        let nullifier_hash = poseidon_hash_single(nullifier)?;
        // Degenerate single-note tree: the commitment is its own root
        let root = poseidon_hash(secret, nullifier)?;

        let inputs = HashMap::from([
            ("root".to_string(), root.to_decimal()),
            ("nullifierHash".to_string(), nullifier_hash.to_decimal()),
            ("secret".to_string(), secret.to_decimal()),
            ("nullifier".to_string(), nullifier.to_decimal()),
            ("pathElements".to_string(), String::new()),
            ("pathIndices".to_string(), String::new()),
        ]);

        let bundle = self
            .prove(&ProveRequest {
                circuit: "withdrawal".to_string(),
                inputs,
            })
            .await?;
        let signature = self.verify_on_chain(&bundle.proof).await?;

        Ok(OperationReceipt {
            provider: ProviderId::Noir,
            token: request.token.clone(),
            amount: request.amount,
            fee: self.fee_for(registry, &request.token, request.amount),
            signature: Some(signature),
            commitment: None,
            nullifier_hash: Some(nullifier_hash.to_decimal()),
            note: None,
        })
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<CostEstimate> {
        Ok(estimate_from_registry(
            TokenRegistry::standard(),
            ProviderId::Noir,
            &request.token,
            request.amount,
            ESTIMATED_LATENCY_MS,
            DEFAULT_FEE_FRACTION,
        ))
    }

    async fn prove(&self, request: &ProveRequest) -> Result<ProofBundle> {
        let (definition, verification_key, has_proving_key) = {
            let circuits = self.circuits.read().expect("circuit lock poisoned");
            let entry = circuits
                .get(&request.circuit)
                .ok_or_else(|| ProviderError::ProofGeneration {
                    circuit: request.circuit.clone(),
                    cause: "circuit is not registered".into(),
                })?;
            (
                entry.definition.clone(),
                entry.verification_key.clone(),
                entry.proving_key.is_some(),
            )
        };
        if !has_proving_key {
            debug!(
                "proving {} without a loaded proving key; backend supplies its own",
                request.circuit
            );
        }

        for name in definition
            .public_inputs
            .iter()
            .chain(definition.private_inputs.iter())
        {
            if !request.inputs.contains_key(name) {
                return Err(ProviderError::ProofGeneration {
                    circuit: request.circuit.clone(),
                    cause: format!("missing input {name}"),
                });
            }
        }

        let proof = tokio::time::timeout(
            Duration::from_secs(self.timeouts.prove_secs),
            self.backend
                .compute_proof(&request.circuit, &request.inputs, &definition.public_inputs),
        )
        .await
        .map_err(|_| ProviderError::Timeout("proof generation".into()))??;

        Ok(ProofBundle {
            proof,
            verification_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> NoirAdapter {
        NoirAdapter::new(Pubkey::new_unique(), Arc::new(MockCircuitBackend))
    }

    #[tokio::test]
    async fn test_prove_unknown_circuit() {
        let err = adapter()
            .prove(&ProveRequest {
                circuit: "nonexistent".into(),
                inputs: HashMap::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ProofGeneration { .. }));
    }

    #[tokio::test]
    async fn test_prove_missing_input() {
        let err = adapter()
            .prove(&ProveRequest {
                circuit: "deposit".into(),
                inputs: HashMap::from([("commitment".to_string(), "1".to_string())]),
            })
            .await
            .unwrap_err();
        match err {
            ProviderError::ProofGeneration { cause, .. } => {
                assert!(cause.contains("missing input"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_prove_and_verify_local() {
        let adapter = adapter();
        adapter
            .load_circuit_keys("deposit", vec![1, 2, 3], vec![4, 5, 6])
            .unwrap();

        let inputs = HashMap::from([
            ("commitment".to_string(), "123".to_string()),
            ("amount".to_string(), "1000".to_string()),
            ("salt".to_string(), "7".to_string()),
        ]);
        let bundle = adapter
            .prove(&ProveRequest {
                circuit: "deposit".into(),
                inputs: inputs.clone(),
            })
            .await
            .unwrap();

        assert_eq!(bundle.proof.public_signals.get("commitment"), Some("123"));
        let vk = bundle.verification_key.clone().unwrap();
        assert!(adapter.verify_local(&bundle.proof, &inputs, &vk).unwrap());

        // Mismatched inputs fail
        let mut wrong = inputs.clone();
        wrong.insert("commitment".to_string(), "999".to_string());
        assert!(!adapter.verify_local(&bundle.proof, &wrong, &vk).unwrap());

        // Empty key is an error, not a false
        assert!(adapter.verify_local(&bundle.proof, &inputs, &[]).is_err());
    }

    #[test]
    fn test_register_custom_circuit() {
        let adapter = adapter();
        adapter.register_circuit(
            "membership",
            CircuitDefinition::new(&["root"], &["leaf", "path"]),
        );
        assert!(adapter
            .load_circuit_keys("membership", vec![1], vec![2])
            .is_ok());
        assert!(adapter.load_circuit_keys("unknown", vec![1], vec![2]).is_err());
    }

    #[test]
    fn test_capabilities() {
        let adapter = adapter();
        assert_eq!(adapter.provider_id(), ProviderId::Noir);
        assert!(matches!(adapter.supported_tokens(), TokenSupport::Any));
        assert!(adapter
            .supported_privacy_levels()
            .contains(&PrivacyLevel::Shielded));
    }
}
