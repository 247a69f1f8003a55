//! Shared test doubles for the wallet and chain capabilities.
#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use veilkit_providers::{Chain, ProviderError, Wallet};

/// In-memory wallet backed by a throwaway keypair.
pub struct MockWallet {
    keypair: Keypair,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        Ok(self.keypair.sign_message(message).as_ref().to_vec())
    }
}

/// In-memory chain: records instructions, simulates PDA creation for pool
/// withdrawals, and serves configurable balances.
pub struct MockChain {
    pub sent: Mutex<Vec<Instruction>>,
    pub existing_accounts: Mutex<HashSet<Pubkey>>,
    pub balances: Mutex<HashMap<String, f64>>,
    counter: AtomicU64,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            existing_accounts: Mutex::new(HashSet::new()),
            balances: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn instruction(&self, index: usize) -> Instruction {
        self.sent.lock().unwrap()[index].clone()
    }

    pub fn set_balance(&self, token: &str, amount: f64) {
        self.balances.lock().unwrap().insert(token.to_string(), amount);
    }
}

#[async_trait]
impl Chain for MockChain {
    async fn send_instruction(&self, instruction: Instruction) -> Result<String, ProviderError> {
        // Pool withdrawals (op 0x02 with [wallet, pool, nullifier] accounts)
        // create the nullifier PDA, which is what blocks replays on-chain
        if instruction.data.first() == Some(&0x02) && instruction.accounts.len() == 3 {
            self.existing_accounts
                .lock()
                .unwrap()
                .insert(instruction.accounts[2].pubkey);
        }

        self.sent.lock().unwrap().push(instruction);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock-signature-{n}"))
    }

    async fn confirm_transaction(&self, _signature: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn get_balance(&self, _owner: &Pubkey, token: &str) -> Result<f64, ProviderError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or(100.0))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, ProviderError> {
        Ok(self.existing_accounts.lock().unwrap().contains(address))
    }
}
