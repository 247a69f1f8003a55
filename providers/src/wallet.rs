//! Wallet and Chain Capabilities
//!
//! The toolkit never holds keys or an RPC connection itself. Applications
//! inject these two collaborators at `initialize`; adapters borrow them for
//! signing and submission and make no assumptions beyond this surface.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;

/// Message-signing capability.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// The wallet's public key.
    fn pubkey(&self) -> Pubkey;

    /// Base58 address form of the public key.
    fn address(&self) -> String {
        self.pubkey().to_string()
    }

    /// Sign arbitrary bytes; returns the raw signature.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Transaction submission capability.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Submit a single-instruction transaction; returns the signature.
    async fn send_instruction(&self, instruction: Instruction) -> Result<String>;

    /// Wait until a submitted transaction is finalized.
    async fn confirm_transaction(&self, signature: &str) -> Result<()>;

    /// Spendable balance of `token` for `owner`, in display units.
    async fn get_balance(&self, owner: &Pubkey, token: &str) -> Result<f64>;

    /// Whether an account exists at `address` (PDA probes).
    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;
}
