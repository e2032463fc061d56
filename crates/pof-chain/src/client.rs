//! The [`ChainClient`] trait: the narrow slice of SPL-token-transfer and
//! confirmation primitives ProofOfFlip needs (spec.md §6 "External
//! Interfaces"). The blockchain RPC itself is an external collaborator
//! (spec.md §1); this trait is its interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// A transaction observed in a wallet's token-account history, as returned
/// by [`ChainClient::recent_token_transactions`]. Used by the agent-side
/// donation watcher (spec.md §4.5 "Donation ingestion") to discriminate
/// donations from recorded game payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainTransaction {
    pub signature: String,
    pub amount: u64,
    /// The other party to the transfer, if determinable from the parsed
    /// instruction.
    pub counterparty: Option<String>,
}

/// SPL stablecoin transfer + confirmation primitives, and the native-token
/// reads/transfers needed for gas top-up (spec.md §4.4 "Gas top-up").
///
/// Implementations: [`crate::mock::MockChainClient`] (deterministic,
/// in-memory, used by every test) and [`crate::solana::SolanaChainClient`]
/// (the real RPC-backed implementation).
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native-token (SOL) balance, in lamports.
    async fn native_balance(&self, wallet: &str) -> Result<u64, ChainError>;

    /// Stablecoin balance, in base units (spec.md §6: 6-decimal USDC).
    async fn token_balance(&self, wallet: &str) -> Result<u64, ChainError>;

    /// Ensure `owner`'s associated token account exists for the configured
    /// mint, creating it (payer: `owner`) if absent. Returns the ATA
    /// address.
    async fn ensure_associated_token_account(&self, owner: &str) -> Result<String, ChainError>;

    /// Transfer exactly `amount` base units of the stablecoin from the
    /// wallet owning `from_secret_key` to `to_wallet`, confirming at the
    /// "confirmed" commitment. Returns the transaction signature.
    async fn transfer_token(
        &self,
        from_secret_key: &[u8; 32],
        to_wallet: &str,
        amount: u64,
    ) -> Result<String, ChainError>;

    /// A gas-only native-token transfer (Coordinator-side top-up, spec.md
    /// §4.4 last paragraph).
    async fn transfer_native(
        &self,
        from_secret_key: &[u8; 32],
        to_wallet: &str,
        lamports: u64,
    ) -> Result<String, ChainError>;

    /// Recent token-account transaction history for `wallet`, newest first.
    /// Used by the donation watcher's 15s poll (spec.md §4.5).
    async fn recent_token_transactions(
        &self,
        wallet: &str,
    ) -> Result<Vec<ChainTransaction>, ChainError>;
}
