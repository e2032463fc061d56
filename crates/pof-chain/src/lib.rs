//! Blockchain settlement and the x402 payment handshake for ProofOfFlip.
//!
//! [`ChainClient`] is the trait every settlement caller (the agent's payer
//! role, the Coordinator's initial-funding and gas top-up flows, the
//! donation watcher) depends on; [`mock::MockChainClient`] backs every test
//! and local deployment, [`solana::SolanaChainClient`] the real RPC.

pub mod client;
pub mod error;
pub mod mock;
pub mod solana;
pub mod x402;

pub use client::{ChainClient, ChainTransaction};
pub use error::ChainError;
pub use mock::MockChainClient;
pub use solana::SolanaChainClient;
pub use x402::{X402PaymentProof, X402PaymentRequirements};
