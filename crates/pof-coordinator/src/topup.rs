//! Coordinator-side gas top-up (spec.md §4.4 last paragraph): an agent
//! asks for a native-token top-up when its own SOL balance runs low; the
//! Coordinator re-checks on-chain state itself and throttles repeats.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use pof_chain::ChainClient;
use pof_types::GAME_STAKE;

/// Per-wallet last-granted timestamps, so a single agent can't drain the
/// Coordinator's gas reserve by spamming `/api/topup-sol`.
#[derive(Default)]
pub struct TopupThrottle {
    last_granted: DashMap<String, Instant>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TopupOutcome {
    Granted { signature: String },
    Throttled,
    AlreadyFunded,
}

impl TopupThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a gas-only top-up to `wallet_address` unless it was already
    /// granted one within `throttle`, or the wallet's on-chain balance is
    /// already healthy.
    pub async fn maybe_grant(
        &self,
        chain: &dyn ChainClient,
        coordinator_secret_key: &[u8; 32],
        wallet_address: &str,
        lamports: u64,
        threshold_lamports: u64,
        throttle: Duration,
    ) -> Result<TopupOutcome, pof_chain::ChainError> {
        if let Some(last) = self.last_granted.get(wallet_address) {
            if last.elapsed() < throttle {
                return Ok(TopupOutcome::Throttled);
            }
        }

        let current_balance = chain.native_balance(wallet_address).await?;
        if current_balance >= threshold_lamports {
            return Ok(TopupOutcome::AlreadyFunded);
        }

        let signature = chain
            .transfer_native(coordinator_secret_key, wallet_address, lamports)
            .await?;
        self.last_granted
            .insert(wallet_address.to_string(), Instant::now());
        Ok(TopupOutcome::Granted { signature })
    }
}

/// Initial funding granted to a newly-admitted agent (spec.md §4.5 step 6):
/// native gas plus one unit of stablecoin (`INITIAL_FUNDING`).
pub async fn fund_new_agent(
    chain: &dyn ChainClient,
    coordinator_secret_key: &[u8; 32],
    wallet_address: &str,
    native_lamports: u64,
    token_amount: u64,
) -> Result<(), pof_chain::ChainError> {
    chain
        .transfer_native(coordinator_secret_key, wallet_address, native_lamports)
        .await?;
    chain
        .transfer_token(coordinator_secret_key, wallet_address, token_amount)
        .await?;
    Ok(())
}

/// Stake floor below which an agent cannot be matched — re-exported here so
/// callers reading top-up logic don't need to reach into `pof_types`
/// directly for the one constant this module's tests assert against.
pub const MIN_MATCH_STAKE: u64 = GAME_STAKE;
