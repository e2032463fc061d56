//! Shared application state and the agent's own boot state machine
//! (spec.md §4.4 "State machine").

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashSet;
use ed25519_dalek::SigningKey;

use pof_chain::ChainClient;
use pof_tee::TeeProvider;
use pof_types::BirthCertificate;

use crate::config::Config;

/// `unborn -> booting -> registering -> (running | aborted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Unborn,
    Booting,
    Registering,
    Running,
    Aborted,
}

impl BootState {
    pub fn as_str(self) -> &'static str {
        match self {
            BootState::Unborn => "unborn",
            BootState::Booting => "booting",
            BootState::Registering => "registering",
            BootState::Running => "running",
            BootState::Aborted => "aborted",
        }
    }
}

/// Everything an axum handler or background task needs. Cloned cheaply
/// (every field is an `Arc` or `Copy`), matching the teacher's `AppState`
/// pattern in `rill-faucet`.
#[derive(Clone)]
pub struct AppState {
    pub config: std::sync::Arc<Config>,
    pub tee: std::sync::Arc<dyn TeeProvider>,
    pub chain: std::sync::Arc<dyn ChainClient>,
    pub http: reqwest::Client,
    pub wallet_key: std::sync::Arc<SigningKey>,
    pub birth_cert: std::sync::Arc<BirthCertificate>,
    pub status: std::sync::Arc<parking_lot::RwLock<BootState>>,
    pub started_at: Instant,
    /// Suppresses double-counting a game payment as a donation (spec.md §5
    /// "gameTxSignatures", agent-local half).
    pub seen_game_tx_signatures: std::sync::Arc<DashSet<String>>,
    /// Monotonic counter used only to give `/collect` idempotency tests
    /// something to assert on; not part of the wire contract.
    pub collect_count: std::sync::Arc<AtomicU64>,
}

impl AppState {
    pub fn wallet_address(&self) -> String {
        self.birth_cert.wallet_address.clone()
    }

    pub fn record_collect(&self) -> u64 {
        self.collect_count.fetch_add(1, Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
