//! Shared Coordinator application state (spec.md §9 "Global state").

use std::sync::Arc;

use dashmap::DashSet;
use ed25519_dalek::SigningKey;
use parking_lot::RwLock;

use pof_attestation::{Allowlist, FallbackQuoteParser, HttpQuoteParser, LocalOffsetParser, QuoteParser};
use pof_chain::ChainClient;
use pof_tee::TeeProvider;
use pof_types::{BirthCertificate, GameResult};

use crate::config::Config;
use crate::events::EventBus;
use crate::pool::Pool;
use crate::topup::TopupThrottle;
use crate::vm_inventory::VmInventory;

/// Everything an axum handler or background task needs, cloned cheaply
/// (every field is an `Arc`), matching `pof-agent::state::AppState`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Arc<RwLock<Pool>>,
    /// spec.md §3 "FundedWallets": prevents double-funding a re-registering
    /// wallet. Monotonically growing (spec.md §8).
    pub funded_wallets: Arc<DashSet<String>>,
    /// Append-only game log (spec.md §3 "GameResult").
    pub game_log: Arc<RwLock<Vec<GameResult>>>,
    pub allowlist: Arc<Allowlist>,
    pub quote_parser: Arc<dyn QuoteParser>,
    pub vm_inventory: Arc<dyn VmInventory>,
    pub events: Arc<EventBus>,
    pub chain: Arc<dyn ChainClient>,
    /// The Coordinator's own TEE handle, used by `/api/attestation` to
    /// serve fresh values rather than the birth certificate's frozen ones
    /// (spec.md §4.4, mirrored for the Coordinator per SPEC_FULL.md §6).
    pub tee: Arc<dyn TeeProvider>,
    pub http: reqwest::Client,
    pub wallet_key: Arc<SigningKey>,
    pub birth_cert: Arc<BirthCertificate>,
    pub topup_throttle: Arc<TopupThrottle>,
}

impl AppState {
    pub fn wallet_address(&self) -> String {
        self.birth_cert.wallet_address.clone()
    }
}

/// Build the [`QuoteParser`] named by `config.quote_parser_url` (spec.md
/// §4.3 rule 2, §7 "external parser unavailable" fallback).
pub fn build_quote_parser(config: &Config) -> Arc<dyn QuoteParser> {
    match &config.quote_parser_url {
        Some(url) => Arc::new(FallbackQuoteParser::new(HttpQuoteParser::new(url.clone()))),
        None => Arc::new(LocalOffsetParser),
    }
}
