//! ProofOfFlip Coordinator binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use pof_chain::{ChainClient, MockChainClient, SolanaChainClient};
use pof_coordinator::config::ChainProviderKind;
use pof_coordinator::state::{build_quote_parser, AppState};
use pof_coordinator::{config, http, identity, matchmaker, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env().context("failed to load coordinator configuration")?;
    info!(
        tee_provider = ?cfg.tee_provider,
        bind_addr = %cfg.bind_addr,
        max_active = cfg.max_active,
        "booting ProofOfFlip coordinator"
    );

    let identity = identity::boot(&cfg).await.context("identity boot failed")?;
    info!(
        wallet_address = %identity.birth_cert.wallet_address,
        rtmr3 = %identity.birth_cert.rtmr3,
        "coordinator identity ready"
    );

    let chain: Arc<dyn ChainClient> = match cfg.chain_provider {
        ChainProviderKind::Mock => Arc::new(MockChainClient::new()),
        ChainProviderKind::Solana => Arc::new(
            SolanaChainClient::new(&cfg.rpc_url, &cfg.token_mint)
                .context("failed to initialise Solana RPC client")?,
        ),
    };
    chain
        .ensure_associated_token_account(&identity.birth_cert.wallet_address)
        .await
        .context("failed to ensure the coordinator's associated token account")?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let config = Arc::new(cfg);
    let quote_parser = build_quote_parser(&config);
    let allowlist = Arc::new(config::build_allowlist(&config.allowlist_mode));

    let state = AppState {
        config: config.clone(),
        pool: Arc::new(parking_lot::RwLock::new(pof_coordinator::pool::Pool::new())),
        funded_wallets: Arc::new(dashmap::DashSet::new()),
        game_log: Arc::new(parking_lot::RwLock::new(Vec::new())),
        allowlist,
        quote_parser,
        vm_inventory: Arc::new(pof_coordinator::vm_inventory::AlwaysPresent),
        events: Arc::new(pof_coordinator::events::EventBus::new()),
        chain,
        tee: identity.tee.clone(),
        http: http_client,
        wallet_key: Arc::new(identity.wallet_key),
        birth_cert: Arc::new(identity.birth_cert),
        topup_throttle: Arc::new(pof_coordinator::topup::TopupThrottle::new()),
    };

    tokio::spawn(run_match_loop(state.clone()));

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(bind_addr = %config.bind_addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}

/// Drives [`matchmaker::tick`] every `MATCH_INTERVAL_MS` (spec.md §4.5
/// "A periodic ticker every MATCH_INTERVAL"). A tick that overruns the
/// interval does not reschedule — `tokio::time::interval`'s default
/// `Burst` behaviour is replaced with a plain sleep-then-tick loop so the
/// next tick always starts after the previous one completes (spec.md §5
/// "At-most-one match per pair per tick").
async fn run_match_loop(state: AppState) {
    let interval = Duration::from_millis(pof_types::MATCH_INTERVAL_MS);
    loop {
        tokio::time::sleep(interval).await;
        matchmaker::tick(&state).await;
    }
}
