//! ProofOfFlip agent binary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use dashmap::DashSet;
use tracing::info;

use pof_agent::config::ChainProviderKind;
use pof_agent::state::{AppState, BootState};
use pof_agent::{boot, donation, http, registration, topup, Config};
use pof_chain::{ChainClient, MockChainClient, SolanaChainClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load agent configuration")?;

    info!(
        agent_name = %config.agent_name,
        tee_provider = ?config.tee_provider,
        coordinator_url = %config.coordinator_url,
        "booting ProofOfFlip agent"
    );

    let status = Arc::new(parking_lot::RwLock::new(BootState::Booting));

    let booted = boot::boot(&config).await.context("identity boot failed")?;
    info!(
        wallet_address = %booted.birth_cert.wallet_address,
        rtmr3 = %booted.birth_cert.rtmr3,
        "identity ready"
    );

    let chain: Arc<dyn ChainClient> = match config.chain_provider {
        ChainProviderKind::Mock => Arc::new(MockChainClient::new()),
        ChainProviderKind::Solana => Arc::new(
            SolanaChainClient::new(&config.rpc_url, &config.token_mint)
                .context("failed to initialise Solana RPC client")?,
        ),
    };

    boot::ensure_token_account(chain.as_ref(), &booted.birth_cert.wallet_address)
        .await
        .context("failed to ensure the wallet's associated token account")?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let endpoint = config
        .endpoint_override
        .clone()
        .unwrap_or_else(|| format!("http://0.0.0.0:{}", bind_port(&config.bind_addr)));

    *status.write() = BootState::Registering;
    let registration = registration::register_with_retries(
        &http_client,
        &config.coordinator_url,
        &booted.birth_cert,
        &booted.wallet_key,
        &endpoint,
    )
    .await
    .context("registration with the Coordinator failed")?;

    if !registration.success {
        *status.write() = BootState::Aborted;
        anyhow::bail!("Coordinator rejected registration: {}", registration.message);
    }
    info!(message = %registration.message, "registered with Coordinator");
    *status.write() = BootState::Running;

    let state = AppState {
        config: Arc::new(config.clone()),
        tee: booted.tee.clone(),
        chain: chain.clone(),
        http: http_client.clone(),
        wallet_key: Arc::new(booted.wallet_key.clone()),
        birth_cert: Arc::new(booted.birth_cert.clone()),
        status: status.clone(),
        started_at: Instant::now(),
        seen_game_tx_signatures: Arc::new(DashSet::new()),
        collect_count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
    };

    tokio::spawn(donation::run(
        http_client.clone(),
        chain.clone(),
        config.coordinator_url.clone(),
        config.agent_name.clone(),
        booted.birth_cert.wallet_address.clone(),
        state.seen_game_tx_signatures.clone(),
    ));

    tokio::spawn(topup::run(
        http_client.clone(),
        chain.clone(),
        config.coordinator_url.clone(),
        config.agent_name.clone(),
        booted.birth_cert.wallet_address.clone(),
        config.sol_topup_threshold_lamports,
    ));

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(bind_addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}

fn bind_port(bind_addr: &str) -> &str {
    bind_addr.rsplit(':').next().unwrap_or("80")
}
