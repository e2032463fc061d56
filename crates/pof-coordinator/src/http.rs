//! Axum router and handlers for the Coordinator's HTTP surface (spec.md
//! §4.5 "Other Coordinator endpoints", §6 "SSE event envelope").

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use futures::StreamExt;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use pof_types::AgentStatus;

use crate::state::AppState;
use crate::wire::{
    AgentMessage, AgentSummary, DonationConfirmed, GenericAck, RegisterRequest, StatsResponse,
    TopupSolRequest,
};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/register", post(register))
        .route("/api/agents", get(agents))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/games", get(games))
        .route("/api/stats", get(stats))
        .route("/api/attestation", get(attestation))
        .route("/api/birth-cert", get(birth_cert))
        .route("/api/events", get(events))
        .route("/api/topup-sol", post(topup_sol))
        .route("/api/agent-message", post(agent_message))
        .route("/api/donation-confirmed", post(donation_confirmed))
        .with_state(state)
        .layer(cors)
}

async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    let (admitted, response) =
        crate::registration::register(&state, request, &addr.ip().to_string()).await;
    let status = if admitted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response))
}

async fn agents(State(state): State<AppState>) -> impl IntoResponse {
    let summaries: Vec<AgentSummary> = state.pool.read().all().map(AgentSummary::from).collect();
    Json(summaries)
}

/// Sorted by `(balance desc, (wins - losses) desc)` (spec.md §4.5 "Other
/// Coordinator endpoints").
async fn leaderboard(State(state): State<AppState>) -> impl IntoResponse {
    let mut summaries: Vec<AgentSummary> = state.pool.read().all().map(AgentSummary::from).collect();
    summaries.sort_by(|a, b| {
        b.balance
            .cmp(&a.balance)
            .then_with(|| (b.wins as i64 - b.losses as i64).cmp(&(a.wins as i64 - a.losses as i64)))
    });
    Json(summaries)
}

async fn games(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.game_log.read().clone())
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state.pool.read();
    let mut resp = StatsResponse {
        total_agents: pool.len(),
        active_agents: 0,
        benched_agents: 0,
        broke_agents: 0,
        offline_agents: 0,
        total_games: state.game_log.read().len(),
        total_volume: 0,
    };
    for agent in pool.all() {
        match agent.status {
            AgentStatus::Active => resp.active_agents += 1,
            AgentStatus::Benched => resp.benched_agents += 1,
            AgentStatus::Broke => resp.broke_agents += 1,
            AgentStatus::Offline | AgentStatus::Deleted => resp.offline_agents += 1,
        }
    }
    resp.total_volume = state
        .game_log
        .read()
        .iter()
        .map(|g| g.stake_amount)
        .sum();
    Json(resp)
}

/// The Coordinator's own fresh attestation data (spec.md §4.4's
/// `/attestation` contract, applied to the Coordinator per SPEC_FULL.md §6).
async fn attestation(State(state): State<AppState>) -> impl IntoResponse {
    let rtmr3 = match state.tee.get_code_measurement().await {
        Ok(v) => v,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    };
    let tee_pubkey = match state.tee.get_tee_public_key().await {
        Ok(v) => v,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    };
    let quote = match state.tee.get_attestation_quote().await {
        Ok(v) => v,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    };
    Json(json!({
        "rtmr3": rtmr3,
        "codeHash": state.birth_cert.code_hash,
        "teePubkey": tee_pubkey,
        "quote": quote,
    }))
    .into_response()
}

async fn birth_cert(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.birth_cert).clone())
}

/// `GET /api/events`: text/event-stream of `{type, data, timestamp}`
/// envelopes, backlog-then-live (spec.md §4.5 "Event bus (SSE)").
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let hello = stream::once(async {
        Ok(Event::default().data(json!({"type": "connected"}).to_string()))
    });

    let rx = state.events.subscribe();
    let live = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|envelope| {
            let event = Event::default()
                .event(envelope.kind.clone())
                .data(serde_json::to_string(&envelope).unwrap_or_default());
            (Ok(event), rx)
        })
    });

    Sse::new(hello.chain(live)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn topup_sol(
    State(state): State<AppState>,
    Json(request): Json<TopupSolRequest>,
) -> impl IntoResponse {
    if !state.pool.read().contains_wallet(&request.wallet_address) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown wallet {}", request.wallet_address)})),
        )
            .into_response();
    }

    let outcome = state
        .topup_throttle
        .maybe_grant(
            state.chain.as_ref(),
            &state.wallet_key.to_bytes(),
            &request.wallet_address,
            state.config.sol_topup_lamports,
            state.config.sol_topup_lamports,
            Duration::from_secs(state.config.sol_topup_throttle_secs),
        )
        .await;

    match outcome {
        Ok(crate::topup::TopupOutcome::Granted { signature }) => {
            (StatusCode::OK, Json(json!({"status": "granted", "signature": signature}))).into_response()
        }
        Ok(crate::topup::TopupOutcome::Throttled) => {
            (StatusCode::TOO_MANY_REQUESTS, Json(json!({"status": "throttled"}))).into_response()
        }
        Ok(crate::topup::TopupOutcome::AlreadyFunded) => {
            (StatusCode::OK, Json(json!({"status": "already_funded"}))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Forwarded to the event bus as `trash_talk`; authenticated by the agent's
/// presence in the pool (spec.md §4.5 "Other Coordinator endpoints").
async fn agent_message(
    State(state): State<AppState>,
    Json(message): Json<AgentMessage>,
) -> impl IntoResponse {
    let known = state
        .pool
        .read()
        .all()
        .any(|a| a.agent_name == message.agent_name);
    if !known {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": format!("unknown agent {}", message.agent_name)})),
        )
            .into_response();
    }

    state.events.publish_kind(
        "trash_talk",
        json!({"agentName": message.agent_name, "message": message.message}),
    );
    (StatusCode::OK, Json(GenericAck::ok())).into_response()
}

/// Increments `totalDonations` and broadcasts `donation` (spec.md §4.5
/// "Donation ingestion"): the receiving half of the agent-side watcher.
async fn donation_confirmed(
    State(state): State<AppState>,
    Json(donation): Json<DonationConfirmed>,
) -> impl IntoResponse {
    let found = {
        let mut pool = state.pool.write();
        if let Some(agent) = pool.get_mut_by_name(&donation.agent_name) {
            agent.record_donation(donation.amount);
            true
        } else {
            false
        }
    };

    if !found {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": format!("unknown agent {}", donation.agent_name)})),
        )
            .into_response();
    }

    state.events.publish_kind(
        "donation",
        json!({
            "agentName": donation.agent_name,
            "donor": donation.donor,
            "amount": donation.amount,
        }),
    );
    (StatusCode::OK, Json(GenericAck::ok())).into_response()
}
