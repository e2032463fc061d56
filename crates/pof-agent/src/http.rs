//! Axum router and handlers for the agent's HTTP contract (spec.md §4.4
//! "HTTP contract exposed to external callers").

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use pof_types::GAME_STAKE;

use crate::match_protocol::{pay_winner, payment_requirements};
use crate::state::AppState;
use crate::wire::{
    AttestationResponse, GameCommand, HealthResponse, PlayAcknowledged, PlayFailed, PlayPaid, Role,
};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/birth-cert", get(birth_cert))
        .route("/attestation", get(attestation))
        .route("/collect", get(collect))
        .route("/play", post(play))
        .with_state(state)
        .layer(cors)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        agent_name: state.config.agent_name.clone(),
        status: "ok".to_string(),
        uptime: state.uptime_secs(),
        wallet_address: state.wallet_address(),
    })
}

async fn birth_cert(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.birth_cert).clone())
}

/// `GET /attestation` returns *fresh* values from the TEE provider, not the
/// birth certificate's frozen ones (spec.md §4.4).
async fn attestation(State(state): State<AppState>) -> impl IntoResponse {
    let rtmr3 = match state.tee.get_code_measurement().await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };
    let tee_pubkey = match state.tee.get_tee_public_key().await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };
    let quote = match state.tee.get_attestation_quote().await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    Json(AttestationResponse {
        rtmr3,
        code_hash: state.birth_cert.code_hash.clone(),
        timestamp,
        provider: format!("{:?}", state.config.tee_provider).to_lowercase(),
        quote,
        tee_pubkey,
    })
    .into_response()
}

/// `GET /collect` — the x402 payment endpoint. Without `X-Payment`, 402
/// with payment requirements; with it, record the proof and settle.
async fn collect(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let payment_header = headers.get("X-Payment").and_then(|v| v.to_str().ok());

    let Some(header_value) = payment_header else {
        let requirements =
            payment_requirements(&state.wallet_address(), &state.config.token_mint, GAME_STAKE);
        return (StatusCode::PAYMENT_REQUIRED, Json(requirements)).into_response();
    };

    let proof = match crate::match_protocol::parse_payment_proof(header_value) {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    // Suppress double-counting: a tx signature recorded here is never later
    // surfaced by this agent's donation watcher.
    state.seen_game_tx_signatures.insert(proof.tx_signature.clone());
    state.record_collect();

    (
        StatusCode::OK,
        Json(crate::wire::CollectedResponse::new(
            state.config.agent_name.clone(),
            proof.tx_signature,
        )),
    )
        .into_response()
}

/// `POST /play` — Coordinator-authenticated match dispatch.
async fn play(State(state): State<AppState>, Json(cmd): Json<GameCommand>) -> impl IntoResponse {
    match cmd.role {
        Role::Winner => (StatusCode::OK, Json(PlayAcknowledged::default())).into_response(),
        Role::Loser => {
            let wallet_secret = state.wallet_key.to_bytes();
            match pay_winner(&state.http, state.chain.as_ref(), &wallet_secret, &cmd).await {
                Ok(signature) => {
                    state.seen_game_tx_signatures.insert(signature.clone());
                    (StatusCode::OK, Json(PlayPaid::new(cmd.game_id, signature))).into_response()
                }
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(PlayFailed::new(e.to_string())),
                )
                    .into_response(),
            }
        }
    }
}
