//! JSON wire types for the Coordinator's HTTP surface (spec.md §4.5, §6).
//!
//! These mirror the shapes `pof-agent::wire` defines for the other side of
//! the same handshakes (`RegisterRequest`, `GameCommand`, ...). The two
//! crates are independently deployable services that only agree over the
//! wire, so each owns its own copy of the JSON contract rather than
//! sharing Rust types across a binary-to-binary dependency — the same way
//! `rill-node`/`rill-faucet`/`rill-cli` each define their own request
//! structs for the same RPC calls instead of depending on one another.

use serde::{Deserialize, Serialize};

use pof_types::BirthCertificate;

/// `POST /api/register` request body (spec.md §6 "Registration wire
/// format").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub birth_cert: BirthCertificate,
    pub endpoint: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ai_key: Option<String>,
}

impl RegisterResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            secret_ai_key: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            secret_ai_key: None,
        }
    }
}

/// `GET /health` response, as served by an agent and consumed by the
/// Coordinator's liveness probe (spec.md §4.5 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub agent_name: String,
    pub status: String,
    pub uptime: u64,
    pub wallet_address: String,
}

/// The role the Coordinator assigns an agent for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Winner,
    Loser,
}

/// `POST /play` request body, dispatched by the match loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCommand {
    pub game_id: String,
    pub role: Role,
    pub opponent_name: String,
    pub opponent_endpoint: String,
    pub opponent_wallet: String,
    pub stake_amount: u64,
    pub timestamp: u64,
}

/// Body the agent-side donation watcher POSTs to
/// `/api/donation-confirmed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationConfirmed {
    pub agent_name: String,
    pub donor: String,
    pub amount: u64,
}

/// Body POSTed to `/api/topup-sol`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupSolRequest {
    pub agent_name: String,
    pub wallet_address: String,
}

/// Body POSTed to `/api/agent-message` (agent-to-agent "trash talk",
/// forwarded verbatim to the event bus as a `trash_talk` event).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub agent_name: String,
    pub message: String,
}

/// `GET /api/agents`, `/api/leaderboard` row shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub agent_name: String,
    pub wallet_address: String,
    pub endpoint: String,
    pub status: pof_types::AgentStatus,
    pub balance: u64,
    pub wins: u64,
    pub losses: u64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_donations: u64,
    pub registered_at: u64,
}

impl From<&pof_types::Agent> for AgentSummary {
    fn from(a: &pof_types::Agent) -> Self {
        Self {
            agent_name: a.agent_name.clone(),
            wallet_address: a.wallet_address.clone(),
            endpoint: a.endpoint.clone(),
            status: a.status,
            balance: a.balance,
            wins: a.wins,
            losses: a.losses,
            current_streak: a.current_streak,
            longest_streak: a.longest_streak,
            total_donations: a.total_donations,
            registered_at: a.registered_at,
        }
    }
}

/// `GET /api/stats` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_agents: usize,
    pub active_agents: usize,
    pub benched_agents: usize,
    pub broke_agents: usize,
    pub offline_agents: usize,
    pub total_games: usize,
    pub total_volume: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericAck {
    pub status: String,
}

impl GenericAck {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
