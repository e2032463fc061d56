//! JSON wire types for the agent's HTTP contract (spec.md §4.4, §6).

use serde::{Deserialize, Serialize};

use pof_types::BirthCertificate;

/// `POST /api/register` request body (spec.md §6 "Registration wire
/// format").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub birth_cert: BirthCertificate,
    pub endpoint: String,
    /// base64 ed25519 signature of `"register:{walletAddress}:{endpoint}"`.
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

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub agent_name: String,
    pub status: String,
    pub uptime: u64,
    pub wallet_address: String,
}

/// `GET /attestation` response — fresh values from the TEE provider, not
/// the birth certificate's frozen ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub rtmr3: String,
    pub code_hash: String,
    pub timestamp: u64,
    pub provider: String,
    pub quote: String,
    pub tee_pubkey: String,
}

/// The role the Coordinator assigns an agent for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Winner,
    Loser,
}

/// `POST /play` request body (spec.md §4.4 "Match protocol").
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

/// `POST /play` response when `role = winner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAcknowledged {
    pub status: String,
}

impl Default for PlayAcknowledged {
    fn default() -> Self {
        Self {
            status: "acknowledged".to_string(),
        }
    }
}

/// `POST /play` response when `role = loser` and payment succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPaid {
    pub status: String,
    pub game_id: String,
    pub tx_signature: String,
}

impl PlayPaid {
    pub fn new(game_id: impl Into<String>, tx_signature: impl Into<String>) -> Self {
        Self {
            status: "paid".to_string(),
            game_id: game_id.into(),
            tx_signature: tx_signature.into(),
        }
    }
}

/// `POST /play` response when `role = loser` and payment failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayFailed {
    pub status: String,
    pub error: String,
}

impl PlayFailed {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "payment_failed".to_string(),
            error: error.into(),
        }
    }
}

/// `GET /collect` 200 response once a payment is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedResponse {
    pub status: String,
    pub agent: String,
    pub tx_signature: String,
}

impl CollectedResponse {
    pub fn new(agent: impl Into<String>, tx_signature: impl Into<String>) -> Self {
        Self {
            status: "collected".to_string(),
            agent: agent.into(),
            tx_signature: tx_signature.into(),
        }
    }
}

/// Body the donation watcher POSTs to `/api/donation-confirmed`.
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
