//! The append-only [`GameResult`] log entry (spec.md §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub game_id: String,
    pub winner: String,
    pub loser: String,
    pub winner_wallet: String,
    pub loser_wallet: String,
    pub stake_amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    pub timestamp: u64,
}
