//! Agent-side donation watcher (spec.md §4.5 "Donation ingestion",
//! implemented agent-side per SPEC_FULL.md §5).

use std::sync::Arc;

use dashmap::DashSet;

use pof_chain::ChainClient;
use pof_types::DONATION_POLL_SECS;

use crate::wire::DonationConfirmed;

/// Poll `wallet`'s token-account history every [`DONATION_POLL_SECS`],
/// reporting any signature not already in `seen_game_tx_signatures` (game
/// payments, recorded by the `/play`/`/collect` handlers) or in this
/// watcher's own first-run baseline as a donation.
pub async fn run(
    http: reqwest::Client,
    chain: Arc<dyn ChainClient>,
    coordinator_url: String,
    agent_name: String,
    wallet_address: String,
    seen_game_tx_signatures: Arc<DashSet<String>>,
) {
    let processed = DashSet::new();

    // First-run baseline: existing history is "already seen" so a freshly
    // booted agent never reports its own initial-funding transfer (or any
    // pre-existing inbound transfer) as a donation.
    match chain.recent_token_transactions(&wallet_address).await {
        Ok(history) => {
            for tx in history {
                processed.insert(tx.signature);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "donation watcher: initial history scan failed");
        }
    }

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(DONATION_POLL_SECS));
    loop {
        interval.tick().await;
        if let Err(e) = poll_once(
            &http,
            chain.as_ref(),
            &coordinator_url,
            &agent_name,
            &wallet_address,
            &seen_game_tx_signatures,
            &processed,
        )
        .await
        {
            tracing::warn!(error = %e, "donation watcher poll failed");
        }
    }
}

async fn poll_once(
    http: &reqwest::Client,
    chain: &dyn ChainClient,
    coordinator_url: &str,
    agent_name: &str,
    wallet_address: &str,
    seen_game_tx_signatures: &DashSet<String>,
    processed: &DashSet<String>,
) -> Result<(), String> {
    let history = chain
        .recent_token_transactions(wallet_address)
        .await
        .map_err(|e| e.to_string())?;

    for tx in history {
        if processed.contains(&tx.signature) {
            continue;
        }
        processed.insert(tx.signature.clone());

        if seen_game_tx_signatures.contains(&tx.signature) {
            continue;
        }

        let body = DonationConfirmed {
            agent_name: agent_name.to_string(),
            donor: tx.counterparty.clone().unwrap_or_else(|| "unknown".to_string()),
            amount: tx.amount,
        };

        let url = format!("{}/api/donation-confirmed", coordinator_url.trim_end_matches('/'));
        match http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(signature = %tx.signature, amount = tx.amount, "donation reported");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), signature = %tx.signature, "donation report rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, signature = %tx.signature, "donation report transport error");
            }
        }
    }

    Ok(())
}
