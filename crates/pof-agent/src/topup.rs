//! Gas top-up request (spec.md §4.4 last paragraph): ask the Coordinator
//! for a native-token top-up when this agent's own SOL balance runs low.

use std::sync::Arc;

use pof_chain::ChainClient;

use crate::wire::TopupSolRequest;

/// Poll this agent's own native-token balance and request a gas top-up
/// whenever it drops below `threshold_lamports`. Reuses the donation
/// watcher's poll cadence ([`pof_types::DONATION_POLL_SECS`]) rather than a
/// separate constant — spec.md names a top-up *threshold* but no distinct
/// check interval, and the same cadence already governs agent-side
/// background polling.
pub async fn run(
    http: reqwest::Client,
    chain: Arc<dyn ChainClient>,
    coordinator_url: String,
    agent_name: String,
    wallet_address: String,
    threshold_lamports: u64,
) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(pof_types::DONATION_POLL_SECS));
    loop {
        interval.tick().await;
        match chain.native_balance(&wallet_address).await {
            Ok(balance) => {
                maybe_request_topup(
                    &http,
                    &coordinator_url,
                    &agent_name,
                    &wallet_address,
                    balance,
                    threshold_lamports,
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "topup watcher: native balance read failed");
            }
        }
    }
}

/// If `native_balance_lamports` is below `threshold_lamports`, POST
/// `/api/topup-sol`. The Coordinator re-checks the on-chain balance itself
/// and throttles repeated requests (spec.md §4.4); this call is advisory
/// and its failure is non-fatal to the agent.
pub async fn maybe_request_topup(
    http: &reqwest::Client,
    coordinator_url: &str,
    agent_name: &str,
    wallet_address: &str,
    native_balance_lamports: u64,
    threshold_lamports: u64,
) {
    if native_balance_lamports >= threshold_lamports {
        return;
    }

    let url = format!("{}/api/topup-sol", coordinator_url.trim_end_matches('/'));
    let body = TopupSolRequest {
        agent_name: agent_name.to_string(),
        wallet_address: wallet_address.to_string(),
    };

    match http.post(&url).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::info!(balance = native_balance_lamports, "gas top-up requested");
        }
        Ok(response) => {
            tracing::warn!(status = %response.status(), "gas top-up request rejected");
        }
        Err(e) => {
            tracing::warn!(error = %e, "gas top-up request transport error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn above_threshold_sends_no_request() {
        let http = reqwest::Client::new();
        // Port 1 refuses connections; if a request were attempted this
        // would log a transport warning but not panic. We only assert the
        // early-return path never builds a request by using a threshold
        // that is never crossed and trusting the guard above.
        maybe_request_topup(&http, "http://127.0.0.1:1", "alice", "WALLET", 100, 50).await;
    }
}
