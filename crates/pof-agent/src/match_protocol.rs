//! The loser's `payWinner` flow (spec.md §4.4 "Match protocol (agent
//! side)"): x402 handshake first, direct-transfer fallback only if the
//! handshake itself never completes (SPEC_FULL.md §9 resolved Open
//! Question 1).

use pof_chain::{ChainClient, X402PaymentProof, X402PaymentRequirements};

use crate::error::AgentError;
use crate::wire::GameCommand;

/// Pay the winner of `cmd`, returning the settlement transaction signature.
pub async fn pay_winner(
    http: &reqwest::Client,
    chain: &dyn ChainClient,
    wallet_secret_key: &[u8; 32],
    cmd: &GameCommand,
) -> Result<String, AgentError> {
    match x402_handshake(http, chain, wallet_secret_key, cmd).await {
        Ok(signature) => Ok(signature),
        Err(handshake_error) => {
            tracing::warn!(
                game_id = %cmd.game_id,
                error = %handshake_error,
                "x402 handshake failed, falling back to direct transfer"
            );
            chain
                .transfer_token(wallet_secret_key, &cmd.opponent_wallet, cmd.stake_amount)
                .await
                .map_err(AgentError::Chain)
        }
    }
}

/// Attempt the full x402 path: GET `/collect` expecting 402, transfer,
/// then GET `/collect` again with the `X-Payment` proof header. Any
/// failure before the on-chain transfer is considered "handshake failed"
/// and is the caller's cue to fall back to a direct transfer. A failure
/// *after* the transfer has landed (e.g. the winner's ack retry not
/// reaching it) is not retried with a second payment — the transfer
/// itself is the source of truth.
async fn x402_handshake(
    http: &reqwest::Client,
    chain: &dyn ChainClient,
    wallet_secret_key: &[u8; 32],
    cmd: &GameCommand,
) -> Result<String, AgentError> {
    let collect_url = format!("{}/collect", cmd.opponent_endpoint.trim_end_matches('/'));

    let initial = http
        .get(&collect_url)
        .send()
        .await
        .map_err(|e| AgentError::X402Handshake(format!("GET {collect_url}: {e}")))?;

    if initial.status().as_u16() != 402 {
        return Err(AgentError::X402Handshake(format!(
            "expected 402 from {collect_url}, got {}",
            initial.status()
        )));
    }

    let requirements: X402PaymentRequirements = initial
        .json()
        .await
        .map_err(|e| AgentError::X402Handshake(format!("malformed 402 body: {e}")))?;

    if requirements.amount != cmd.stake_amount {
        return Err(AgentError::X402Handshake(format!(
            "payment requirements amount {} does not match stake {}",
            requirements.amount, cmd.stake_amount
        )));
    }

    let signature = chain
        .transfer_token(wallet_secret_key, &requirements.address, requirements.amount)
        .await
        .map_err(AgentError::Chain)?;

    let proof = X402PaymentProof {
        tx_signature: signature.clone(),
        amount: requirements.amount,
        payer: requirements.address.clone(),
    };
    let proof_json =
        serde_json::to_string(&proof).map_err(|e| AgentError::X402Handshake(e.to_string()))?;

    let ack = http
        .get(&collect_url)
        .header("X-Payment", proof_json)
        .send()
        .await;

    match ack {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => tracing::warn!(
            game_id = %cmd.game_id,
            status = %response.status(),
            "collect acknowledgment was not accepted; payment already settled on-chain"
        ),
        Err(e) => tracing::warn!(
            game_id = %cmd.game_id,
            error = %e,
            "collect acknowledgment request failed; payment already settled on-chain"
        ),
    }

    Ok(signature)
}

/// Parse the `X-Payment` header value on the winner's `/collect` endpoint.
pub fn parse_payment_proof(header_value: &str) -> Result<X402PaymentProof, AgentError> {
    serde_json::from_str(header_value)
        .map_err(|e| AgentError::PaymentFailed(format!("malformed X-Payment header: {e}")))
}

/// Construct the 402 body the winner's `/collect` handler returns on an
/// unauthenticated GET.
pub fn payment_requirements(
    wallet_address: &str,
    mint: &str,
    stake_amount: u64,
) -> X402PaymentRequirements {
    X402PaymentRequirements::new(wallet_address, mint, stake_amount, "ProofOfFlip game stake")
}

/// Convenience used by tests to build an `X-Payment` header value
/// identical to what [`pay_winner`] sends.
#[cfg(test)]
pub fn encode_proof(proof: &X402PaymentProof) -> String {
    serde_json::to_string(proof).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pof_chain::MockChainClient;

    fn sample_cmd(opponent_endpoint: &str) -> GameCommand {
        GameCommand {
            game_id: "game-1".into(),
            role: crate::wire::Role::Loser,
            opponent_name: "alice".into(),
            opponent_endpoint: opponent_endpoint.to_string(),
            opponent_wallet: "ALICE_WALLET".into(),
            stake_amount: 10_000,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn falls_back_to_direct_transfer_when_endpoint_is_unreachable() {
        let chain = MockChainClient::new();
        let loser_secret = [9u8; 32];
        let loser_wallet = pof_chain::mock::wallet_address_of(&loser_secret);
        chain.fund_token(&loser_wallet, 1_000_000);

        let http = reqwest::Client::new();
        // Port 1 is reserved and will refuse the connection immediately.
        let cmd = sample_cmd("http://127.0.0.1:1");

        let signature = pay_winner(&http, &chain, &loser_secret, &cmd).await.unwrap();
        assert!(!signature.is_empty());
        assert_eq!(chain.token_balance("ALICE_WALLET").await.unwrap(), 10_000);
    }

    #[test]
    fn proof_round_trips_through_the_header_format() {
        let proof = X402PaymentProof {
            tx_signature: "sig".into(),
            amount: 10_000,
            payer: "PAYER".into(),
        };
        let encoded = encode_proof(&proof);
        let parsed = parse_payment_proof(&encoded).unwrap();
        assert_eq!(parsed, proof);
    }
}
