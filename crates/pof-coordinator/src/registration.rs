//! `POST /api/register` pipeline (spec.md §4.5 "Registration pipeline"):
//! seven ordered steps, short-circuiting on the first failure.

use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};

use pof_attestation::verify_wallet_signature;
use pof_types::birth_cert::registration_message;
use pof_types::{Agent, INITIAL_FUNDING};

use crate::config::ChainProviderKind;
use crate::state::AppState;
use crate::wire::{RegisterRequest, RegisterResponse};

/// Native-token amount granted alongside the initial stablecoin funding
/// (spec.md §4.5 step 6: "native gas + one unit of stablecoin"). Not named
/// as a constant in spec.md §6, so a conservative flat amount is used —
/// the same top-up-threshold-sized grant the agent would otherwise have to
/// request via `/api/topup-sol` on its very first tick.
const INITIAL_NATIVE_GRANT_LAMPORTS: u64 = 20_000_000;

/// spec.md §4.5 step 1: "if `endpoint` is missing or loopback, substitute
/// `http://{requestSourceIp}`" (SecretVM publishes port 80 externally).
pub fn effective_endpoint(endpoint: Option<&str>, source_ip: &str) -> String {
    match endpoint {
        Some(e) if !e.trim().is_empty() && !is_loopback_endpoint(e) => e.to_string(),
        _ => format!("http://{source_ip}"),
    }
}

fn is_loopback_endpoint(endpoint: &str) -> bool {
    let host = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split(':')
        .next()
        .unwrap_or("");
    matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0" | "::1")
}

fn wallet_pubkey(wallet_address: &str) -> Result<VerifyingKey, String> {
    let bytes = bs58::decode(wallet_address)
        .into_vec()
        .map_err(|e| format!("malformed walletAddress base58: {e}"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "walletAddress must decode to 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| format!("invalid walletAddress key: {e}"))
}

fn verify_registration_signature(
    wallet_pubkey: &VerifyingKey,
    wallet_address: &str,
    signed_endpoint: &str,
    signature_b64: &str,
) -> Result<(), String> {
    let message = registration_message(wallet_address, signed_endpoint);
    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|e| format!("malformed signature base64: {e}"))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| "signature must be 64 bytes".to_string())?;
    wallet_pubkey
        .verify_strict(message.as_bytes(), &Signature::from_bytes(&sig_bytes))
        .map_err(|_| "registration signature verification failed".to_string())
}

/// Run the full seven-step pipeline and return the response to send back,
/// plus whether the agent was actually admitted (so the caller can decide
/// the HTTP status code).
pub async fn register(state: &AppState, request: RegisterRequest, source_ip: &str) -> (bool, RegisterResponse) {
    let cert = &request.birth_cert;

    // Step 1: resolve the effective callback endpoint, but verify
    // signatures against the *original* endpoint the agent signed.
    let effective_endpoint = effective_endpoint(Some(request.endpoint.as_str()), source_ip);

    // Step 2: attestation.
    let outcome = pof_attestation::verify(cert, &state.allowlist, state.quote_parser.as_ref()).await;
    if !outcome.ok {
        return (false, RegisterResponse::rejected(outcome.reason));
    }

    // Step 3: wallet signature over the birth certificate's own canonical
    // message (BC-2).
    let wallet_pubkey = match wallet_pubkey(&cert.wallet_address) {
        Ok(k) => k,
        Err(e) => return (false, RegisterResponse::rejected(e)),
    };
    if let Err(e) = verify_wallet_signature(cert, &wallet_pubkey) {
        return (false, RegisterResponse::rejected(e));
    }

    // Step 4: the separate registration signature over
    // "register:{walletAddress}:{endpoint}", using the *original* endpoint.
    if let Err(e) = verify_registration_signature(
        &wallet_pubkey,
        &cert.wallet_address,
        &request.endpoint,
        &request.signature,
    ) {
        return (false, RegisterResponse::rejected(e));
    }

    // Step 5: reject duplicate registration of an already-admitted wallet.
    // Terminal (offline/deleted) wallets are exempt (SPEC_FULL.md §9
    // resolved Open Question 2).
    {
        let pool = state.pool.read();
        if pool.has_active_registration(&cert.wallet_address) {
            return (
                false,
                RegisterResponse::rejected(format!(
                    "wallet {} is already registered",
                    cert.wallet_address
                )),
            );
        }
    }

    // Step 6: initial funding, exactly once per wallet (FundedWallets).
    let already_funded = !state.funded_wallets.insert(cert.wallet_address.clone());
    let initial_balance = if already_funded {
        // Re-registration of an already-funded wallet: admit without a new
        // transfer (spec.md §3 "FundedWallets").
        INITIAL_FUNDING
    } else {
        match crate::topup::fund_new_agent(
            state.chain.as_ref(),
            &state.wallet_key.to_bytes(),
            &cert.wallet_address,
            INITIAL_NATIVE_GRANT_LAMPORTS,
            INITIAL_FUNDING,
        )
        .await
        {
            Ok(()) => INITIAL_FUNDING,
            Err(e) if state.config.chain_provider == ChainProviderKind::Mock => {
                tracing::warn!(
                    wallet = %cert.wallet_address,
                    error = %e,
                    "initial funding failed in mock mode, granting a mock balance"
                );
                INITIAL_FUNDING
            }
            Err(e) => {
                tracing::error!(
                    wallet = %cert.wallet_address,
                    error = %e,
                    "initial funding failed; admitting with zero balance"
                );
                0
            }
        }
    };

    // Step 7: admit and broadcast.
    let now = chrono::Utc::now().timestamp_millis() as u64;
    let agent = Agent::new(
        cert.agent_name.clone(),
        cert.wallet_address.clone(),
        effective_endpoint,
        cert.clone(),
        now,
        initial_balance,
    );
    state.pool.write().insert(agent.clone());

    state.events.publish_kind(
        "agent_joined",
        serde_json::json!({
            "agentName": agent.agent_name,
            "walletAddress": agent.wallet_address,
            "balance": agent.balance,
        }),
    );

    (
        true,
        RegisterResponse::ok(format!("{} admitted to the pool", agent.agent_name)),
    )
}
