//! Agent-side registration with the Coordinator (spec.md §4.4
//! `booting -> registering`, §9 "Retry policy": bounded 5 × 5s).

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

use pof_types::birth_cert::registration_message;
use pof_types::{BirthCertificate, REGISTRATION_RETRY_ATTEMPTS, REGISTRATION_RETRY_SPACING_SECS};

use crate::error::AgentError;
use crate::wire::{RegisterRequest, RegisterResponse};

/// Attempt registration up to [`REGISTRATION_RETRY_ATTEMPTS`] times, waiting
/// [`REGISTRATION_RETRY_SPACING_SECS`] between attempts. Any non-2xx
/// response is treated as rejection and retried exactly like a transport
/// error — spec.md does not distinguish "rejected" from "unreachable" in
/// the retry loop, only in the final error surfaced to the operator.
pub async fn register_with_retries(
    http: &reqwest::Client,
    coordinator_url: &str,
    birth_cert: &BirthCertificate,
    wallet_key: &SigningKey,
    endpoint: &str,
) -> Result<RegisterResponse, AgentError> {
    let message = registration_message(&birth_cert.wallet_address, endpoint);
    let signature = base64::engine::general_purpose::STANDARD
        .encode(wallet_key.sign(message.as_bytes()).to_bytes());

    let request = RegisterRequest {
        birth_cert: birth_cert.clone(),
        endpoint: endpoint.to_string(),
        signature,
    };

    let url = format!("{}/api/register", coordinator_url.trim_end_matches('/'));

    let mut last_error = String::new();
    for attempt in 1..=REGISTRATION_RETRY_ATTEMPTS {
        match try_register(http, &url, &request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                tracing::warn!(attempt, max = REGISTRATION_RETRY_ATTEMPTS, error = %e, "registration attempt failed");
                last_error = e;
                if attempt < REGISTRATION_RETRY_ATTEMPTS {
                    tokio::time::sleep(std::time::Duration::from_secs(
                        REGISTRATION_RETRY_SPACING_SECS,
                    ))
                    .await;
                }
            }
        }
    }

    Err(AgentError::RegistrationRetriesExhausted(last_error))
}

async fn try_register(
    http: &reqwest::Client,
    url: &str,
    request: &RegisterRequest,
) -> Result<RegisterResponse, String> {
    let response = http
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| format!("transport error: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("{status}: {body}"));
    }

    response
        .json::<RegisterResponse>()
        .await
        .map_err(|e| format!("malformed response body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_message_signature_verifies() {
        let wallet_key = SigningKey::from_bytes(&[4u8; 32]);
        let message = registration_message("WALLET", "http://10.0.0.1");
        let signature = wallet_key.sign(message.as_bytes());
        wallet_key
            .verifying_key()
            .verify_strict(message.as_bytes(), &signature)
            .expect("signature verifies over the registration message");
    }
}
