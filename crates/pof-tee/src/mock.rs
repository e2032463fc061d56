//! Deterministic, dependency-free mock TEE provider (spec.md §4.1).
//!
//! Everything here is derived from `agentName` alone so that the same agent
//! name always yields the same keypair, RTMR3, and quote shape across
//! restarts — required by spec.md §8's "Mock TEE provider returns
//! bit-identical `teePubkey` and `rtmr3` across restarts" property.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::TeeError;
use crate::TeeProvider;

/// Domain-separation prefixes so the signing-key seed and the RTMR3 digest
/// never collide even though both are hashes of the same agent name.
const KEY_DOMAIN: &[u8] = b"proofofflip/mock-tee/signing-key:";
const RTMR3_DOMAIN: &[u8] = b"proofofflip/mock-tee/rtmr3:";

#[derive(Serialize)]
struct MockQuote<'a> {
    mock: bool,
    report_data: String,
    rtmr3: &'a str,
    timestamp: u64,
}

/// A mock TEE backed entirely by hashing `agent_name`.
pub struct MockTeeProvider {
    agent_name: String,
    signing_key: SigningKey,
    rtmr3: String,
}

impl MockTeeProvider {
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        let signing_key = derive_signing_key(&agent_name);
        let rtmr3 = derive_rtmr3(&agent_name);
        Self {
            agent_name,
            signing_key,
            rtmr3,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }
}

fn derive_signing_key(agent_name: &str) -> SigningKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN);
    hasher.update(agent_name.as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    SigningKey::from_bytes(&seed)
}

fn derive_rtmr3(agent_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(RTMR3_DOMAIN);
    hasher.update(agent_name.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl TeeProvider for MockTeeProvider {
    async fn get_code_measurement(&self) -> Result<String, TeeError> {
        Ok(self.rtmr3.clone())
    }

    async fn get_tee_public_key(&self) -> Result<String, TeeError> {
        Ok(self.public_key_hex())
    }

    async fn get_attestation_quote(&self) -> Result<String, TeeError> {
        let pubkey_hex = self.public_key_hex();
        // report_data is conventionally 64 bytes (128 hex chars); the bound
        // public key occupies the first 32, the rest is zero-padded.
        let report_data = format!("{pubkey_hex:0<128}");
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let quote = MockQuote {
            mock: true,
            report_data,
            rtmr3: &self.rtmr3,
            timestamp,
        };
        let json = serde_json::to_vec(&quote)
            .map_err(|e| TeeError::Parse(format!("failed to serialize mock quote: {e}")))?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            json,
        ))
    }

    async fn sign_with_tee_key(&self, payload: &[u8]) -> Result<String, TeeError> {
        let sig = self.signing_key.sign(payload);
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            sig.to_bytes(),
        ))
    }
}
