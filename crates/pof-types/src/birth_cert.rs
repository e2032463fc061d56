//! The immutable [`BirthCertificate`] and its canonical signing message.

use serde::{Deserialize, Serialize};

/// An agent's cryptographic identity record, immutable after construction.
///
/// Built by `pof-identity`'s `BirthCertificateBuilder` (C2), checked by
/// `pof-attestation`'s verifier (C3). See spec.md §3 for field provenance
/// and invariants BC-1..BC-4.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BirthCertificate {
    pub agent_name: String,
    pub wallet_address: String,
    pub docker_image: String,
    pub code_hash: String,
    pub rtmr3: String,
    pub timestamp: u64,
    pub tee_pubkey: String,
    pub attestation_quote: String,
    pub tee_signature: String,
    pub wallet_signature: String,
}

impl BirthCertificate {
    /// The canonical byte sequence both signatures cover:
    /// `"{agentName}:{walletAddress}:{dockerImage}:{codeHash}:{rtmr3}:{timestamp}"`.
    pub fn canonical_message(&self) -> String {
        canonical_message(
            &self.agent_name,
            &self.wallet_address,
            &self.docker_image,
            &self.code_hash,
            &self.rtmr3,
            self.timestamp,
        )
    }
}

/// Build the canonical signing message from its components, without
/// requiring a fully-assembled [`BirthCertificate`] (the builder needs this
/// before the record exists).
pub fn canonical_message(
    agent_name: &str,
    wallet_address: &str,
    docker_image: &str,
    code_hash: &str,
    rtmr3: &str,
    timestamp: u64,
) -> String {
    format!("{agent_name}:{wallet_address}:{docker_image}:{code_hash}:{rtmr3}:{timestamp}")
}

/// The registration-signature message (spec.md §6 wire format): signed with
/// the wallet key, separate from the birth certificate's own signatures.
pub fn registration_message(wallet_address: &str, endpoint: &str) -> String {
    format!("register:{wallet_address}:{endpoint}")
}
