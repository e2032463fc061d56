//! The attestation verifier entry point (spec.md §4.3, C3).

use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use pof_types::BirthCertificate;

use crate::allowlist::Allowlist;
use crate::parser::QuoteParser;

/// Which attestation scheme a birth certificate was verified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Mock,
    Tdx,
    SevSnp,
}

/// The result of [`verify`]. Never exposes the allowlist's internal state
/// to the caller — only the boolean + reason, per spec.md §4.3's "Never
/// delegates allowlist decisions to the caller".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub ok: bool,
    pub reason: String,
    pub rtmr3: Option<String>,
    pub tee_pubkey: Option<String>,
    pub platform: Option<Platform>,
}

impl VerificationOutcome {
    fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            rtmr3: None,
            tee_pubkey: None,
            platform: None,
        }
    }

    fn accept(rtmr3: String, tee_pubkey: String, platform: Platform) -> Self {
        Self {
            ok: true,
            reason: "ok".into(),
            rtmr3: Some(rtmr3),
            tee_pubkey: Some(tee_pubkey),
            platform: Some(platform),
        }
    }
}

#[derive(Deserialize)]
struct MockQuoteBody {
    mock: bool,
    #[serde(default)]
    rtmr3: Option<String>,
}

/// Verify a birth certificate end-to-end: quote -> pubkey -> signatures ->
/// RTMR3 -> allowlist, in the exact order documented by spec.md §4.3.
/// Any failure short-circuits with a machine-parsable `reason`.
pub async fn verify(
    cert: &BirthCertificate,
    allowlist: &Allowlist,
    parser: &(dyn QuoteParser),
) -> VerificationOutcome {
    // Rule 1: mock detection.
    if let Some(outcome) = try_mock_path(cert, allowlist) {
        return outcome;
    }

    // Rule 2: quote parse (external parser, falling back to local offsets
    // is the caller's `parser`'s concern via `FallbackQuoteParser`).
    let parsed = match parser.parse(&cert.attestation_quote).await {
        Ok(parsed) => parsed,
        Err(e) => return VerificationOutcome::reject(format!("quote parse failed: {e}")),
    };

    // Rule 3: pubkey extraction + exact compare.
    if parsed.report_data.len() < 32 {
        return VerificationOutcome::reject("report_data shorter than 32 bytes");
    }
    let extracted_pubkey_hex = hex::encode(&parsed.report_data[..32]);
    let expected_pubkey_hex = cert.tee_pubkey.to_ascii_lowercase();
    if extracted_pubkey_hex != expected_pubkey_hex {
        return VerificationOutcome::reject(
            "quote report-data pubkey does not match birth certificate teePubkey",
        );
    }

    // Rule 4: TEE signature.
    if let Err(reason) = verify_tee_signature(cert) {
        return VerificationOutcome::reject(reason);
    }

    // Rule 5: RTMR3 consistency, if the quote format exposes one.
    if let Some(parsed_rtmr3) = &parsed.rtmr3 {
        let parsed_rtmr3_hex = hex::encode(parsed_rtmr3);
        if parsed_rtmr3_hex != cert.rtmr3.to_ascii_lowercase() {
            return VerificationOutcome::reject(
                "quote RTMR3 does not match birth certificate rtmr3",
            );
        }
    }

    // Rule 6: allowlist (incl. TOFU locking).
    if !allowlist.check_and_admit(&cert.rtmr3) {
        return VerificationOutcome::reject("rtmr3 not in allowlist");
    }

    let platform = if parsed.rtmr3.is_some() {
        Platform::Tdx
    } else {
        Platform::SevSnp
    };
    VerificationOutcome::accept(cert.rtmr3.clone(), cert.tee_pubkey.clone(), platform)
}

/// Attempt the mock path (spec.md §4.3 rule 1): decode the quote as base64
/// JSON; if it carries `mock: true`, verify only BC-1 and allowlist
/// membership. Returns `None` to fall through to the hardware path.
fn try_mock_path(cert: &BirthCertificate, allowlist: &Allowlist) -> Option<VerificationOutcome> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&cert.attestation_quote)
        .ok()?;
    let body: MockQuoteBody = serde_json::from_slice(&decoded).ok()?;
    if !body.mock {
        return None;
    }

    if let Err(reason) = verify_tee_signature(cert) {
        return Some(VerificationOutcome::reject(reason));
    }

    if !allowlist.check_and_admit(&cert.rtmr3) {
        return Some(VerificationOutcome::reject("rtmr3 not in allowlist"));
    }

    Some(VerificationOutcome::accept(
        cert.rtmr3.clone(),
        cert.tee_pubkey.clone(),
        Platform::Mock,
    ))
}

fn verify_tee_signature(cert: &BirthCertificate) -> Result<(), String> {
    let pubkey_bytes = hex::decode(&cert.tee_pubkey)
        .map_err(|e| format!("malformed teePubkey hex: {e}"))?;
    let pubkey_bytes: [u8; 32] = pubkey_bytes
        .try_into()
        .map_err(|_| "teePubkey must be 32 bytes".to_string())?;
    let verifying_key = VerifyingKey::from_bytes(&pubkey_bytes)
        .map_err(|e| format!("invalid teePubkey: {e}"))?;

    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(&cert.tee_signature)
        .map_err(|e| format!("malformed teeSignature base64: {e}"))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| "teeSignature must be 64 bytes".to_string())?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify_strict(cert.canonical_message().as_bytes(), &signature)
        .map_err(|_| "TEE signature verification failed".to_string())
}

/// Verify the wallet signature over the canonical message (spec.md BC-2,
/// §8's second testable property). Exposed separately because the
/// Coordinator's registration pipeline (spec.md §4.5 step 3) checks this
/// using the wallet pubkey it derives from `walletAddress`, independent of
/// the attestation path above.
pub fn verify_wallet_signature(
    cert: &BirthCertificate,
    wallet_pubkey: &VerifyingKey,
) -> Result<(), String> {
    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(&cert.wallet_signature)
        .map_err(|e| format!("malformed walletSignature base64: {e}"))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| "walletSignature must be 64 bytes".to_string())?;
    let signature = Signature::from_bytes(&sig_bytes);
    wallet_pubkey
        .verify_strict(cert.canonical_message().as_bytes(), &signature)
        .map_err(|_| "wallet signature verification failed".to_string())
}
