//! Atomic identity persistence (spec.md §4.2, §6 "Persistence layout").

use std::path::Path;

use serde::{Deserialize, Serialize};

use pof_tee::TeeProvider;
use pof_types::BirthCertificate;

use crate::error::IdentityError;

/// The blob written to `POF_STORAGE_PATH` on first boot and read on every
/// restart: `{secretKey, birthCert, personality?}` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityBlob {
    /// Raw 32-byte ed25519 wallet secret key.
    pub secret_key: [u8; 32],
    pub birth_cert: BirthCertificate,
    /// Untyped personality config; nothing in this workspace interprets it
    /// (the LLM-backed chat system it feeds is out of scope per spec.md
    /// §1), but it must round-trip through persistence since the data
    /// model names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<serde_json::Value>,
}

/// Write `blob` to `path` atomically: serialize to a sibling `.tmp` file,
/// flush, then rename over the destination. A crash mid-write leaves the
/// original file (if any) untouched.
pub fn save_atomic(path: &Path, blob: &IdentityBlob) -> Result<(), IdentityError> {
    let json = serde_json::to_vec_pretty(blob)?;
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IdentityError::Io(parent.display().to_string(), e))?;
    }
    std::fs::write(&tmp_path, &json).map_err(|e| IdentityError::Io(tmp_path.display().to_string(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| IdentityError::Io(path.display().to_string(), e))?;
    Ok(())
}

/// Load a previously-persisted blob, if one exists at `path`.
pub fn load(path: &Path) -> Result<Option<IdentityBlob>, IdentityError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).map_err(|e| IdentityError::Io(path.display().to_string(), e))?;
    let blob: IdentityBlob = serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::Corrupt(format!("{}: {e}", path.display())))?;
    Ok(Some(blob))
}

/// Compare the TEE's *current* RTMR3 against the one baked into the
/// persisted certificate. A mismatch means the running code changed since
/// the certificate was minted; spec.md §4.2 says to log and continue — the
/// Coordinator, not the agent, is what ultimately rejects a stale identity
/// (any *fresh* registration from this agent will fail quote verification).
pub async fn warn_on_rtmr3_drift(tee: &dyn TeeProvider, blob: &IdentityBlob) -> Result<(), IdentityError> {
    let current_rtmr3 = tee.get_code_measurement().await?;
    if current_rtmr3 != blob.birth_cert.rtmr3 {
        tracing::warn!(
            stored_rtmr3 = %blob.birth_cert.rtmr3,
            current_rtmr3 = %current_rtmr3,
            "RTMR3 drift detected: running code differs from the code this identity was minted under"
        );
    }
    Ok(())
}
