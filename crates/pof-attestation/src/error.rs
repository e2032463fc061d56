//! Error type for the attestation verifier.

/// Errors that can prevent a verification attempt from completing at all
/// (as opposed to a verification that completes and reports `ok: false`).
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    /// The external quote-parser service and the local fallback both failed.
    #[error("quote parse failed: {0}")]
    QuoteParse(String),

    /// A hex/base64 field on the birth certificate was malformed.
    #[error("malformed field: {0}")]
    MalformedField(String),
}
