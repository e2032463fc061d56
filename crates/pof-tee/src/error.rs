//! Error type for the TEE provider subsystem.

/// Errors that can occur while reading or using a TEE identity.
#[derive(Debug, thiserror::Error)]
pub enum TeeError {
    /// The quote/pubkey/signing endpoint could not be reached.
    #[error("tee transport error: {0}")]
    Transport(String),

    /// A response from the TEE endpoint could not be parsed.
    #[error("tee parse error: {0}")]
    Parse(String),

    /// A required file (PEM pubkey, mounted quote) was missing or unreadable.
    #[error("tee file error: {0}: {1}")]
    File(String, std::io::Error),

    /// The provider was misconfigured (missing URL, bad selector).
    #[error("tee config error: {0}")]
    Config(String),
}
