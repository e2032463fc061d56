//! Error type for birth-certificate construction and persistence.

/// Errors from [`crate::builder::BirthCertificateBuilder`] or
/// [`crate::persistence`].
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("tee error: {0}")]
    Tee(#[from] pof_tee::TeeError),

    #[error("persisted identity is corrupt: {0}")]
    Corrupt(String),

    #[error("io error at {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
