//! Error type for the Coordinator.

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("identity error: {0}")]
    Identity(#[from] pof_identity::IdentityError),

    #[error("chain error: {0}")]
    Chain(#[from] pof_chain::ChainError),

    #[error("boot error: {0}")]
    Boot(String),
}
