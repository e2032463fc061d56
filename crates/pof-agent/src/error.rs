//! Error type for the agent runtime.

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("identity error: {0}")]
    Identity(#[from] pof_identity::IdentityError),

    #[error("chain error: {0}")]
    Chain(#[from] pof_chain::ChainError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("registration exhausted retries: {0}")]
    RegistrationRetriesExhausted(String),

    #[error("x402 handshake failed: {0}")]
    X402Handshake(String),

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("boot error: {0}")]
    Boot(String),
}
