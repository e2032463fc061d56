//! Error type for the blockchain settlement layer.

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("transaction did not confirm: {0}")]
    Confirmation(String),
}
