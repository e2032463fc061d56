//! The ProofOfFlip agent runtime: boots an identity, serves the agent HTTP
//! contract, and plays the winner/loser roles a match assigns it (C4,
//! spec.md §4.4).

pub mod boot;
pub mod config;
pub mod donation;
pub mod error;
pub mod http;
pub mod match_protocol;
pub mod registration;
pub mod state;
pub mod topup;
pub mod wire;

pub use config::Config;
pub use error::AgentError;
pub use state::{AppState, BootState};
