//! Shared data model for ProofOfFlip.
//!
//! Every type here crosses at least one process boundary (agent <-> agent,
//! agent <-> coordinator, or the persistence blob contract), so all of them
//! are `Serialize`/`Deserialize`. Nothing in this crate talks to a TEE,
//! parses a quote, or touches a wallet keypair — it only describes the
//! shapes those other crates exchange.

pub mod agent;
pub mod birth_cert;
pub mod constants;
pub mod game;
pub mod quote_offsets;

pub use agent::{Agent, AgentStatus};
pub use birth_cert::BirthCertificate;
pub use constants::*;
pub use game::GameResult;
pub use quote_offsets::{parse_quote_body, ParsedQuoteBody};
