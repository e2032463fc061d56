//! Birth-certificate construction and identity persistence for ProofOfFlip
//! agents (C2, spec.md §4.2).

pub mod builder;
pub mod error;
pub mod persistence;

pub use builder::BirthCertificateBuilder;
pub use error::IdentityError;
pub use persistence::{load, save_atomic, warn_on_rtmr3_drift, IdentityBlob};
