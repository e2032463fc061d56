//! TEE provider abstraction (spec.md §4.1, C1).
//!
//! A [`TeeProvider`] exposes the four primitives a [`pof-identity`] birth
//! certificate is built from: the code measurement (RTMR3), the enclave's
//! ed25519 public key, a hardware-signed attestation quote binding that key,
//! and a signing call over an arbitrary payload. Two implementations exist:
//! [`mock::MockTeeProvider`] (deterministic, dependency-free, used by every
//! test and by local/dev deployments) and [`hardware::HardwareTeeProvider`]
//! (the documented SecretVM HTML-scrape + loopback-signing contract).

pub mod config;
pub mod error;
pub mod hardware;
pub mod mock;

use async_trait::async_trait;

pub use config::TeeProviderKind;
pub use error::TeeError;
pub use hardware::HardwareTeeProvider;
pub use mock::MockTeeProvider;

/// Capability set a TEE backend must provide (spec.md §4.1).
///
/// Object-safe so the agent runtime can hold a `Box<dyn TeeProvider>` chosen
/// at boot by [`TeeProviderKind`] without a generic parameter threading
/// through every caller.
#[async_trait]
pub trait TeeProvider: Send + Sync {
    /// The code integrity register value (RTMR3), hex-encoded.
    async fn get_code_measurement(&self) -> Result<String, TeeError>;

    /// The ed25519 public key of a keypair whose private half never leaves
    /// the enclave, hex-encoded.
    async fn get_tee_public_key(&self) -> Result<String, TeeError>;

    /// A hardware-signed blob whose report-data field embeds the public key
    /// returned by [`Self::get_tee_public_key`], base64-encoded.
    async fn get_attestation_quote(&self) -> Result<String, TeeError>;

    /// An ed25519 detached signature over `payload`, produced by the
    /// enclave's signing key, base64-encoded.
    async fn sign_with_tee_key(&self, payload: &[u8]) -> Result<String, TeeError>;
}
