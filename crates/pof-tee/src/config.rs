//! TEE provider selection, read from `POF_TEE_PROVIDER` (spec.md §6).

use std::str::FromStr;

use crate::error::TeeError;

/// Which [`crate::TeeProvider`] backend an agent boots with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeProviderKind {
    /// Deterministic, dependency-free mock (local/dev/test).
    Mock,
    /// SecretVM-backed hardware attestation and signing.
    SecretVm,
}

impl FromStr for TeeProviderKind {
    type Err = TeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "secretvm" => Ok(Self::SecretVm),
            other => Err(TeeError::Config(format!(
                "unknown POF_TEE_PROVIDER: {other} (expected mock or secretvm)"
            ))),
        }
    }
}
