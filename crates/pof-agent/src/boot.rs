//! `unborn -> booting` transition: load-or-generate the agent's identity
//! (spec.md §4.4, C2).

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use pof_chain::ChainClient;
use pof_identity::{BirthCertificateBuilder, IdentityBlob};
use pof_tee::{HardwareTeeConfig, HardwareTeeProvider, MockTeeProvider, TeeProvider, TeeProviderKind};
use pof_types::BirthCertificate;

use crate::config::Config;
use crate::error::AgentError;

/// The stable code-identity input `codeHash` is computed over. A real
/// deployment would point this at the agent binary's own build manifest;
/// here it is derived from the docker image tag, which is the one piece of
/// build provenance every deployment already carries.
fn code_manifest(config: &Config) -> Vec<u8> {
    config.docker_image.as_bytes().to_vec()
}

fn build_tee_provider(config: &Config) -> Result<Arc<dyn TeeProvider>, AgentError> {
    match config.tee_provider {
        TeeProviderKind::Mock => Ok(Arc::new(MockTeeProvider::new(config.agent_name.clone()))),
        TeeProviderKind::SecretVm => {
            let hw_config = HardwareTeeConfig {
                attestation_url: config
                    .attestation_url
                    .clone()
                    .ok_or_else(|| AgentError::Boot("POF_ATTESTATION_URL missing".into()))?,
                signing_url: config
                    .signing_url
                    .clone()
                    .ok_or_else(|| AgentError::Boot("POF_SIGNING_URL missing".into()))?,
                pubkey_pem_path: config.tee_pubkey_pem_path.clone(),
                timeout: std::time::Duration::from_secs(10),
            };
            let provider = HardwareTeeProvider::new(hw_config)
                .map_err(|e| AgentError::Boot(format!("hardware TEE provider init: {e}")))?;
            Ok(Arc::new(provider))
        }
    }
}

/// Outcome of the boot sequence: the chosen TEE provider, wallet keypair,
/// and the (possibly freshly-minted) birth certificate.
pub struct Booted {
    pub tee: Arc<dyn TeeProvider>,
    pub wallet_key: SigningKey,
    pub birth_cert: BirthCertificate,
}

/// Load a persisted identity blob if one exists, verifying it against the
/// live TEE (warn-only on RTMR3 drift); otherwise mint a fresh birth
/// certificate and persist it atomically. Either way, ensures the chosen
/// wallet carries its initial stablecoin funding exactly once via `chain`
/// is left to the caller — this function only establishes identity.
pub async fn boot(config: &Config) -> Result<Booted, AgentError> {
    let tee = build_tee_provider(config)?;

    if let Some(blob) = pof_identity::load(&config.storage_path)
        .map_err(AgentError::Identity)?
    {
        pof_identity::warn_on_rtmr3_drift(tee.as_ref(), &blob)
            .await
            .map_err(AgentError::Identity)?;
        let wallet_key = SigningKey::from_bytes(&blob.secret_key);
        return Ok(Booted {
            tee,
            wallet_key,
            birth_cert: blob.birth_cert,
        });
    }

    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let wallet_key = SigningKey::from_bytes(&seed);

    let builder = BirthCertificateBuilder::new(tee.as_ref());
    let birth_cert = builder
        .build(
            &config.agent_name,
            &wallet_key,
            &config.docker_image,
            &code_manifest(config),
        )
        .await
        .map_err(AgentError::Identity)?;

    let blob = IdentityBlob {
        secret_key: wallet_key.to_bytes(),
        birth_cert: birth_cert.clone(),
        personality: None,
    };
    pof_identity::save_atomic(&config.storage_path, &blob).map_err(AgentError::Identity)?;

    Ok(Booted {
        tee,
        wallet_key,
        birth_cert,
    })
}

/// Ensure this wallet carries its expected on-chain presence: an
/// associated token account. Initial *funding* is the Coordinator's
/// responsibility (spec.md §4.5 step 6); the agent only needs an ATA to
/// receive into.
pub async fn ensure_token_account(
    chain: &dyn ChainClient,
    wallet_address: &str,
) -> Result<String, AgentError> {
    chain
        .ensure_associated_token_account(wallet_address)
        .await
        .map_err(AgentError::Chain)
}
