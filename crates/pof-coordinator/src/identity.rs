//! The Coordinator's own TEE-attested identity (spec.md §6 persistence
//! layout: `dashboard-wallet.json` / `dashboard-identity.json`). It is
//! built exactly the way an agent's is — same builder, same TEE provider —
//! it simply never registers with itself (SPEC_FULL.md §6).

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use pof_identity::{BirthCertificateBuilder, IdentityBlob};
use pof_tee::{HardwareTeeConfig, HardwareTeeProvider, MockTeeProvider, TeeProvider, TeeProviderKind};
use pof_types::BirthCertificate;

use crate::config::Config;
use crate::error::CoordinatorError;

fn build_tee_provider(config: &Config) -> Result<Arc<dyn TeeProvider>, CoordinatorError> {
    match config.tee_provider {
        TeeProviderKind::Mock => Ok(Arc::new(MockTeeProvider::new("coordinator"))),
        TeeProviderKind::SecretVm => {
            let hw_config = HardwareTeeConfig {
                attestation_url: config
                    .attestation_url
                    .clone()
                    .ok_or_else(|| CoordinatorError::Boot("POF_ATTESTATION_URL missing".into()))?,
                signing_url: config
                    .signing_url
                    .clone()
                    .ok_or_else(|| CoordinatorError::Boot("POF_SIGNING_URL missing".into()))?,
                pubkey_pem_path: config.tee_pubkey_pem_path.clone(),
                timeout: std::time::Duration::from_secs(10),
            };
            let provider = HardwareTeeProvider::new(hw_config)
                .map_err(|e| CoordinatorError::Boot(format!("hardware TEE provider init: {e}")))?;
            Ok(Arc::new(provider))
        }
    }
}

pub struct CoordinatorIdentity {
    pub tee: Arc<dyn TeeProvider>,
    pub wallet_key: SigningKey,
    pub birth_cert: BirthCertificate,
}

/// Load-or-mint the Coordinator's own identity, persisted at
/// `config.storage_path`/`config.wallet_path` — the split mirrors
/// spec.md §6's two separate Coordinator files rather than the agent's
/// single combined blob, but the same [`IdentityBlob`] shape is reused so
/// `pof-identity`'s atomic save/load is not duplicated.
pub async fn boot(config: &Config) -> Result<CoordinatorIdentity, CoordinatorError> {
    let tee = build_tee_provider(config)?;

    if let Some(blob) = pof_identity::load(&config.storage_path)? {
        pof_identity::warn_on_rtmr3_drift(tee.as_ref(), &blob).await?;
        let wallet_key = SigningKey::from_bytes(&blob.secret_key);
        return Ok(CoordinatorIdentity {
            tee,
            wallet_key,
            birth_cert: blob.birth_cert,
        });
    }

    let wallet_key = if let Ok(bytes) = std::fs::read(&config.wallet_path) {
        let seed: [u8; 32] = bytes
            .get(..32)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CoordinatorError::Boot("dashboard wallet file is malformed".into()))?;
        SigningKey::from_bytes(&seed)
    } else {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        if let Some(parent) = config.wallet_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoordinatorError::Boot(format!("creating wallet dir: {e}")))?;
        }
        std::fs::write(&config.wallet_path, seed)
            .map_err(|e| CoordinatorError::Boot(format!("writing dashboard wallet: {e}")))?;
        SigningKey::from_bytes(&seed)
    };

    let builder = BirthCertificateBuilder::new(tee.as_ref());
    let birth_cert = builder
        .build(
            "coordinator",
            &wallet_key,
            &config.docker_image,
            config.docker_image.as_bytes(),
        )
        .await?;

    let blob = IdentityBlob {
        secret_key: wallet_key.to_bytes(),
        birth_cert: birth_cert.clone(),
        personality: None,
    };
    pof_identity::save_atomic(&config.storage_path, &blob)?;

    Ok(CoordinatorIdentity {
        tee,
        wallet_key,
        birth_cert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllowlistMode, ChainProviderKind};

    fn config_at(dir: &std::path::Path) -> Config {
        Config {
            storage_path: dir.join("dashboard-identity.json"),
            wallet_path: dir.join("dashboard-wallet.json"),
            tee_provider: TeeProviderKind::Mock,
            docker_image: "proofofflip/coordinator:test".to_string(),
            bind_addr: "0.0.0.0:0".to_string(),
            rpc_url: "http://127.0.0.1:8899".to_string(),
            chain_provider: ChainProviderKind::Mock,
            token_mint: pof_types::USDC_MINT_MAINNET.to_string(),
            allowlist_mode: AllowlistMode::Open,
            quote_parser_url: None,
            max_active: pof_types::DEFAULT_MAX_ACTIVE,
            sol_topup_lamports: 20_000_000,
            sol_topup_throttle_secs: 3600,
            attestation_url: None,
            signing_url: None,
            tee_pubkey_pem_path: None,
        }
    }

    #[tokio::test]
    async fn first_boot_mints_and_second_boot_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(dir.path());

        let first = boot(&config).await.unwrap();
        assert_eq!(first.birth_cert.agent_name, "coordinator");

        let second = boot(&config).await.unwrap();
        assert_eq!(first.birth_cert, second.birth_cert);
        assert_eq!(first.wallet_key.to_bytes(), second.wallet_key.to_bytes());
    }
}
