//! Coordinator configuration loaded from environment variables (spec.md
//! §6 "Environment inputs").

use std::path::PathBuf;

use anyhow::{Context, Result};

use pof_attestation::Allowlist;
use pof_tee::TeeProviderKind;
use pof_types::{DEFAULT_MAX_ACTIVE, USDC_MINT_MAINNET};

/// Which [`pof_chain::ChainClient`] backend the Coordinator boots with,
/// same duality as `pof-agent`'s `ChainProviderKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainProviderKind {
    Mock,
    Solana,
}

impl std::str::FromStr for ChainProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "solana" => Ok(Self::Solana),
            other => anyhow::bail!("unknown POF_CHAIN_PROVIDER: {other} (expected mock or solana)"),
        }
    }
}

/// Which RTMR3 allowlist mode to boot the registry with (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowlistMode {
    Explicit(Vec<String>),
    Tofu,
    Open,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Where the Coordinator's own identity blob is persisted
    /// (`dashboard-identity.json` equivalent, spec.md §6).
    pub storage_path: PathBuf,
    /// Where the Coordinator's own wallet secret key is persisted
    /// (`dashboard-wallet.json` equivalent, spec.md §6).
    pub wallet_path: PathBuf,
    pub tee_provider: TeeProviderKind,
    pub docker_image: String,
    pub bind_addr: String,
    pub rpc_url: String,
    pub chain_provider: ChainProviderKind,
    pub token_mint: String,
    pub allowlist_mode: AllowlistMode,
    /// External quote-parser URL; `None` means every verification goes
    /// straight to the local fixed-offset fallback (spec.md §7).
    pub quote_parser_url: Option<String>,
    pub max_active: usize,
    pub sol_topup_lamports: u64,
    pub sol_topup_throttle_secs: u64,
    pub attestation_url: Option<String>,
    pub signing_url: Option<String>,
    pub tee_pubkey_pem_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_dir = std::env::var("POF_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".proofofflip")
            });

        let storage_path = std::env::var("POF_COORDINATOR_IDENTITY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("dashboard-identity.json"));

        let wallet_path = std::env::var("POF_COORDINATOR_WALLET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("dashboard-wallet.json"));

        let tee_provider: TeeProviderKind = std::env::var("POF_TEE_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()
            .map_err(|e: pof_tee::TeeError| anyhow::anyhow!(e.to_string()))
            .context("invalid POF_TEE_PROVIDER")?;

        let docker_image = std::env::var("POF_DOCKER_IMAGE")
            .unwrap_or_else(|_| "proofofflip/coordinator:latest".to_string());

        let bind_addr =
            std::env::var("POF_COORDINATOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let rpc_url =
            std::env::var("POF_RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8899".to_string());

        let chain_provider: ChainProviderKind = std::env::var("POF_CHAIN_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()
            .context("invalid POF_CHAIN_PROVIDER")?;

        let token_mint =
            std::env::var("POF_TOKEN_MINT").unwrap_or_else(|_| USDC_MINT_MAINNET.to_string());

        let allowlist_mode = match std::env::var("POF_RTMR3_ALLOWLIST_MODE")
            .unwrap_or_else(|_| "explicit".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "tofu" => AllowlistMode::Tofu,
            "open" => AllowlistMode::Open,
            "explicit" => {
                let values = std::env::var("POF_RTMR3_ALLOWLIST").unwrap_or_default();
                AllowlistMode::Explicit(
                    values
                        .split(',')
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect(),
                )
            }
            other => anyhow::bail!("unknown POF_RTMR3_ALLOWLIST_MODE: {other}"),
        };

        let quote_parser_url = std::env::var("POF_QUOTE_PARSER_URL").ok();

        let max_active: usize = std::env::var("POF_MAX_ACTIVE")
            .unwrap_or_else(|_| DEFAULT_MAX_ACTIVE.to_string())
            .parse()
            .context("POF_MAX_ACTIVE must be an integer")?;

        let sol_topup_lamports: u64 = std::env::var("POF_SOL_TOPUP_LAMPORTS")
            .unwrap_or_else(|_| "20000000".to_string())
            .parse()
            .context("POF_SOL_TOPUP_LAMPORTS must be an integer")?;

        let sol_topup_throttle_secs: u64 = std::env::var("POF_SOL_TOPUP_THROTTLE_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("POF_SOL_TOPUP_THROTTLE_SECS must be an integer")?;

        let attestation_url = std::env::var("POF_ATTESTATION_URL").ok();
        let signing_url = std::env::var("POF_SIGNING_URL").ok();
        let tee_pubkey_pem_path = std::env::var("POF_TEE_PUBKEY_PEM_PATH").ok().map(PathBuf::from);

        if tee_provider == TeeProviderKind::SecretVm
            && (attestation_url.is_none() || signing_url.is_none())
        {
            anyhow::bail!(
                "POF_TEE_PROVIDER=secretvm requires POF_ATTESTATION_URL and POF_SIGNING_URL"
            );
        }

        Ok(Self {
            storage_path,
            wallet_path,
            tee_provider,
            docker_image,
            bind_addr,
            rpc_url,
            chain_provider,
            token_mint,
            allowlist_mode,
            quote_parser_url,
            max_active,
            sol_topup_lamports,
            sol_topup_throttle_secs,
            attestation_url,
            signing_url,
            tee_pubkey_pem_path,
        })
    }
}

/// Build the [`Allowlist`] named by [`Config::allowlist_mode`].
pub fn build_allowlist(mode: &AllowlistMode) -> Allowlist {
    match mode {
        AllowlistMode::Explicit(values) => Allowlist::explicit(values.iter().cloned()),
        AllowlistMode::Tofu => Allowlist::tofu(),
        AllowlistMode::Open => Allowlist::open(),
    }
}
