//! Agent configuration loaded from environment variables (spec.md §6
//! "Environment inputs").

use std::path::PathBuf;

use anyhow::{Context, Result};

use pof_tee::TeeProviderKind;
use pof_types::{INITIAL_FUNDING, USDC_MINT_MAINNET};

/// Which [`pof_chain::ChainClient`] backend to boot with. Not itself named
/// by spec.md's environment-inputs list (which only describes the RPC
/// URL), but needed for the same reason `POF_TEE_PROVIDER` is: so a local
/// deployment can run entirely against the deterministic mock without a
/// live validator, mirroring the TEE provider's mock/hardware duality.
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

#[derive(Clone, Debug)]
pub struct Config {
    /// This agent's short, Coordinator-unique identifier.
    pub agent_name: String,
    /// Which `pof-tee` backend to boot with.
    pub tee_provider: TeeProviderKind,
    /// Where the identity blob is persisted (spec.md §6 "Persistence
    /// layout").
    pub storage_path: PathBuf,
    /// Blockchain RPC endpoint.
    pub rpc_url: String,
    /// Which `ChainClient` backend to boot with.
    pub chain_provider: ChainProviderKind,
    /// Stablecoin mint address (spec.md §6 default: mainnet USDC).
    pub token_mint: String,
    /// The Coordinator's base URL, used for registration, donation
    /// reports, and gas top-up requests.
    pub coordinator_url: String,
    /// Override for the callback endpoint this agent advertises at
    /// registration; if unset, the Coordinator substitutes the observed
    /// source IP (spec.md §4.5 step 1).
    pub endpoint_override: Option<String>,
    /// Traceability string recorded on the birth certificate.
    pub docker_image: String,
    /// Address to bind this agent's HTTP server to.
    pub bind_addr: String,
    /// SOL balance (lamports) below which `/api/topup-sol` is requested.
    pub sol_topup_threshold_lamports: u64,
    /// Hardware-provider-only: see `pof_tee::hardware::HardwareTeeConfig`.
    pub attestation_url: Option<String>,
    pub signing_url: Option<String>,
    pub tee_pubkey_pem_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let agent_name = std::env::var("POF_AGENT_NAME").context("POF_AGENT_NAME is required")?;

        let tee_provider: TeeProviderKind = std::env::var("POF_TEE_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()
            .map_err(|e: pof_tee::TeeError| anyhow::anyhow!(e.to_string()))
            .context("invalid POF_TEE_PROVIDER")?;

        let storage_path = std::env::var("POF_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".proofofflip")
                    .join(format!("{agent_name}-state.json"))
            });

        let rpc_url =
            std::env::var("POF_RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8899".to_string());

        let chain_provider: ChainProviderKind = std::env::var("POF_CHAIN_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()
            .context("invalid POF_CHAIN_PROVIDER")?;

        let token_mint =
            std::env::var("POF_TOKEN_MINT").unwrap_or_else(|_| USDC_MINT_MAINNET.to_string());

        let coordinator_url = std::env::var("POF_COORDINATOR_URL")
            .context("POF_COORDINATOR_URL is required")?;

        let endpoint_override = std::env::var("POF_AGENT_ENDPOINT").ok();

        let docker_image = std::env::var("POF_DOCKER_IMAGE")
            .unwrap_or_else(|_| "proofofflip/agent:latest".to_string());

        let bind_addr =
            std::env::var("POF_AGENT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:80".to_string());

        let sol_topup_threshold_lamports: u64 = std::env::var("POF_SOL_TOPUP_THRESHOLD_LAMPORTS")
            .unwrap_or_else(|_| "10000000".to_string())
            .parse()
            .context("POF_SOL_TOPUP_THRESHOLD_LAMPORTS must be an integer")?;

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
            agent_name,
            tee_provider,
            storage_path,
            rpc_url,
            chain_provider,
            token_mint,
            coordinator_url,
            endpoint_override,
            docker_image,
            bind_addr,
            sol_topup_threshold_lamports,
            attestation_url,
            signing_url,
            tee_pubkey_pem_path,
        })
    }
}

/// Initial stablecoin funding an agent expects on first admission
/// (spec.md §6 "Constants"). Re-exported here so callers reading agent
/// config don't need to reach into `pof_types` directly.
pub const INITIAL_FUNDING_BASE_UNITS: u64 = INITIAL_FUNDING;
