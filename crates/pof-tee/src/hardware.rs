//! SecretVM-backed hardware TEE provider (spec.md §4.1 "Hardware variant").
//!
//! Fetches a self-signed HTTPS endpoint whose HTML body embeds the raw quote
//! as hex inside a well-known element, parses RTMR3 and the TEE public key
//! from it (with documented fixed-offset fallbacks), and delegates signing
//! to a loopback-only signing service. All three reads are cached after
//! their first success, per spec.md's failure semantics: a read that never
//! succeeded once is fatal on first boot, but a cached value survives any
//! later transient failure of the same endpoint.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::TeeError;
use crate::TeeProvider;

/// The element id the attestation HTML page is expected to carry the raw
/// quote hex inside (as text content, e.g. `<pre id="quote-hex">...</pre>`).
const QUOTE_ELEMENT_ID: &str = "quote-hex";

/// The labelled-match prefix used to find RTMR3 directly in the HTML before
/// falling back to fixed-offset parsing of the decoded quote body.
const RTMR3_LABEL: &str = "RTMR3:";

#[derive(Debug, Clone)]
pub struct HardwareTeeConfig {
    /// Self-signed HTTPS endpoint returning the attestation HTML page.
    pub attestation_url: String,
    /// Loopback-only signing service, e.g. `http://127.0.0.1:29343/sign`.
    pub signing_url: String,
    /// Optional mounted PEM file holding the enclave's ed25519 public key.
    pub pubkey_pem_path: Option<PathBuf>,
    /// Request timeout applied to every call against either endpoint.
    pub timeout: Duration,
}

impl HardwareTeeConfig {
    /// Load from the environment variables named in spec.md §6.
    pub fn from_env() -> Result<Self, TeeError> {
        let attestation_url = std::env::var("POF_ATTESTATION_URL")
            .map_err(|_| TeeError::Config("POF_ATTESTATION_URL is required".into()))?;
        let signing_url = std::env::var("POF_SIGNING_URL")
            .map_err(|_| TeeError::Config("POF_SIGNING_URL is required".into()))?;
        let pubkey_pem_path = std::env::var("POF_TEE_PUBKEY_PEM_PATH").ok().map(PathBuf::from);
        Ok(Self {
            attestation_url,
            signing_url,
            pubkey_pem_path,
            timeout: Duration::from_secs(10),
        })
    }
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

pub struct HardwareTeeProvider {
    config: HardwareTeeConfig,
    client: reqwest::Client,
    quote_hex: OnceCell<String>,
    rtmr3: OnceCell<String>,
    pubkey: OnceCell<String>,
}

impl HardwareTeeProvider {
    pub fn new(config: HardwareTeeConfig) -> Result<Self, TeeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TeeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            quote_hex: OnceCell::new(),
            rtmr3: OnceCell::new(),
            pubkey: OnceCell::new(),
        })
    }

    async fn fetch_quote_hex(&self) -> Result<String, TeeError> {
        if let Some(cached) = self.quote_hex.get() {
            return Ok(cached.clone());
        }
        let html = self
            .client
            .get(&self.config.attestation_url)
            .send()
            .await
            .map_err(|e| TeeError::Transport(format!("GET {}: {e}", self.config.attestation_url)))?
            .text()
            .await
            .map_err(|e| TeeError::Transport(format!("reading attestation body: {e}")))?;
        let hex_str = extract_quote_hex(&html)
            .ok_or_else(|| TeeError::Parse(format!("no #{QUOTE_ELEMENT_ID} element found")))?;
        Ok(self.quote_hex.get_or_init(|| async { hex_str }).await.clone())
    }

    async fn decoded_quote(&self) -> Result<Vec<u8>, TeeError> {
        let hex_str = self.fetch_quote_hex().await?;
        hex::decode(hex_str.trim()).map_err(|e| TeeError::Parse(format!("quote hex decode: {e}")))
    }
}

#[async_trait]
impl TeeProvider for HardwareTeeProvider {
    async fn get_code_measurement(&self) -> Result<String, TeeError> {
        if let Some(cached) = self.rtmr3.get() {
            return Ok(cached.clone());
        }
        let html = self
            .client
            .get(&self.config.attestation_url)
            .send()
            .await
            .map_err(|e| TeeError::Transport(format!("GET {}: {e}", self.config.attestation_url)))?
            .text()
            .await
            .map_err(|e| TeeError::Transport(format!("reading attestation body: {e}")))?;

        let value = if let Some(labelled) = extract_labelled_hex(&html, RTMR3_LABEL) {
            labelled
        } else {
            let decoded = self.decoded_quote().await?;
            let parsed = pof_types::parse_quote_body(&decoded)
                .ok_or_else(|| TeeError::Parse("quote too short to contain RTMR3".into()))?;
            let rtmr3 = parsed
                .rtmr3
                .ok_or_else(|| TeeError::Parse("quote has no RTMR3 field".into()))?;
            hex::encode(rtmr3)
        };
        Ok(self.rtmr3.get_or_init(|| async { value }).await.clone())
    }

    async fn get_tee_public_key(&self) -> Result<String, TeeError> {
        if let Some(cached) = self.pubkey.get() {
            return Ok(cached.clone());
        }
        let value = if let Some(path) = &self.config.pubkey_pem_path {
            let pem_text = std::fs::read_to_string(path)
                .map_err(|e| TeeError::File(path.display().to_string(), e))?;
            hex::encode(pubkey_from_pem(&pem_text)?)
        } else {
            let decoded = self.decoded_quote().await?;
            let parsed = pof_types::parse_quote_body(&decoded)
                .ok_or_else(|| TeeError::Parse("quote too short to contain report-data".into()))?;
            hex::encode(&parsed.report_data[..32])
        };
        Ok(self.pubkey.get_or_init(|| async { value }).await.clone())
    }

    async fn get_attestation_quote(&self) -> Result<String, TeeError> {
        let decoded = self.decoded_quote().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(decoded))
    }

    async fn sign_with_tee_key(&self, payload: &[u8]) -> Result<String, TeeError> {
        let response = self
            .client
            .post(&self.config.signing_url)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| TeeError::Transport(format!("POST {}: {e}", self.config.signing_url)))?
            .json::<SignResponse>()
            .await
            .map_err(|e| TeeError::Parse(format!("signing response: {e}")))?;
        Ok(response.signature)
    }
}

/// Pull the raw hex text out of `<... id="quote-hex" ...>HEX</...>`.
fn extract_quote_hex(html: &str) -> Option<String> {
    let marker = format!(r#"id="{QUOTE_ELEMENT_ID}""#);
    let start_of_tag = html.find(&marker)?;
    let content_start = html[start_of_tag..].find('>')? + start_of_tag + 1;
    let content_end = html[content_start..].find('<')? + content_start;
    let hex_text: String = html[content_start..content_end]
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();
    if hex_text.len() >= 96 {
        Some(hex_text)
    } else {
        None
    }
}

/// Find `"{label}<hex>"` anywhere in `html` and return the hex run after it.
fn extract_labelled_hex(html: &str, label: &str) -> Option<String> {
    let idx = html.find(label)? + label.len();
    let hex_text: String = html[idx..]
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    if hex_text.is_empty() {
        None
    } else {
        Some(hex_text)
    }
}

/// Extract the raw 32-byte ed25519 public key from an SPKI PEM: the DER
/// payload's trailing 32 bytes are the raw key regardless of the leading
/// AlgorithmIdentifier, since ed25519 keys carry no parameters.
fn pubkey_from_pem(pem_text: &str) -> Result<[u8; 32], TeeError> {
    let body: String = pem_text
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::engine::general_purpose::STANDARD
        .decode(body.trim())
        .map_err(|e| TeeError::Parse(format!("PEM base64 decode: {e}")))?;
    if der.len() < 32 {
        return Err(TeeError::Parse("PEM DER payload shorter than 32 bytes".into()));
    }
    let tail = &der[der.len() - 32..];
    let mut key = [0u8; 32];
    key.copy_from_slice(tail);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quote_hex_from_well_known_element() {
        let html = r#"<html><body><pre id="quote-hex">deadbeefcafe0000000000000000000000000000000000000000000000000000000000000000000000000000000000</pre></body></html>"#;
        let hex_str = extract_quote_hex(html).expect("extracts");
        assert!(hex_str.starts_with("deadbeefcafe"));
    }

    #[test]
    fn extracts_labelled_rtmr3() {
        let html = "<div>RTMR3: abcdef0123456789</div>";
        assert_eq!(
            extract_labelled_hex(html, "RTMR3:").as_deref(),
            Some("abcdef0123456789")
        );
    }

    #[test]
    fn missing_element_returns_none() {
        assert!(extract_quote_hex("<html></html>").is_none());
    }
}
