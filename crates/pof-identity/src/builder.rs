//! Birth-certificate construction (spec.md §4.2, C2).

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use pof_tee::TeeProvider;
use pof_types::birth_cert::canonical_message;
use pof_types::BirthCertificate;

use crate::error::IdentityError;

/// Assembles and dual-signs an agent's [`BirthCertificate`], satisfying
/// BC-1..BC-4. Every step must succeed or the whole operation fails — there
/// is no partially-built certificate.
pub struct BirthCertificateBuilder<'a> {
    tee: &'a dyn TeeProvider,
}

impl<'a> BirthCertificateBuilder<'a> {
    pub fn new(tee: &'a dyn TeeProvider) -> Self {
        Self { tee }
    }

    /// Build a certificate for `agent_name`, owning `wallet_key`, deployed
    /// as `docker_image`. `code_manifest` is the stable code-identity input
    /// `codeHash` is computed over (spec.md §4.2: "e.g., the manifest") —
    /// in practice the agent binary's own build manifest or checksum file.
    pub async fn build(
        &self,
        agent_name: &str,
        wallet_key: &SigningKey,
        docker_image: &str,
        code_manifest: &[u8],
    ) -> Result<BirthCertificate, IdentityError> {
        let rtmr3 = self.tee.get_code_measurement().await?;
        let tee_pubkey = self.tee.get_tee_public_key().await?;
        let attestation_quote = self.tee.get_attestation_quote().await?;

        let code_hash = hex::encode(Sha256::digest(code_manifest));
        let wallet_address = bs58::encode(wallet_key.verifying_key().to_bytes()).into_string();
        let timestamp = now_millis();

        let message = canonical_message(
            agent_name,
            &wallet_address,
            docker_image,
            &code_hash,
            &rtmr3,
            timestamp,
        );

        let tee_signature = self.tee.sign_with_tee_key(message.as_bytes()).await?;
        let wallet_signature = base64::engine::general_purpose::STANDARD
            .encode(wallet_key.sign(message.as_bytes()).to_bytes());

        Ok(BirthCertificate {
            agent_name: agent_name.to_string(),
            wallet_address,
            docker_image: docker_image.to_string(),
            code_hash,
            rtmr3,
            timestamp,
            tee_pubkey,
            attestation_quote,
            tee_signature,
            wallet_signature,
        })
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::VerifyingKey;
    use pof_tee::MockTeeProvider;

    #[tokio::test]
    async fn builds_a_certificate_satisfying_bc1_through_bc4() {
        let tee = MockTeeProvider::new("alice");
        let builder = BirthCertificateBuilder::new(&tee);
        let wallet_key = SigningKey::from_bytes(&[9u8; 32]);

        let cert = builder
            .build("alice", &wallet_key, "proofofflip/agent:v1", b"manifest-bytes")
            .await
            .unwrap();

        // BC-1: tee signature verifies under teePubkey over the canonical message.
        let tee_pubkey_bytes: [u8; 32] = hex::decode(&cert.tee_pubkey).unwrap().try_into().unwrap();
        let tee_verifying_key = VerifyingKey::from_bytes(&tee_pubkey_bytes).unwrap();
        let sig_bytes: [u8; 64] = base64::engine::general_purpose::STANDARD
            .decode(&cert.tee_signature)
            .unwrap()
            .try_into()
            .unwrap();
        tee_verifying_key
            .verify_strict(cert.canonical_message().as_bytes(), &ed25519_dalek::Signature::from_bytes(&sig_bytes))
            .expect("BC-1");

        // BC-2: wallet signature verifies under the wallet pubkey.
        let wallet_sig_bytes: [u8; 64] = base64::engine::general_purpose::STANDARD
            .decode(&cert.wallet_signature)
            .unwrap()
            .try_into()
            .unwrap();
        wallet_key
            .verifying_key()
            .verify_strict(
                cert.canonical_message().as_bytes(),
                &ed25519_dalek::Signature::from_bytes(&wallet_sig_bytes),
            )
            .expect("BC-2");

        // BC-3: quote report-data embeds teePubkey.
        let decoded_quote = base64::engine::general_purpose::STANDARD
            .decode(&cert.attestation_quote)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded_quote).unwrap();
        let report_data = value["report_data"].as_str().unwrap();
        assert_eq!(&report_data[..64], cert.tee_pubkey.as_str());

        // BC-4: quote's rtmr3 (mock path) equals the certificate's rtmr3.
        assert_eq!(value["rtmr3"].as_str().unwrap(), cert.rtmr3.as_str());
    }

    #[tokio::test]
    async fn wallet_address_is_base58_of_the_wallet_pubkey() {
        let tee = MockTeeProvider::new("bob");
        let builder = BirthCertificateBuilder::new(&tee);
        let wallet_key = SigningKey::from_bytes(&[1u8; 32]);
        let cert = builder
            .build("bob", &wallet_key, "img", b"manifest")
            .await
            .unwrap();
        assert_eq!(
            cert.wallet_address,
            bs58::encode(wallet_key.verifying_key().to_bytes()).into_string()
        );
    }
}
