//! Deterministic in-memory [`ChainClient`] used by every test in the
//! workspace and by local/mock deployments.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use ed25519_dalek::SigningKey;

use crate::client::{ChainClient, ChainTransaction};
use crate::error::ChainError;

/// Derive the bs58 wallet address owning `secret_key`, the same way
/// `pof-identity`'s builder does. Exposed for tests that need to compute
/// the address of a secret key they're about to fund.
pub fn wallet_address_of(secret_key: &[u8; 32]) -> String {
    let signing_key = SigningKey::from_bytes(secret_key);
    bs58::encode(signing_key.verifying_key().to_bytes()).into_string()
}

#[derive(Default)]
pub struct MockChainClient {
    native_balances: DashMap<String, u64>,
    token_balances: DashMap<String, u64>,
    atas: DashMap<String, String>,
    /// Newest-first transaction history per wallet.
    history: DashMap<String, Vec<ChainTransaction>>,
    tx_counter: AtomicU64,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_signature(&self) -> String {
        let n = self.tx_counter.fetch_add(1, Ordering::Relaxed);
        format!("mock-tx-{n}")
    }

    /// Test/bootstrap helper: grant `wallet` an initial token balance
    /// without going through [`ChainClient::transfer_token`] (mirrors the
    /// Coordinator's own initial-funding transfer, spec.md §4.5 step 6).
    pub fn fund_token(&self, wallet: &str, amount: u64) {
        *self.token_balances.entry(wallet.to_string()).or_insert(0) += amount;
    }

    pub fn fund_native(&self, wallet: &str, lamports: u64) {
        *self.native_balances.entry(wallet.to_string()).or_insert(0) += lamports;
    }

    /// Inject a transaction into `wallet`'s history that did not originate
    /// from a [`ChainClient::transfer_token`] call on this client — used to
    /// simulate a third-party donation distinct from a recorded game
    /// payment (spec.md §8 scenario 6).
    pub fn inject_transaction(&self, wallet: &str, tx: ChainTransaction) {
        self.history.entry(wallet.to_string()).or_default().insert(0, tx);
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn native_balance(&self, wallet: &str) -> Result<u64, ChainError> {
        Ok(self.native_balances.get(wallet).map(|v| *v).unwrap_or(0))
    }

    async fn token_balance(&self, wallet: &str) -> Result<u64, ChainError> {
        Ok(self.token_balances.get(wallet).map(|v| *v).unwrap_or(0))
    }

    async fn ensure_associated_token_account(&self, owner: &str) -> Result<String, ChainError> {
        let ata = self
            .atas
            .entry(owner.to_string())
            .or_insert_with(|| format!("ATA({owner})"))
            .clone();
        Ok(ata)
    }

    async fn transfer_token(
        &self,
        from_secret_key: &[u8; 32],
        to_wallet: &str,
        amount: u64,
    ) -> Result<String, ChainError> {
        let from_wallet = wallet_address_of(from_secret_key);
        {
            let mut from_balance = self.token_balances.entry(from_wallet.clone()).or_insert(0);
            if *from_balance < amount {
                return Err(ChainError::InsufficientBalance {
                    have: *from_balance,
                    need: amount,
                });
            }
            *from_balance -= amount;
        }
        *self.token_balances.entry(to_wallet.to_string()).or_insert(0) += amount;

        let signature = self.next_signature();
        self.history.entry(from_wallet.clone()).or_default().insert(
            0,
            ChainTransaction {
                signature: signature.clone(),
                amount,
                counterparty: Some(to_wallet.to_string()),
            },
        );
        self.history.entry(to_wallet.to_string()).or_default().insert(
            0,
            ChainTransaction {
                signature: signature.clone(),
                amount,
                counterparty: Some(from_wallet),
            },
        );
        Ok(signature)
    }

    async fn transfer_native(
        &self,
        from_secret_key: &[u8; 32],
        to_wallet: &str,
        lamports: u64,
    ) -> Result<String, ChainError> {
        let from_wallet = wallet_address_of(from_secret_key);
        {
            let mut from_balance = self.native_balances.entry(from_wallet).or_insert(0);
            if *from_balance < lamports {
                return Err(ChainError::InsufficientBalance {
                    have: *from_balance,
                    need: lamports,
                });
            }
            *from_balance -= lamports;
        }
        *self.native_balances.entry(to_wallet.to_string()).or_insert(0) += lamports;
        Ok(self.next_signature())
    }

    async fn recent_token_transactions(
        &self,
        wallet: &str,
    ) -> Result<Vec<ChainTransaction>, ChainError> {
        Ok(self.history.get(wallet).map(|v| v.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_moves_balance_and_conserves_total() {
        let client = MockChainClient::new();
        let from_secret = [1u8; 32];
        let from_wallet = wallet_address_of(&from_secret);
        client.fund_token(&from_wallet, 1_000_000);

        let sig = client.transfer_token(&from_secret, "bob-wallet", 10_000).await.unwrap();
        assert!(!sig.is_empty());
        assert_eq!(client.token_balance(&from_wallet).await.unwrap(), 990_000);
        assert_eq!(client.token_balance("bob-wallet").await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected() {
        let client = MockChainClient::new();
        let from_secret = [2u8; 32];
        let err = client
            .transfer_token(&from_secret, "bob-wallet", 10_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn injected_donation_appears_in_history_without_a_transfer() {
        let client = MockChainClient::new();
        client.inject_transaction(
            "alice-wallet",
            ChainTransaction {
                signature: "T2".into(),
                amount: 250_000,
                counterparty: Some("donor-wallet".into()),
            },
        );
        let history = client.recent_token_transactions("alice-wallet").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signature, "T2");
    }
}
