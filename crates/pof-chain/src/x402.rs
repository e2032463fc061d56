//! x402 handshake wire types (spec.md §6 "x402 handshake (HTTP)").

use serde::{Deserialize, Serialize};

/// The body of the initial `402 Payment Required` response from `GET
/// /collect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct X402PaymentRequirements {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub address: String,
    pub token: String,
    pub amount: u64,
    pub network: String,
    pub description: String,
}

impl X402PaymentRequirements {
    pub fn new(address: impl Into<String>, token: impl Into<String>, amount: u64, description: impl Into<String>) -> Self {
        Self {
            kind: "x402".to_string(),
            version: "1".to_string(),
            address: address.into(),
            token: token.into(),
            amount,
            network: "solana-mainnet".to_string(),
            description: description.into(),
        }
    }
}

/// The value of the `X-Payment` header on the retry `GET /collect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct X402PaymentProof {
    pub tx_signature: String,
    pub amount: u64,
    pub payer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_requirements_round_trip_through_json() {
        let reqs = X402PaymentRequirements::new("WALLET", "MINT", 10_000, "game stake");
        let json = serde_json::to_string(&reqs).unwrap();
        assert!(json.contains(r#""type":"x402""#));
        let back: X402PaymentRequirements = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reqs);
    }
}
