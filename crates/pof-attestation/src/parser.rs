//! Quote parsing: an external-service-first, local-fallback `QuoteParser`
//! (spec.md §4.3 rule 2, §7 "External parser unavailable").

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AttestationError;

/// The fields recoverable from a quote, regardless of which parser produced
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuote {
    /// The 64-byte report-data field; the first 32 bytes are the bound
    /// public key (BC-3).
    pub report_data: Vec<u8>,
    /// The RTMR3 register, if the quote format/parser exposes one (BC-4).
    pub rtmr3: Option<Vec<u8>>,
}

/// Something that can turn a base64 attestation quote into its fields.
#[async_trait]
pub trait QuoteParser: Send + Sync {
    async fn parse(&self, quote_b64: &str) -> Result<ParsedQuote, AttestationError>;
}

/// Decode-then-fixed-offset parsing, using the shared offsets `pof-tee`'s
/// hardware provider also relies on — see SPEC_FULL.md §9.3 for why both
/// sites share `pof_types::quote_offsets`.
#[derive(Default)]
pub struct LocalOffsetParser;

#[async_trait]
impl QuoteParser for LocalOffsetParser {
    async fn parse(&self, quote_b64: &str) -> Result<ParsedQuote, AttestationError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(quote_b64)
            .map_err(|e| AttestationError::MalformedField(format!("quote base64: {e}")))?;
        let parsed = pof_types::parse_quote_body(&decoded)
            .ok_or_else(|| AttestationError::QuoteParse("quote too short for fixed offsets".into()))?;
        Ok(ParsedQuote {
            report_data: parsed.report_data,
            rtmr3: parsed.rtmr3,
        })
    }
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    quote: &'a str,
}

#[derive(Deserialize)]
struct ParseResponse {
    report_data: String,
    rtmr3: Option<String>,
}

/// Delegates to an external PCCS-style quote-parsing service over HTTP.
pub struct HttpQuoteParser {
    client: reqwest::Client,
    parser_url: String,
}

impl HttpQuoteParser {
    pub fn new(parser_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with default TLS backend"),
            parser_url: parser_url.into(),
        }
    }
}

#[async_trait]
impl QuoteParser for HttpQuoteParser {
    async fn parse(&self, quote_b64: &str) -> Result<ParsedQuote, AttestationError> {
        let response = self
            .client
            .post(&self.parser_url)
            .json(&ParseRequest { quote: quote_b64 })
            .send()
            .await
            .map_err(|e| AttestationError::QuoteParse(format!("parser request: {e}")))?
            .error_for_status()
            .map_err(|e| AttestationError::QuoteParse(format!("parser status: {e}")))?
            .json::<ParseResponse>()
            .await
            .map_err(|e| AttestationError::QuoteParse(format!("parser response: {e}")))?;

        let report_data = hex::decode(&response.report_data)
            .map_err(|e| AttestationError::MalformedField(format!("report_data hex: {e}")))?;
        let rtmr3 = response
            .rtmr3
            .map(|r| hex::decode(r))
            .transpose()
            .map_err(|e| AttestationError::MalformedField(format!("rtmr3 hex: {e}")))?;
        Ok(ParsedQuote { report_data, rtmr3 })
    }
}

/// Tries `primary` first (the external service); on any failure, falls back
/// to [`LocalOffsetParser`]. Only if both fail is the quote rejected as
/// unparseable (spec.md §7).
pub struct FallbackQuoteParser<P> {
    primary: P,
    fallback: LocalOffsetParser,
}

impl<P: QuoteParser> FallbackQuoteParser<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: LocalOffsetParser,
        }
    }
}

#[async_trait]
impl<P: QuoteParser + Send + Sync> QuoteParser for FallbackQuoteParser<P> {
    async fn parse(&self, quote_b64: &str) -> Result<ParsedQuote, AttestationError> {
        match self.primary.parse(quote_b64).await {
            Ok(parsed) => Ok(parsed),
            Err(primary_err) => {
                tracing::warn!(error = %primary_err, "external quote parser failed, using local offsets");
                self.fallback.parse(quote_b64).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote_b64(report_data: [u8; 64], rtmr3: [u8; 48]) -> String {
        let mut body = vec![0u8; 600];
        body[pof_types::quote_offsets::REPORT_DATA_OFFSET
            ..pof_types::quote_offsets::REPORT_DATA_OFFSET + pof_types::quote_offsets::REPORT_DATA_LEN]
            .copy_from_slice(&report_data);
        body[pof_types::quote_offsets::RTMR3_OFFSET
            ..pof_types::quote_offsets::RTMR3_OFFSET + pof_types::quote_offsets::RTMR3_LEN]
            .copy_from_slice(&rtmr3);
        let mut quote = vec![0u8; pof_types::quote_offsets::HEADER_LEN];
        quote.extend_from_slice(&body);
        base64::engine::general_purpose::STANDARD.encode(quote)
    }

    #[tokio::test]
    async fn local_offset_parser_recovers_report_data_and_rtmr3() {
        let quote = sample_quote_b64([3u8; 64], [4u8; 48]);
        let parsed = LocalOffsetParser.parse(&quote).await.unwrap();
        assert_eq!(parsed.report_data, vec![3u8; 64]);
        assert_eq!(parsed.rtmr3, Some(vec![4u8; 48]));
    }

    struct AlwaysFails;
    #[async_trait]
    impl QuoteParser for AlwaysFails {
        async fn parse(&self, _quote_b64: &str) -> Result<ParsedQuote, AttestationError> {
            Err(AttestationError::QuoteParse("simulated outage".into()))
        }
    }

    #[tokio::test]
    async fn fallback_parser_uses_local_offsets_when_primary_fails() {
        let quote = sample_quote_b64([9u8; 64], [1u8; 48]);
        let parser = FallbackQuoteParser::new(AlwaysFails);
        let parsed = parser.parse(&quote).await.unwrap();
        assert_eq!(parsed.report_data, vec![9u8; 64]);
    }
}
