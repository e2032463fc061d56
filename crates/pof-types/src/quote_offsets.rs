//! Shared TDX/SEV-SNP quote-body offset parsing.
//!
//! Both the hardware [`pof-tee`](../pof_tee/index.html) provider (extracting
//! its own public key as a fallback when no PEM is mounted) and the
//! [`pof-attestation`](../pof_attestation/index.html) verifier's local
//! fallback parser need the exact same byte offsets into a decoded quote.
//! Centralizing them here means the two call sites can never drift apart —
//! see SPEC_FULL.md §9.3 for the offset-convention decision.

/// Bytes consumed by the quote header before the body begins.
pub const HEADER_LEN: usize = 48;

/// Offset of the 64-byte report-data field, relative to the body (i.e.
/// *after* the 48-byte header has already been skipped).
pub const REPORT_DATA_OFFSET: usize = 520;
pub const REPORT_DATA_LEN: usize = 64;

/// Offset of the 48-byte RTMR3 field, relative to the body.
pub const RTMR3_OFFSET: usize = 472;
pub const RTMR3_LEN: usize = 48;

/// The fields recoverable from a decoded quote by fixed-offset parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuoteBody {
    /// The full 64-byte report-data field; the first 32 bytes are the bound public key.
    pub report_data: Vec<u8>,
    /// The 48-byte RTMR3 register, if the quote is long enough to carry one.
    pub rtmr3: Option<Vec<u8>>,
}

/// Parse a decoded (not base64) quote using the documented fixed offsets.
///
/// Returns `None` if the quote is too short to even contain a header and a
/// report-data field — callers should treat that as a hard parse failure.
pub fn parse_quote_body(decoded_quote: &[u8]) -> Option<ParsedQuoteBody> {
    let body = decoded_quote.get(HEADER_LEN..)?;
    let report_data = body
        .get(REPORT_DATA_OFFSET..REPORT_DATA_OFFSET + REPORT_DATA_LEN)?
        .to_vec();
    let rtmr3 = body
        .get(RTMR3_OFFSET..RTMR3_OFFSET + RTMR3_LEN)
        .map(|s| s.to_vec());
    Some(ParsedQuoteBody { report_data, rtmr3 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_with(report_data: &[u8; 64], rtmr3: Option<&[u8; 48]>) -> Vec<u8> {
        let mut body = vec![0u8; 600];
        body[REPORT_DATA_OFFSET..REPORT_DATA_OFFSET + REPORT_DATA_LEN].copy_from_slice(report_data);
        if let Some(r) = rtmr3 {
            body[RTMR3_OFFSET..RTMR3_OFFSET + RTMR3_LEN].copy_from_slice(r);
        }
        let mut quote = vec![0u8; HEADER_LEN];
        quote.extend_from_slice(&body);
        quote
    }

    #[test]
    fn parses_report_data_and_rtmr3() {
        let report_data = [7u8; 64];
        let rtmr3 = [9u8; 48];
        let quote = quote_with(&report_data, Some(&rtmr3));
        let parsed = parse_quote_body(&quote).expect("parses");
        assert_eq!(parsed.report_data, report_data.to_vec());
        assert_eq!(parsed.rtmr3, Some(rtmr3.to_vec()));
    }

    #[test]
    fn too_short_for_report_data_returns_none_even_though_rtmr3_would_fit() {
        // RTMR3 (offset 472, len 48) ends exactly where report-data (offset
        // 520, len 64) begins, so RTMR3 is always the earlier field. A quote
        // long enough to carry RTMR3 but not the full report-data window is
        // a hard parse failure overall: report-data is mandatory.
        let report_data = [1u8; 64];
        let rtmr3 = [9u8; 48];
        let mut quote = quote_with(&report_data, Some(&rtmr3));
        quote.truncate(HEADER_LEN + RTMR3_OFFSET + RTMR3_LEN + 10);
        assert!(parse_quote_body(&quote).is_none());
    }

    #[test]
    fn too_short_for_header_returns_none() {
        let quote = vec![0u8; HEADER_LEN - 1];
        assert!(parse_quote_body(&quote).is_none());
    }
}
