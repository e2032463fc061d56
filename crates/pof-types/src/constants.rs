//! Authoritative constants from spec.md §6.

/// Stablecoin base units per whole unit (6-decimal token, e.g. USDC).
pub const DECIMALS: u32 = 6;

/// Game stake: 0.01 stablecoin = 10_000 base units.
pub const GAME_STAKE: u64 = 10_000;

/// Initial funding granted to a newly admitted agent: 1.0 stablecoin.
pub const INITIAL_FUNDING: u64 = 1_000_000;

/// Minimum balance an agent must hold to be ranked `active`: one stake.
pub const MIN_STAKE: u64 = GAME_STAKE;

/// Match loop tick interval, in milliseconds.
pub const MATCH_INTERVAL_MS: u64 = 60_000;

/// Liveness probe timeout, in seconds.
pub const LIVENESS_TIMEOUT_SECS: u64 = 3;

/// `/play` dispatch timeout, in seconds.
pub const DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of agents ranked `active` at once.
pub const DEFAULT_MAX_ACTIVE: usize = 16;

/// Donation watcher poll interval, in seconds.
pub const DONATION_POLL_SECS: u64 = 15;

/// Registration retry count and spacing (agent side).
pub const REGISTRATION_RETRY_ATTEMPTS: u32 = 5;
pub const REGISTRATION_RETRY_SPACING_SECS: u64 = 5;

/// SSE backlog replay window, in minutes.
pub const EVENT_BACKLOG_MINUTES: i64 = 15;

/// The canonical USDC mint address on Solana mainnet (6 decimals).
pub const USDC_MINT_MAINNET: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Render a base-unit amount as a human-readable decimal string, e.g.
/// `10_000` -> `"0.010000"`.
pub fn format_base_units(amount: u64) -> String {
    let base: u64 = 10u64.pow(DECIMALS);
    format!(
        "{}.{:0width$}",
        amount / base,
        amount % base,
        width = DECIMALS as usize
    )
}
