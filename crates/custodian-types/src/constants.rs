//! System-wide constants for Custodian.

/// One day in seconds. Default window for both global and per-beneficiary
/// limiters.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default trailing window length.
pub const DEFAULT_INTERVAL_SECS: u64 = SECONDS_PER_DAY;

/// Default delay between registering a beneficiary and its first transfer.
pub const DEFAULT_COOLDOWN_SECS: u64 = 3_600;

/// Default global capacity per window. Zero means nothing moves until an
/// operator sets a limit.
pub const DEFAULT_GLOBAL_CAPACITY: i128 = 0;

/// First key minted by an ordered keyed ledger. Zero is the absent sentinel.
pub const FIRST_LEDGER_KEY: u64 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Custodian";
