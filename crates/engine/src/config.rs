//! Tuning knobs for the engine: a plain struct with a `Default` impl,
//! overridden by the `cli` crate from environment variables.

use std::time::Duration;

/// Outputs larger than this are rewritten to a claim-check pointer instead
/// of being stored inline.
pub const DEFAULT_INLINE_THRESHOLD_BYTES: u64 = 100 * 1024;

/// How often the timer tick loop and lease sweeper poll for due work.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Outputs at or below this size are stored inline in `output_json`;
    /// larger ones go through the blob sidecar.
    pub inline_threshold_bytes: u64,
    /// Default worker lease TTL, in seconds.
    pub lease_ttl_secs: i64,
    /// Poll period for the timer tick loop and the lease sweeper.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inline_threshold_bytes: DEFAULT_INLINE_THRESHOLD_BYTES,
            lease_ttl_secs: queue::DEFAULT_LEASE_TTL_SECS,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}
