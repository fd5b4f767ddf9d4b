mod provider;

pub use provider::EmbeddedTimeProvider;

/// Monotonic millisecond clock driving every cadence in the control loop.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Non-blocking cadence check: true once at least `period_ms` has elapsed
/// since `last_ms`. Tolerates a clock that reads behind `last_ms`.
pub fn is_due(now_ms: u64, last_ms: u64, period_ms: u64) -> bool {
    now_ms.saturating_sub(last_ms) >= period_ms
}
