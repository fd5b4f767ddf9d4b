/// Fixed-delay retry bookkeeping around a `next_attempt_at` timestamp.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    delay_ms: u64,
    next_attempt_at: Option<u64>,
    failures: u32,
}

impl RetryTimer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            next_attempt_at: None,
            failures: 0,
        }
    }

    pub fn is_ready(&self, now_ms: u64) -> bool {
        self.next_attempt_at.is_none_or(|at| now_ms >= at)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.next_attempt_at
            .map_or(0, |at| at.saturating_sub(now_ms))
    }

    pub fn record_failure(&mut self, now_ms: u64) {
        self.failures = self.failures.saturating_add(1);
        self.next_attempt_at = Some(now_ms + self.delay_ms);
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.next_attempt_at = None;
    }

    /// Consecutive failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_until_first_failure() {
        let timer = RetryTimer::new(5_000);
        assert!(timer.is_ready(0));
        assert_eq!(timer.remaining_ms(0), 0);
    }

    #[test]
    fn test_failure_defers_next_attempt() {
        let mut timer = RetryTimer::new(5_000);
        timer.record_failure(1_000);

        assert!(!timer.is_ready(5_999));
        assert_eq!(timer.remaining_ms(2_000), 4_000);
        assert!(timer.is_ready(6_000));
        assert_eq!(timer.failures(), 1);

        timer.record_failure(6_000);
        assert_eq!(timer.failures(), 2);

        timer.record_success();
        assert_eq!(timer.failures(), 0);
        assert!(timer.is_ready(6_001));
    }
}
