use embassy_time::Instant;

use super::Clock;

#[derive(Debug, Clone)]
pub struct EmbeddedTimeProvider {
    boot_instant: Instant,
}

impl EmbeddedTimeProvider {
    pub fn new() -> Self {
        Self {
            boot_instant: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.boot_instant.elapsed().as_millis()
    }
}

impl Clock for EmbeddedTimeProvider {
    fn now_ms(&self) -> u64 {
        self.elapsed_ms()
    }
}

impl Default for EmbeddedTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}
