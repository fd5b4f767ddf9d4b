mod level;
mod ultrasonic;

pub use level::to_level;
pub use ultrasonic::*;

/// Pulse-timing primitive behind the echo pin.
pub trait EchoTimer {
    /// Width of the next echo pulse in microseconds, or `None` when no pulse
    /// completes within `timeout_us`.
    fn pulse_width_us(&mut self, timeout_us: u32) -> Option<u32>;
}
