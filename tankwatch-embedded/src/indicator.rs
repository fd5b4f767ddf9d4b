use embedded_hal::digital::OutputPin;

use crate::network::ConnectionState;

/// Heartbeat LED: toggles on every update while online, held dark otherwise.
pub struct StatusIndicator<P: OutputPin> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> StatusIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Called on the blink cadence.
    pub fn update(&mut self, state: ConnectionState) {
        self.lit = state == ConnectionState::Online && !self.lit;

        if self.lit {
            self.pin.set_high().ok();
        } else {
            self.pin.set_low().ok();
        }
    }
}
