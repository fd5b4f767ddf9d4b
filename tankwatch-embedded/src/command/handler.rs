use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::Topics;
use crate::types::DeviceState;

use super::{Command, LedAction};

const BLINK_CYCLES: u32 = 5;
const BLINK_PHASE_MS: u32 = 100;

/// Applies inbound commands to the LED outputs and the device state.
pub struct CommandHandler<P: OutputPin> {
    leds: [P; 2],
    blink_enabled: bool,
}

impl<P: OutputPin> CommandHandler<P> {
    pub fn new(leds: [P; 2], blink_enabled: bool) -> Self {
        Self {
            leds,
            blink_enabled,
        }
    }

    /// Drives every LED low and clears the persisted LED state.
    pub fn reset(&mut self, state: &mut DeviceState) {
        for led in self.leds.iter_mut() {
            led.set_low().ok();
        }
        state.led_on = [false; 2];
    }

    /// Parses and applies one inbound message. Returns the applied command,
    /// or `None` when the message was not recognized and nothing changed.
    pub fn handle<D: DelayNs>(
        &mut self,
        state: &mut DeviceState,
        topics: &Topics,
        topic: &str,
        payload: &[u8],
        delay: &mut D,
    ) -> Option<Command> {
        let command = Command::parse(topics, topic, payload)?;

        match command {
            Command::SetLed(LedAction::Blink) if !self.blink_enabled => return None,
            Command::SetLed(action) => self.apply_led(state, action, delay),
            Command::SetMotor(switch) => {
                log::info!("Motor turned {}", switch);
                state.motor_on = switch.is_on();
            }
            Command::Configure(settings) => {
                log::info!(
                    "Automation settings: mode {:?}, min {}%, max {}%",
                    settings.mode,
                    settings.min_level,
                    settings.max_level
                );
                state.automation = settings;
            }
        }

        Some(command)
    }

    fn apply_led<D: DelayNs>(&mut self, state: &mut DeviceState, action: LedAction, delay: &mut D) {
        match action {
            LedAction::On => {
                log::info!("LEDs ON");
                self.set_all(true);
                state.led_on = [true; 2];
            }
            LedAction::Off => {
                log::info!("LEDs OFF");
                self.set_all(false);
                state.led_on = [false; 2];
            }
            LedAction::Blink => {
                log::info!("LEDs BLINK");
                for _ in 0..BLINK_CYCLES {
                    self.set_all(true);
                    delay.delay_ms(BLINK_PHASE_MS);
                    self.set_all(false);
                    delay.delay_ms(BLINK_PHASE_MS);
                }
                self.restore(state);
            }
        }
    }

    fn set_all(&mut self, on: bool) {
        for led in self.leds.iter_mut() {
            if on {
                led.set_high().ok();
            } else {
                led.set_low().ok();
            }
        }
    }

    fn restore(&mut self, state: &DeviceState) {
        for (led, on) in self.leds.iter_mut().zip(state.led_on) {
            if on {
                led.set_high().ok();
            } else {
                led.set_low().ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PumpMode;
    use crate::mock::{MockPin, mock_time};
    use crate::time::Clock;
    use crate::types::Switch;

    struct Fixture {
        leds: [MockPin; 2],
        handler: CommandHandler<MockPin>,
        state: DeviceState,
        topics: Topics,
    }

    fn fixture(blink_enabled: bool) -> Fixture {
        let leds = [MockPin::new(), MockPin::new()];
        let handler = CommandHandler::new(leds.clone(), blink_enabled);
        Fixture {
            leds,
            handler,
            state: DeviceState::default(),
            topics: Topics::new("thomson_h2o"),
        }
    }

    impl Fixture {
        fn send(&mut self, topic: &str, payload: &str) -> Option<Command> {
            let (_clock, mut delay) = mock_time();
            self.handler.handle(
                &mut self.state,
                &self.topics,
                topic,
                payload.as_bytes(),
                &mut delay,
            )
        }
    }

    #[test]
    fn test_led_on_off_drives_both_pins() {
        let mut f = fixture(true);

        f.send("thomson_h2o/led/cmd", "ON");
        assert_eq!(f.state.led_on, [true, true]);
        assert!(f.leds.iter().all(|led| led.last() == Some(true)));

        f.send("thomson_h2o/led/cmd", "OFF");
        assert_eq!(f.state.led_on, [false, false]);
        assert!(f.leds.iter().all(|led| led.last() == Some(false)));
    }

    #[test]
    fn test_led_on_is_idempotent() {
        let mut f = fixture(true);

        f.send("thomson_h2o/led/cmd", "ON");
        let after_first = f.state.clone();
        f.send("thomson_h2o/led/cmd", "ON");

        assert_eq!(f.state.led_on, after_first.led_on);
        assert_eq!(f.leds[0].get_states(), vec![true, true]);
    }

    #[test]
    fn test_blink_sequence_restores_state() {
        let mut f = fixture(true);
        f.send("thomson_h2o/led/cmd", "ON");
        f.leds[0].states.borrow_mut().clear();

        let (clock, mut delay) = mock_time();
        let applied = f.handler.handle(
            &mut f.state,
            &f.topics,
            "thomson_h2o/led/cmd",
            b"BLINK",
            &mut delay,
        );

        assert_eq!(applied, Some(Command::SetLed(LedAction::Blink)));
        assert_eq!(clock.now_ms(), 1_000, "Five 200 ms cycles");

        let states = f.leds[0].get_states();
        assert_eq!(states.len(), 11);
        assert_eq!(&states[..2], &[true, false]);
        assert_eq!(states.last(), Some(&true), "Pre-blink ON state restored");
        assert_eq!(f.state.led_on, [true, true]);
    }

    #[test]
    fn test_blink_ignored_when_disabled() {
        let mut f = fixture(false);

        assert_eq!(f.send("thomson_h2o/led/cmd", "BLINK"), None);
        assert!(f.leds[0].get_states().is_empty());
    }

    #[test]
    fn test_motor_command_sets_flag_only() {
        let mut f = fixture(true);

        f.send("thomson_h2o/motor/command", "ON");
        assert!(f.state.motor_on);
        assert!(f.leds[0].get_states().is_empty());

        f.send("thomson_h2o/motor/command", "OFF");
        assert!(!f.state.motor_on);
    }

    #[test]
    fn test_settings_replace_automation() {
        let mut f = fixture(true);

        let applied = f.send(
            "thomson_h2o/settings/config",
            r#"{"minLevel":35,"maxLevel":75,"mode":"auto"}"#,
        );

        assert!(matches!(applied, Some(Command::Configure(_))));
        assert_eq!(f.state.automation.min_level, 35);
        assert_eq!(f.state.automation.max_level, 75);
        assert_eq!(f.state.automation.mode, PumpMode::Auto);
    }

    #[test]
    fn test_unknown_input_changes_nothing() {
        let mut f = fixture(true);
        f.send("thomson_h2o/motor/command", "ON");
        let before = f.state.clone();

        assert_eq!(f.send("thomson_h2o/led/cmd", "TOGGLE"), None);
        assert_eq!(f.send("thomson_h2o/motor/command", "START"), None);
        assert_eq!(f.send("thomson_h2o/unknown", "ON"), None);
        assert_eq!(f.send("thomson_h2o/settings/config", "not json"), None);

        assert_eq!(f.state.motor_on, before.motor_on);
        assert_eq!(f.state.led_on, before.led_on);
        assert_eq!(f.state.automation, before.automation);
        assert!(f.leds[0].get_states().is_empty());
        assert_eq!(Switch::from(f.state.motor_on), Switch::On);
    }
}
