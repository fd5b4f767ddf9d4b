mod handler;

pub use handler::CommandHandler;

use crate::config::Topics;
use crate::control::AutomationSettings;
use crate::types::Switch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAction {
    On,
    Off,
    Blink,
}

/// Typed form of an inbound command message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetLed(LedAction),
    SetMotor(Switch),
    Configure(AutomationSettings),
}

impl Command {
    /// Decodes a `(topic, payload)` pair. Unknown topics and payload values
    /// yield `None`; they are not errors.
    pub fn parse(topics: &Topics, topic: &str, payload: &[u8]) -> Option<Self> {
        if topic == topics.settings {
            return AutomationSettings::from_json(payload).map(Command::Configure);
        }

        let text = core::str::from_utf8(payload).ok()?.trim();

        if topic == topics.led_command {
            let action = match text {
                "ON" => LedAction::On,
                "OFF" => LedAction::Off,
                "BLINK" => LedAction::Blink,
                _ => return None,
            };
            Some(Command::SetLed(action))
        } else if topic == topics.motor_command {
            Switch::from_payload(text).map(Command::SetMotor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PumpMode;

    fn topics() -> Topics {
        Topics::new("tank")
    }

    #[test]
    fn test_parse_led_commands() {
        let t = topics();
        assert_eq!(
            Command::parse(&t, "tank/led/cmd", b"ON"),
            Some(Command::SetLed(LedAction::On))
        );
        assert_eq!(
            Command::parse(&t, "tank/led/cmd", b"OFF\r\n"),
            Some(Command::SetLed(LedAction::Off))
        );
        assert_eq!(
            Command::parse(&t, "tank/led/cmd", b"BLINK"),
            Some(Command::SetLed(LedAction::Blink))
        );
    }

    #[test]
    fn test_parse_motor_commands() {
        let t = topics();
        assert_eq!(
            Command::parse(&t, "tank/motor/command", b"ON"),
            Some(Command::SetMotor(Switch::On))
        );
        assert_eq!(Command::parse(&t, "tank/motor/command", b"BLINK"), None);
    }

    #[test]
    fn test_parse_settings() {
        let command = Command::parse(
            &topics(),
            "tank/settings/config",
            br#"{"minLevel":30,"maxLevel":80,"mode":"auto"}"#,
        );
        assert_eq!(
            command,
            Some(Command::Configure(AutomationSettings {
                min_level: 30,
                max_level: 80,
                mode: PumpMode::Auto,
            }))
        );
    }

    #[test]
    fn test_unrecognized_input_is_ignored() {
        let t = topics();
        assert_eq!(Command::parse(&t, "tank/unknown", b"x"), None);
        assert_eq!(Command::parse(&t, "tank/led/cmd", b"on"), None);
        assert_eq!(Command::parse(&t, "tank/led/cmd", &[0xff, 0xfe]), None);
        assert_eq!(Command::parse(&t, "other/led/cmd", b"ON"), None);
        assert_eq!(Command::parse(&t, "tank/settings/config", b"{}"), None);
    }
}
