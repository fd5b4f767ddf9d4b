use super::{AutomationSettings, PumpMode};

/// Motor state the automation wants for `level_pct`. Between the thresholds
/// the current state holds, which keeps the pump from chattering.
pub fn motor_target(settings: &AutomationSettings, level_pct: u8, motor_on: bool) -> bool {
    match settings.mode {
        PumpMode::Manual => motor_on,
        PumpMode::Auto if level_pct < settings.min_level => true,
        PumpMode::Auto if level_pct > settings.max_level => false,
        PumpMode::Auto => motor_on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto() -> AutomationSettings {
        AutomationSettings {
            min_level: 20,
            max_level: 90,
            mode: PumpMode::Auto,
        }
    }

    #[test]
    fn test_manual_mode_never_switches() {
        let manual = AutomationSettings::default();
        assert!(!motor_target(&manual, 5, false));
        assert!(motor_target(&manual, 99, true));
    }

    #[test]
    fn test_auto_mode_thresholds() {
        assert!(motor_target(&auto(), 19, false));
        assert!(!motor_target(&auto(), 91, true));
    }

    #[test]
    fn test_auto_mode_hysteresis() {
        let settings = auto();
        let mut motor_on = false;

        for level in [50, 30, 19, 40, 80, 90, 91, 60] {
            motor_on = motor_target(&settings, level, motor_on);
            match level {
                19 | 40 | 80 | 90 => assert!(motor_on, "level {level}"),
                _ => assert!(!motor_on, "level {level}"),
            }
        }
    }
}
