use serde::{Deserialize, Serialize};

use crate::bus::DEFAULT_BAUD_RATE;

/// Pin assignments and hardware mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub upper_arm_pin: u8,
    pub lower_arm_pin: u8,
    pub hand_pin: u8,
    /// Simulate the arm instead of opening the servo board.
    pub use_mock: bool,
    /// Serial device node of the servo board.
    pub device: String,
    pub baud_rate: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            upper_arm_pin: 9,
            lower_arm_pin: 10,
            hand_pin: 11,
            use_mock: false,
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: HardwareConfig = toml::from_str("hand_pin = 6\nuse_mock = true").unwrap();
        assert_eq!(config.hand_pin, 6);
        assert!(config.use_mock);
        assert_eq!(config.upper_arm_pin, 9);
        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_baud_rate_override() {
        let config: HardwareConfig =
            toml::from_str("device = \"COM3\"\nbaud_rate = 57600").unwrap();
        assert_eq!(config.device, "COM3");
        assert_eq!(config.baud_rate, 57_600);
    }
}
