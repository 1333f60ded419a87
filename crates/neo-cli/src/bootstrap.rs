//! Robot construction with simulation fallback.

use neo_hardware::{HardwareConfig, HardwareError, HardwareLog, RobotArm, SharedRobot};
use tracing::{info, warn};

/// How the robot handle was obtained.
#[derive(Debug)]
pub enum Connection {
    Hardware,
    Simulated,
    /// The servo board could not be opened.
    Fallback(HardwareError),
}

/// Build the robot selected by `config`, substituting the simulated arm
/// when the hardware is unavailable.
pub fn connect(config: &HardwareConfig, log: Option<HardwareLog>) -> (RobotArm, Connection) {
    if config.use_mock {
        return (RobotArm::simulated(log), Connection::Simulated);
    }
    match RobotArm::new(config, log.clone()) {
        Ok(robot) => {
            info!("Using servo board at {}", config.device);
            (robot, Connection::Hardware)
        }
        Err(e) => {
            warn!("Hardware unavailable, falling back to simulation: {e}");
            (RobotArm::simulated(log), Connection::Fallback(e))
        }
    }
}

/// Shuts the robot down when dropped.
pub struct RobotGuard {
    robot: SharedRobot,
}

impl RobotGuard {
    pub fn new(robot: SharedRobot) -> Self {
        Self { robot }
    }

    pub fn robot(&self) -> &SharedRobot {
        &self.robot
    }
}

impl Drop for RobotGuard {
    fn drop(&mut self) {
        self.robot.lock().shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_flag_skips_hardware() {
        let config = HardwareConfig {
            use_mock: true,
            device: "/nonexistent/board".to_string(),
            ..HardwareConfig::default()
        };
        let (robot, connection) = connect(&config, None);
        assert!(robot.is_simulated());
        assert!(matches!(connection, Connection::Simulated));
    }

    #[test]
    fn test_missing_board_falls_back() {
        let config = HardwareConfig {
            device: "/nonexistent/board".to_string(),
            ..HardwareConfig::default()
        };
        let (robot, connection) = connect(&config, None);
        assert!(robot.is_simulated());
        assert!(matches!(
            connection,
            Connection::Fallback(HardwareError::BusUnavailable { .. })
        ));
    }

    #[test]
    fn test_guard_shuts_down_once() {
        let robot = RobotArm::simulated(None).into_shared();
        {
            let guard = RobotGuard::new(robot.clone());
            guard.robot().lock().upper_arm.set_angle(30);
        }
        assert!(robot.lock().is_shut_down());
    }
}
