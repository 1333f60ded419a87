//! The three-joint robot handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::bus::{SharedBus, TelemetrixBus};
use crate::config::HardwareConfig;
use crate::error::HardwareError;
use crate::joint::{Gripper, HardwareLog, Joint};
use crate::mock::{MockGripper, MockJoint};
use crate::servo::{ServoGripper, ServoJoint};

/// A robot handle shared between the executor and the application.
pub type SharedRobot = Arc<Mutex<RobotArm>>;

enum Backend {
    Simulated { log: Option<HardwareLog> },
    Servo { bus: SharedBus, pins: [u8; 3] },
}

/// Shoulder (`upper_arm`), elbow (`lower_arm`) and gripper (`hand`).
///
/// Lifecycle is `construct -> operations -> shutdown`.
pub struct RobotArm {
    pub upper_arm: Box<dyn Joint>,
    pub lower_arm: Box<dyn Joint>,
    pub hand: Box<dyn Gripper>,
    backend: Backend,
    shut_down: bool,
}

impl RobotArm {
    /// Build the arm selected by `config.use_mock`.
    ///
    /// A physical arm opens `config.device` and may fail; callers fall back
    /// to [`RobotArm::simulated`].
    pub fn new(config: &HardwareConfig, log: Option<HardwareLog>) -> Result<Self, HardwareError> {
        if config.use_mock {
            return Ok(Self::simulated(log));
        }
        let bus: SharedBus = Arc::new(Mutex::new(TelemetrixBus::open(&config.device, config.baud_rate)?));
        Self::with_bus(config, bus)
    }

    /// Servo-backed arm on an already open bus.
    pub fn with_bus(config: &HardwareConfig, bus: SharedBus) -> Result<Self, HardwareError> {
        let pins = [config.upper_arm_pin, config.lower_arm_pin, config.hand_pin];
        let upper_arm = ServoJoint::new("upper_arm", pins[0], bus.clone())?;
        let lower_arm = ServoJoint::new("lower_arm", pins[1], bus.clone())?;
        let hand = ServoGripper::new(pins[2], bus.clone())?;
        info!(
            "Robot arm connected (pins {}/{}/{})",
            pins[0], pins[1], pins[2]
        );
        Ok(Self {
            upper_arm: Box::new(upper_arm),
            lower_arm: Box::new(lower_arm),
            hand: Box::new(hand),
            backend: Backend::Servo { bus, pins },
            shut_down: false,
        })
    }

    /// Simulated arm. Never fails.
    pub fn simulated(log: Option<HardwareLog>) -> Self {
        let line = "[system] MockRobotArm initialised (simulation mode)";
        info!("{line}");
        if let Some(log) = &log {
            log(line);
        }
        Self {
            upper_arm: Box::new(MockJoint::new("upper_arm", log.clone())),
            lower_arm: Box::new(MockJoint::new("lower_arm", log.clone())),
            hand: Box::new(MockGripper::new(log.clone())),
            backend: Backend::Simulated { log },
            shut_down: false,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.backend, Backend::Simulated { .. })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Detach the servos and close the bus. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        match &self.backend {
            Backend::Simulated { log } => {
                let line = "[system] MockRobotArm shutdown";
                info!("{line}");
                if let Some(log) = log {
                    log(line);
                }
            }
            Backend::Servo { bus, pins } => {
                let mut bus = bus.lock();
                for pin in pins {
                    if let Err(e) = bus.detach(*pin) {
                        warn!("Failed to detach servo on pin {pin}: {e}");
                    }
                }
                if let Err(e) = bus.close() {
                    warn!("Failed to close servo bus: {e}");
                }
                info!("Robot arm shut down");
            }
        }
    }

    /// Wrap in the shared handle used by executors.
    pub fn into_shared(self) -> SharedRobot {
        Arc::new(Mutex::new(self))
    }
}
