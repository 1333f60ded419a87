//! # NEO Hardware Layer
//!
//! Joint controllers for the three-servo NEO arm. Every joint keeps an
//! integer angle in `[0, 180]` and saturates instead of failing.
//!
//! - [`MockJoint`] / [`MockGripper`]: simulation, log lines only.
//! - [`ServoJoint`] / [`ServoGripper`]: drive servos over a [`ServoBus`].
//! - [`RobotArm`]: the `upper_arm`, `lower_arm`, `hand` handle with an
//!   explicit [`RobotArm::shutdown`].

mod bus;
mod config;
mod error;
mod joint;
mod mock;
mod robot;
mod servo;

pub use bus::{ServoBus, SharedBus, TelemetrixBus, DEFAULT_BAUD_RATE, MAX_PULSE_US, MIN_PULSE_US};
pub use config::HardwareConfig;
pub use error::HardwareError;
pub use joint::{
    clamp_angle, Gripper, HardwareLog, Joint, GRAB_ANGLE, MAX_ANGLE, MIN_ANGLE, RELEASE_ANGLE,
};
pub use mock::{MockGripper, MockJoint};
pub use robot::{RobotArm, SharedRobot};
pub use servo::{ServoGripper, ServoJoint};
