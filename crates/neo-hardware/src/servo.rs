//! Joints driven by a physical servo bus.

use tracing::{debug, warn};

use crate::bus::SharedBus;
use crate::error::HardwareError;
use crate::joint::{clamp_angle, Gripper, Joint, GRAB_ANGLE, RELEASE_ANGLE};

/// A servo on one bus pin.
pub struct ServoJoint {
    name: String,
    pin: u8,
    angle: i64,
    bus: SharedBus,
}

impl ServoJoint {
    /// Attach `pin` and move the servo to 0.
    pub fn new(name: impl Into<String>, pin: u8, bus: SharedBus) -> Result<Self, HardwareError> {
        let name = name.into();
        {
            let mut bus = bus.lock();
            bus.attach(pin)?;
            bus.write(pin, 0)?;
        }
        debug!(joint = %name, pin, "servo attached");
        Ok(Self {
            name,
            pin,
            angle: 0,
            bus,
        })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    fn move_to(&mut self, target: i64) {
        let target = clamp_angle(target);
        self.angle = target;
        // clamp_angle keeps the value inside u8 range
        let degrees = target as u8;
        if let Err(e) = self.bus.lock().write(self.pin, degrees) {
            warn!(joint = %self.name, pin = self.pin, "servo write failed: {e}");
        }
        debug!(joint = %self.name, angle = target, "servo moved");
    }
}

impl Joint for ServoJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn angle(&self) -> i64 {
        self.angle
    }

    fn turn_left(&mut self, angle: i64) {
        self.move_to(self.angle.saturating_sub(angle));
    }

    fn turn_right(&mut self, angle: i64) {
        self.move_to(self.angle.saturating_add(angle));
    }

    fn set_angle(&mut self, angle: i64) {
        self.move_to(angle);
    }
}

/// Servo-driven claw named `hand`.
pub struct ServoGripper {
    joint: ServoJoint,
    grabbed: bool,
}

impl ServoGripper {
    pub fn new(pin: u8, bus: SharedBus) -> Result<Self, HardwareError> {
        Ok(Self {
            joint: ServoJoint::new("hand", pin, bus)?,
            grabbed: false,
        })
    }

    pub fn pin(&self) -> u8 {
        self.joint.pin()
    }
}

impl Joint for ServoGripper {
    fn name(&self) -> &str {
        self.joint.name()
    }

    fn angle(&self) -> i64 {
        self.joint.angle()
    }

    fn turn_left(&mut self, angle: i64) {
        self.joint.turn_left(angle);
    }

    fn turn_right(&mut self, angle: i64) {
        self.joint.turn_right(angle);
    }

    fn set_angle(&mut self, angle: i64) {
        self.joint.set_angle(angle);
    }
}

impl Gripper for ServoGripper {
    fn grab(&mut self) {
        self.joint.set_angle(GRAB_ANGLE);
        self.grabbed = true;
    }

    fn release(&mut self) {
        self.joint.set_angle(RELEASE_ANGLE);
        self.grabbed = false;
    }

    fn is_grabbed(&self) -> bool {
        self.grabbed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ServoBus;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingBus {
        commands: Vec<String>,
    }

    impl ServoBus for RecordingBus {
        fn attach(&mut self, pin: u8) -> Result<(), HardwareError> {
            self.commands.push(format!("attach {pin}"));
            Ok(())
        }

        fn write(&mut self, pin: u8, angle: u8) -> Result<(), HardwareError> {
            self.commands.push(format!("write {pin} {angle}"));
            Ok(())
        }

        fn detach(&mut self, pin: u8) -> Result<(), HardwareError> {
            self.commands.push(format!("detach {pin}"));
            Ok(())
        }

        fn close(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
    }

    #[test]
    fn test_construction_attaches_and_zeroes() {
        let bus = Arc::new(Mutex::new(RecordingBus::default()));
        let joint = ServoJoint::new("upper_arm", 9, bus.clone()).unwrap();
        assert_eq!(joint.angle(), 0);
        assert_eq!(bus.lock().commands, vec!["attach 9", "write 9 0"]);
    }

    #[test]
    fn test_moves_write_clamped_angles() {
        let bus = Arc::new(Mutex::new(RecordingBus::default()));
        let mut joint = ServoJoint::new("lower_arm", 10, bus.clone()).unwrap();
        joint.turn_right(250);
        joint.turn_left(30);
        joint.set_angle(-10);
        assert_eq!(joint.angle(), 0);
        assert_eq!(
            bus.lock().commands[2..],
            ["write 10 180", "write 10 150", "write 10 0"]
        );
    }

    #[test]
    fn test_gripper_grab_release() {
        let bus = Arc::new(Mutex::new(RecordingBus::default()));
        let mut hand = ServoGripper::new(11, bus.clone()).unwrap();
        hand.grab();
        assert!(hand.is_grabbed());
        assert_eq!(hand.angle(), 60);
        hand.release();
        assert!(!hand.is_grabbed());
        assert_eq!(bus.lock().commands.last().unwrap(), "write 11 0");
    }
}
