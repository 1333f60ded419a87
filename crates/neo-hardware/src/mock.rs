//! Simulated joints that only emit log lines.

use tracing::debug;

use crate::joint::{clamp_angle, Gripper, HardwareLog, Joint, GRAB_ANGLE, RELEASE_ANGLE};

/// Simulated servo joint.
pub struct MockJoint {
    name: String,
    angle: i64,
    log: Option<HardwareLog>,
}

impl MockJoint {
    /// A joint at angle 0.
    pub fn new(name: impl Into<String>, log: Option<HardwareLog>) -> Self {
        Self {
            name: name.into(),
            angle: 0,
            log,
        }
    }

    fn emit(&self, line: &str) {
        debug!(joint = %self.name, "{line}");
        if let Some(log) = &self.log {
            log(line);
        }
    }

    fn move_to(&mut self, op: &str, requested: i64, target: i64) {
        let target = clamp_angle(target);
        self.emit(&format!("[{}] {op}({requested}) -> {target} deg", self.name));
        self.angle = target;
    }
}

impl Joint for MockJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn angle(&self) -> i64 {
        self.angle
    }

    fn turn_left(&mut self, angle: i64) {
        self.move_to("turn_left", angle, self.angle.saturating_sub(angle));
    }

    fn turn_right(&mut self, angle: i64) {
        self.move_to("turn_right", angle, self.angle.saturating_add(angle));
    }

    fn set_angle(&mut self, angle: i64) {
        self.move_to("set_angle", angle, angle);
    }
}

/// Simulated gripper named `hand`.
pub struct MockGripper {
    joint: MockJoint,
    grabbed: bool,
}

impl MockGripper {
    pub fn new(log: Option<HardwareLog>) -> Self {
        Self {
            joint: MockJoint::new("hand", log),
            grabbed: false,
        }
    }
}

impl Joint for MockGripper {
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

impl Gripper for MockGripper {
    fn grab(&mut self) {
        self.joint.emit(&format!("[{}] grab()", self.joint.name));
        self.joint.set_angle(GRAB_ANGLE);
        self.grabbed = true;
    }

    fn release(&mut self) {
        self.joint.emit(&format!("[{}] release()", self.joint.name));
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
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording() -> (HardwareLog, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let log: HardwareLog = Arc::new(move |line: &str| sink.lock().push(line.to_string()));
        (log, lines)
    }

    #[test]
    fn test_turns_saturate() {
        let mut joint = MockJoint::new("upper_arm", None);
        joint.turn_left(30);
        assert_eq!(joint.angle(), 0);
        joint.turn_right(500);
        assert_eq!(joint.angle(), 180);
        joint.turn_right(1);
        assert_eq!(joint.angle(), 180);
        joint.turn_left(i64::MAX);
        assert_eq!(joint.angle(), 0);
    }

    #[test]
    fn test_negative_turn_is_clamped() {
        let mut joint = MockJoint::new("lower_arm", None);
        joint.turn_left(-400);
        assert_eq!(joint.angle(), 180);
        joint.turn_right(i64::MIN);
        assert_eq!(joint.angle(), 0);
    }

    #[test]
    fn test_log_lines() {
        let (log, lines) = recording();
        let mut joint = MockJoint::new("upper_arm", Some(log));
        joint.turn_left(30);
        joint.set_angle(200);
        assert_eq!(
            *lines.lock(),
            vec![
                "[upper_arm] turn_left(30) -> 0 deg",
                "[upper_arm] set_angle(200) -> 180 deg",
            ]
        );
    }

    #[test]
    fn test_grab_and_release() {
        let (log, lines) = recording();
        let mut hand = MockGripper::new(Some(log));
        hand.set_angle(170);
        hand.grab();
        assert!(hand.is_grabbed());
        assert_eq!(hand.angle(), GRAB_ANGLE);
        hand.grab();
        assert_eq!(hand.angle(), GRAB_ANGLE);
        hand.release();
        assert!(!hand.is_grabbed());
        assert_eq!(hand.angle(), RELEASE_ANGLE);
        let lines = lines.lock();
        assert_eq!(lines[1], "[hand] grab()");
        assert_eq!(lines[2], "[hand] set_angle(60) -> 60 deg");
    }
}
