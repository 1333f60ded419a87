//! Joint contract shared by the simulated and servo-backed variants.

use std::sync::Arc;

pub const MIN_ANGLE: i64 = 0;
pub const MAX_ANGLE: i64 = 180;
/// Gripper angle after `grab()`.
pub const GRAB_ANGLE: i64 = 60;
/// Gripper angle after `release()`.
pub const RELEASE_ANGLE: i64 = 0;

/// Sink for human-readable hardware log lines.
pub type HardwareLog = Arc<dyn Fn(&str) + Send + Sync>;

/// Clamp an angle into `[MIN_ANGLE, MAX_ANGLE]`.
pub fn clamp_angle(angle: i64) -> i64 {
    angle.clamp(MIN_ANGLE, MAX_ANGLE)
}

/// A single servo joint.
///
/// No operation fails on out-of-range input: relative turns saturate at the
/// bounds and absolute sets are clamped.
pub trait Joint: Send {
    fn name(&self) -> &str;

    /// Current angle in degrees.
    fn angle(&self) -> i64;

    /// Move `angle` degrees towards 0.
    fn turn_left(&mut self, angle: i64);

    /// Move `angle` degrees towards 180.
    fn turn_right(&mut self, angle: i64);

    fn set_angle(&mut self, angle: i64);
}

/// A joint that can also open and close a claw.
pub trait Gripper: Joint {
    /// Close to [`GRAB_ANGLE`].
    fn grab(&mut self);

    /// Open to [`RELEASE_ANGLE`].
    fn release(&mut self);

    fn is_grabbed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_angle() {
        assert_eq!(clamp_angle(-5), 0);
        assert_eq!(clamp_angle(90), 90);
        assert_eq!(clamp_angle(i64::MAX), 180);
    }
}
