//! Integration tests for the robot handle and joint contract.

use std::io::Cursor;
use std::sync::Arc;

use neo_hardware::{
    HardwareConfig, HardwareError, HardwareLog, RobotArm, SharedBus, TelemetrixBus, GRAB_ANGLE,
};
use parking_lot::Mutex;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn recording_log() -> (HardwareLog, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let log: HardwareLog = Arc::new(move |line: &str| sink.lock().push(line.to_string()));
    (log, lines)
}

const ANGLES: [i64; 9] = [i64::MIN, -1000, -1, 0, 1, 90, 179, 180, i64::MAX];

// ══════════════════════════════════════════════════════════════════════════════
// Joint properties
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn set_angle_always_clamps() {
    let mut robot = RobotArm::simulated(None);
    for a in ANGLES {
        robot.upper_arm.set_angle(a);
        assert_eq!(robot.upper_arm.angle(), a.clamp(0, 180));
        robot.hand.set_angle(a);
        assert_eq!(robot.hand.angle(), a.clamp(0, 180));
    }
}

#[test]
fn relative_turns_saturate() {
    let mut robot = RobotArm::simulated(None);
    for start in [0, 45, 180] {
        for a in [0, 1, 30, 90, 200, i64::MAX] {
            robot.lower_arm.set_angle(start);
            robot.lower_arm.turn_left(a);
            assert_eq!(robot.lower_arm.angle(), (start - a).max(0));
            robot.lower_arm.set_angle(start);
            robot.lower_arm.turn_right(a);
            assert_eq!(robot.lower_arm.angle(), start.saturating_add(a).min(180));
        }
    }
}

#[test]
fn turn_left_at_zero_is_idempotent() {
    let mut robot = RobotArm::simulated(None);
    for _ in 0..3 {
        robot.upper_arm.turn_left(90);
        assert_eq!(robot.upper_arm.angle(), 0);
    }
}

#[test]
fn grab_and_release_from_any_state() {
    let mut robot = RobotArm::simulated(None);
    for start in [0, 60, 180] {
        robot.hand.set_angle(start);
        robot.hand.grab();
        assert!(robot.hand.is_grabbed());
        assert_eq!(robot.hand.angle(), GRAB_ANGLE);
        robot.hand.release();
        assert!(!robot.hand.is_grabbed());
        assert_eq!(robot.hand.angle(), 0);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Construction & lifecycle
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn mock_mode_builds_simulated_arm() {
    let config = HardwareConfig {
        use_mock: true,
        ..HardwareConfig::default()
    };
    let (log, lines) = recording_log();
    let robot = RobotArm::new(&config, Some(log)).unwrap();
    assert!(robot.is_simulated());
    assert_eq!(robot.upper_arm.name(), "upper_arm");
    assert_eq!(robot.lower_arm.name(), "lower_arm");
    assert_eq!(robot.hand.name(), "hand");
    assert_eq!(
        *lines.lock(),
        vec!["[system] MockRobotArm initialised (simulation mode)"]
    );
}

#[test]
fn missing_device_is_bus_unavailable() {
    let config = HardwareConfig {
        device: "/nonexistent/neo-robot-board".to_string(),
        ..HardwareConfig::default()
    };
    let err = RobotArm::new(&config, None).err().unwrap();
    assert!(matches!(err, HardwareError::BusUnavailable { .. }));
}

#[test]
fn simulated_shutdown_logs_once() {
    let (log, lines) = recording_log();
    let mut robot = RobotArm::simulated(Some(log));
    robot.shutdown();
    robot.shutdown();
    assert!(robot.is_shut_down());
    let lines = lines.lock();
    assert_eq!(
        lines
            .iter()
            .filter(|l| *l == "[system] MockRobotArm shutdown")
            .count(),
        1
    );
}

#[test]
fn servo_arm_speaks_telemetrix() {
    let port = Arc::new(Mutex::new(TelemetrixBus::new(Cursor::new(Vec::new()))));
    let bus: SharedBus = port.clone();
    let mut robot = RobotArm::with_bus(&HardwareConfig::default(), bus).unwrap();
    assert!(!robot.is_simulated());

    let setup_len = port.lock().get_ref().get_ref().len();
    // attach (7 bytes) + write 0 (4 bytes) for each of the three joints
    assert_eq!(setup_len, 3 * (7 + 4));

    robot.upper_arm.turn_right(45);
    robot.hand.grab();
    robot.shutdown();
    robot.shutdown();

    let bytes = port.lock().get_ref().get_ref().clone();
    assert_eq!(
        &bytes[setup_len..],
        &[
            3, 8, 9, 45, // upper_arm -> 45
            3, 8, 11, 60, // hand -> 60
            2, 9, 9, // detach 9
            2, 9, 10, // detach 10
            2, 9, 11, // detach 11
        ]
    );
}

#[test]
fn shared_robot_is_usable_across_threads() {
    let robot = RobotArm::simulated(None).into_shared();
    let worker = robot.clone();
    std::thread::spawn(move || worker.lock().upper_arm.set_angle(120))
        .join()
        .unwrap();
    assert_eq!(robot.lock().upper_arm.angle(), 120);
}
