//! The `arm` object and `delay` helper exposed to student code.

use std::time::Duration;

use neo_eval::{to_float, to_int, CallArgs, EvalResult, HostObject, InterruptHandle, RuntimeError, Value};
use neo_hardware::SharedRobot;
use tracing::debug;

use crate::log::LogSink;

/// Angle used when a movement is called without one.
pub const DEFAULT_TURN: i64 = 90;

/// Operations available on the `arm` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMethod {
    TurnLeft,
    TurnRight,
    SetAngle,
    Grab,
    Release,
    ElbowLeft,
    ElbowRight,
    Delay,
}

impl ArmMethod {
    pub const ALL: [ArmMethod; 8] = [
        ArmMethod::TurnLeft,
        ArmMethod::TurnRight,
        ArmMethod::SetAngle,
        ArmMethod::Grab,
        ArmMethod::Release,
        ArmMethod::ElbowLeft,
        ArmMethod::ElbowRight,
        ArmMethod::Delay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArmMethod::TurnLeft => "turn_left",
            ArmMethod::TurnRight => "turn_right",
            ArmMethod::SetAngle => "set_angle",
            ArmMethod::Grab => "grab",
            ArmMethod::Release => "release",
            ArmMethod::ElbowLeft => "elbow_left",
            ArmMethod::ElbowRight => "elbow_right",
            ArmMethod::Delay => "delay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// State shared by the facade and every bound method it hands out.
#[derive(Clone)]
struct ArmHandle {
    robot: SharedRobot,
    log: LogSink,
    interrupt: InterruptHandle,
}

/// Beginner-facing facade over the robot, bound to `arm`.
///
/// Every call first emits a trace such as `arm.turn_left(90)` through the
/// log sink, then delegates to the matching joint: `upper_arm` for turns
/// and `set_angle`, `lower_arm` for the elbow, `hand` for the gripper.
pub struct StudentArm {
    handle: ArmHandle,
}

impl StudentArm {
    pub fn new(robot: SharedRobot, log: LogSink, interrupt: InterruptHandle) -> Self {
        Self {
            handle: ArmHandle {
                robot,
                log,
                interrupt,
            },
        }
    }

    /// Invoke `method` with student arguments.
    pub fn call(&self, method: ArmMethod, args: CallArgs) -> EvalResult<Value> {
        self.handle.call(method, args)
    }
}

impl HostObject for StudentArm {
    fn type_name(&self) -> &str {
        "Arm"
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        let method = ArmMethod::from_name(name)?;
        let handle = self.handle.clone();
        Some(Value::native(format!("arm.{name}"), move |args| {
            handle.call(method, args)
        }))
    }

    fn repr(&self) -> String {
        "<arm>".to_string()
    }
}

impl ArmHandle {
    fn call(&self, method: ArmMethod, args: CallArgs) -> EvalResult<Value> {
        let name = method.name();
        match method {
            ArmMethod::Grab | ArmMethod::Release => {
                args.reject_keywords(name)?;
                args.expect_count(name, 0, 0)?;
                self.trace(&format!("arm.{name}()"));
                let mut robot = self.robot.lock();
                if method == ArmMethod::Grab {
                    robot.hand.grab();
                } else {
                    robot.hand.release();
                }
            }
            ArmMethod::Delay => {
                sleep(&self.log, &self.interrupt, "arm.delay", args)?;
            }
            _ => {
                let default = (method != ArmMethod::SetAngle).then_some(Value::Int(DEFAULT_TURN));
                let raw = single_argument(args, name, "angle", default)?;
                self.trace(&format!("arm.{name}({raw})"));
                let angle = to_int(&raw)?;
                let mut robot = self.robot.lock();
                match method {
                    ArmMethod::TurnLeft => robot.upper_arm.turn_left(angle),
                    ArmMethod::TurnRight => robot.upper_arm.turn_right(angle),
                    ArmMethod::SetAngle => robot.upper_arm.set_angle(angle),
                    ArmMethod::ElbowLeft => robot.lower_arm.turn_left(angle),
                    _ => robot.lower_arm.turn_right(angle),
                }
            }
        }
        Ok(Value::None)
    }

    fn trace(&self, line: &str) {
        debug!("{line}");
        self.log.emit(line);
    }
}

/// The top-level `delay(seconds)` helper.
pub fn delay_function(log: LogSink, interrupt: InterruptHandle) -> Value {
    Value::native("delay", move |args| {
        sleep(&log, &interrupt, "delay", args)?;
        Ok(Value::None)
    })
}

/// Trace, validate and sleep, waking early on interrupt.
fn sleep(log: &LogSink, interrupt: &InterruptHandle, label: &str, args: CallArgs) -> EvalResult<()> {
    let func = label.rsplit('.').next().unwrap_or(label);
    let raw = single_argument(args, func, "seconds", None)?;
    let line = format!("{label}({raw})");
    debug!("{line}");
    log.emit(&line);
    let seconds = to_float(&raw)?;
    if seconds.is_nan() {
        return Err(RuntimeError::value_error("Invalid value NaN (not a number)"));
    }
    if seconds < 0.0 {
        return Err(RuntimeError::value_error("sleep length must be non-negative"));
    }
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| RuntimeError::overflow("sleep length is too large"))?;
    interrupt.sleep(duration)
}

/// Bind a call with one optional parameter given positionally or by name.
fn single_argument(
    mut args: CallArgs,
    func: &str,
    param: &str,
    default: Option<Value>,
) -> EvalResult<Value> {
    let keyword = args.take_keyword(param);
    args.reject_keywords(func)?;
    if args.positional.len() > 1 {
        let takes = if default.is_some() {
            "from 0 to 1 positional arguments".to_string()
        } else {
            "1 positional argument".to_string()
        };
        return Err(RuntimeError::type_error(format!(
            "{func}() takes {takes} but {} were given",
            args.positional.len()
        )));
    }
    match (args.positional.pop(), keyword) {
        (Some(_), Some(_)) => Err(RuntimeError::type_error(format!(
            "{func}() got multiple values for argument '{param}'"
        ))),
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (None, None) => default.ok_or_else(|| {
            RuntimeError::type_error(format!(
                "{func}() missing 1 required positional argument: '{param}'"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_eval::ErrorKind;
    use neo_hardware::RobotArm;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn arm() -> (StudentArm, SharedRobot, Arc<Mutex<Vec<String>>>) {
        let robot = RobotArm::simulated(None).into_shared();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = LogSink::new();
        let captured = lines.clone();
        sink.set(Arc::new(move |line: &str| captured.lock().push(line.to_string())));
        let arm = StudentArm::new(robot.clone(), sink, InterruptHandle::new());
        (arm, robot, lines)
    }

    fn args(values: Vec<Value>) -> CallArgs {
        CallArgs::new(values)
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in ArmMethod::ALL {
            assert_eq!(ArmMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(ArmMethod::from_name("fly"), None);
    }

    #[test]
    fn test_default_turn_is_ninety() {
        let (arm, robot, lines) = arm();
        arm.call(ArmMethod::TurnRight, args(vec![])).unwrap();
        assert_eq!(robot.lock().upper_arm.angle(), 90);
        assert_eq!(*lines.lock(), vec!["arm.turn_right(90)"]);
    }

    #[test]
    fn test_elbow_moves_lower_arm() {
        let (arm, robot, _) = arm();
        arm.call(ArmMethod::ElbowRight, args(vec![Value::Int(40)])).unwrap();
        arm.call(ArmMethod::ElbowLeft, args(vec![Value::Int(15)])).unwrap();
        let robot = robot.lock();
        assert_eq!(robot.lower_arm.angle(), 25);
        assert_eq!(robot.upper_arm.angle(), 0);
    }

    #[test]
    fn test_keyword_angle_and_float_truncation() {
        let (arm, robot, lines) = arm();
        let call = CallArgs::with_keywords(vec![], vec![("angle".into(), Value::Float(45.9))]);
        arm.call(ArmMethod::SetAngle, call).unwrap();
        assert_eq!(robot.lock().upper_arm.angle(), 45);
        assert_eq!(*lines.lock(), vec!["arm.set_angle(45.9)"]);
    }

    #[test]
    fn test_set_angle_requires_argument() {
        let (arm, _, _) = arm();
        let err = arm.call(ArmMethod::SetAngle, args(vec![])).unwrap_err();
        assert_eq!(
            err.message,
            "set_angle() missing 1 required positional argument: 'angle'"
        );
    }

    #[test]
    fn test_bad_angle_is_traced_then_rejected() {
        let (arm, robot, lines) = arm();
        let err = arm
            .call(ArmMethod::TurnLeft, args(vec![Value::str("far")]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
        assert_eq!(*lines.lock(), vec!["arm.turn_left(far)"]);
        assert_eq!(robot.lock().upper_arm.angle(), 0);
    }

    #[test]
    fn test_grab_takes_no_arguments() {
        let (arm, robot, _) = arm();
        let err = arm.call(ArmMethod::Grab, args(vec![Value::Int(1)])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        arm.call(ArmMethod::Grab, args(vec![])).unwrap();
        assert!(robot.lock().hand.is_grabbed());
    }

    #[test]
    fn test_delay_validation() {
        let (arm, _, lines) = arm();
        arm.call(ArmMethod::Delay, args(vec![Value::Int(0)])).unwrap();
        let err = arm
            .call(ArmMethod::Delay, args(vec![Value::Float(-1.0)]))
            .unwrap_err();
        assert_eq!(err.message, "sleep length must be non-negative");
        let err = arm
            .call(ArmMethod::Delay, args(vec![Value::Float(f64::INFINITY)]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert_eq!(lines.lock()[0], "arm.delay(0)");
    }

    #[test]
    fn test_attributes() {
        let (arm, _, _) = arm();
        assert!(arm.attribute("grab").is_some_and(|v| v.is_callable()));
        assert!(arm.attribute("shutdown").is_none());
        assert_eq!(arm.repr(), "<arm>");
    }
}
