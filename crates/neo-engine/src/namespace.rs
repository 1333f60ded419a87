//! Construction of the allow-listed execution namespace.

use std::cell::RefCell;
use std::rc::Rc;

use neo_eval::{
    builtin_table, new_namespace, Builtins, CallArgs, EvalResult, InterruptHandle, Namespace,
    RuntimeError, Value,
};
use neo_hardware::SharedRobot;

use crate::facade::{delay_function, StudentArm};
use crate::log::LogSink;

/// Output buffer of a single call, mirrored line by line to the log sink.
#[derive(Clone)]
pub(crate) struct OutputCapture {
    buffer: Rc<RefCell<String>>,
    log: LogSink,
}

impl OutputCapture {
    pub(crate) fn new(log: LogSink) -> Self {
        Self {
            buffer: Rc::default(),
            log,
        }
    }

    /// Append `text` + `end`, forwarding it without trailing newlines.
    pub(crate) fn print(&self, text: &str, end: &str) {
        let mut chunk = String::with_capacity(text.len() + end.len());
        chunk.push_str(text);
        chunk.push_str(end);
        self.buffer.borrow_mut().push_str(&chunk);
        self.log.emit(chunk.trim_end_matches('\n'));
    }

    pub(crate) fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

/// Globals of a fresh namespace: `arm` and `delay`.
pub(crate) fn fresh_globals(robot: &SharedRobot, log: &LogSink, interrupt: &InterruptHandle) -> Namespace {
    let globals = new_namespace();
    {
        let mut names = globals.borrow_mut();
        let arm = StudentArm::new(robot.clone(), log.clone(), interrupt.clone());
        names.insert("arm".to_string(), Value::Host(Rc::new(arm)));
        names.insert(
            "delay".to_string(),
            delay_function(log.clone(), interrupt.clone()),
        );
    }
    globals
}

/// The allow-listed built-ins plus a `print` bound to `capture`.
pub(crate) fn builtins_with_print(capture: &OutputCapture) -> Rc<Builtins> {
    let mut builtins = builtin_table();
    builtins.insert("print".to_string(), print_function(capture.clone()));
    Rc::new(builtins)
}

/// `print(*values, sep=' ', end='\n')`. `file=` and `flush=` are accepted
/// and ignored so output cannot leave the capture buffer.
fn print_function(capture: OutputCapture) -> Value {
    Value::native("print", move |mut args: CallArgs| {
        args.take_keyword("file");
        args.take_keyword("flush");
        let sep = text_option(args.take_keyword("sep"), "sep", " ")?;
        let end = text_option(args.take_keyword("end"), "end", "\n")?;
        if let Some((name, _)) = args.keywords.first() {
            return Err(RuntimeError::type_error(format!(
                "'{name}' is an invalid keyword argument for print()"
            )));
        }
        let text = args
            .positional
            .iter()
            .map(Value::to_str)
            .collect::<EvalResult<Vec<_>>>()?
            .join(&sep);
        capture.print(&text, &end);
        Ok(Value::None)
    })
}

fn text_option(value: Option<Value>, name: &str, default: &str) -> EvalResult<String> {
    match value {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(RuntimeError::type_error(format!(
            "{name} must be None or a string, not {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_hardware::RobotArm;

    fn call_print(capture: &OutputCapture, args: CallArgs) -> EvalResult<Value> {
        match print_function(capture.clone()) {
            Value::Native(native) => native.call(args),
            _ => unreachable!("print is a native function"),
        }
    }

    #[test]
    fn test_print_sep_and_end() {
        let capture = OutputCapture::new(LogSink::new());
        let args = CallArgs::with_keywords(
            vec![Value::Int(1), Value::str("a")],
            vec![("sep".into(), Value::str("-")), ("end".into(), Value::str("!"))],
        );
        call_print(&capture, args).unwrap();
        call_print(&capture, CallArgs::new(vec![])).unwrap();
        assert_eq!(capture.contents(), "1-a!\n");
    }

    #[test]
    fn test_print_ignores_file() {
        let capture = OutputCapture::new(LogSink::new());
        let args = CallArgs::with_keywords(
            vec![Value::str("hi")],
            vec![("file".into(), Value::list(vec![]))],
        );
        call_print(&capture, args).unwrap();
        assert_eq!(capture.contents(), "hi\n");
    }

    #[test]
    fn test_print_rejects_unknown_keyword() {
        let capture = OutputCapture::new(LogSink::new());
        let args = CallArgs::with_keywords(vec![], vec![("color".into(), Value::str("red"))]);
        let err = call_print(&capture, args).unwrap_err();
        assert_eq!(err.message, "'color' is an invalid keyword argument for print()");
        let args = CallArgs::with_keywords(vec![], vec![("sep".into(), Value::Int(1))]);
        let err = call_print(&capture, args).unwrap_err();
        assert_eq!(err.message, "sep must be None or a string, not int");
    }

    #[test]
    fn test_globals_hold_arm_and_delay_only() {
        let robot = RobotArm::simulated(None).into_shared();
        let globals = fresh_globals(&robot, &LogSink::new(), &InterruptHandle::new());
        let mut names: Vec<String> = globals.borrow().keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["arm", "delay"]);
    }

    #[test]
    fn test_builtins_add_print() {
        let builtins = builtins_with_print(&OutputCapture::new(LogSink::new()));
        assert!(builtins.contains_key("print"));
        assert!(builtins.contains_key("sorted"));
        assert!(!builtins.contains_key("open"));
    }
}
