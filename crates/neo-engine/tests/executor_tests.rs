//! Integration tests for the code executor.
//!
//! Covers:
//! - one-shot and interactive modes and the session state machine
//! - sandbox restrictions (imports, print redirection)
//! - syntax and runtime error reporting
//! - log callback forwarding
//! - interruption, step limit and recursion limit
//! - deep nesting and recursion on threads with the default stack size

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use neo_engine::{CodeExecutor, ExecutionResult, ExecutorConfig, WORKER_STACK_SIZE};
use neo_hardware::{RobotArm, SharedRobot};
use parking_lot::Mutex;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn robot() -> SharedRobot {
    RobotArm::simulated(None).into_shared()
}

fn executor() -> CodeExecutor {
    CodeExecutor::new(robot())
}

/// Executor whose log callback appends to the returned buffer.
fn logged_executor() -> (CodeExecutor, Arc<Mutex<Vec<String>>>) {
    let executor = executor();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    executor.set_log_callback(Arc::new(move |line: &str| sink.lock().push(line.to_string())));
    (executor, lines)
}

/// Size `std::thread::spawn` gives a thread unless told otherwise.
const DEFAULT_THREAD_STACK: usize = 2 * 1024 * 1024;

/// Run `code` one-shot on a fresh executor inside a thread with
/// `stack_size` bytes of stack.
fn execute_on_thread(stack_size: usize, code: &'static str) -> ExecutionResult {
    let robot = robot();
    thread::Builder::new()
        .stack_size(stack_size)
        .spawn(move || CodeExecutor::new(robot).execute(code))
        .unwrap()
        .join()
        .unwrap()
}

fn error_of(result: &ExecutionResult) -> &str {
    assert!(!result.success, "expected failure, got output {:?}", result.output);
    result.error.as_deref().unwrap_or_default()
}

// ══════════════════════════════════════════════════════════════════════════════
// One-shot mode
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn execute_captures_output() {
    let result = executor().execute("for i in range(3):\n    print('step', i)");
    assert_eq!(result, ExecutionResult::ok("step 0\nstep 1\nstep 2\n"));
}

#[test]
fn execute_uses_fresh_namespace_each_call() {
    let mut executor = executor();
    assert!(executor.execute("x = 1").success);
    let result = executor.execute("print(x)");
    assert_eq!(error_of(&result), "Error (line 1): name 'x' is not defined");
    assert_eq!(result.output, "");
}

#[test]
fn execute_moves_the_shared_robot() {
    let robot = robot();
    let mut executor = CodeExecutor::new(robot.clone());
    let result = executor.execute("arm.turn_right(120)\narm.turn_left(30)\narm.elbow_right()\narm.grab()");
    assert!(result.success, "{:?}", result.error);
    let robot = robot.lock();
    assert_eq!(robot.upper_arm.angle(), 90);
    assert_eq!(robot.lower_arm.angle(), 90);
    assert!(robot.hand.is_grabbed());
}

#[test]
fn runtime_error_keeps_prior_output() {
    let result = executor().execute("print('before')\n1/0\nprint('after')");
    assert_eq!(result.output, "before\n");
    assert_eq!(error_of(&result), "Error (line 2): division by zero");
}

#[test]
fn runtime_error_inside_function_reports_innermost_line() {
    let source = "def move(a):\n    arm.set_angle(a)\n    return a / 0\n\nmove(10)";
    let result = executor().execute(source);
    assert_eq!(error_of(&result), "Error (line 3): division by zero");
}

#[test]
fn side_effects_are_not_rolled_back() {
    let robot = robot();
    let mut executor = CodeExecutor::new(robot.clone());
    let result = executor.execute("arm.set_angle(45)\nundefined_call()");
    assert!(!result.success);
    assert_eq!(robot.lock().upper_arm.angle(), 45);
}

#[test]
fn syntax_error_reports_line() {
    let result = executor().execute("arm.turn_left(");
    let error = error_of(&result);
    assert!(error.starts_with("Syntax Error (line "), "{error}");
    assert_eq!(result.output, "");
}

#[test]
fn syntax_error_on_later_line() {
    let result = executor().execute("print('ok')\nif True\n    pass");
    let error = error_of(&result);
    assert!(error.starts_with("Syntax Error (line 2): "), "{error}");
    assert_eq!(result.output, "");
}

#[test]
fn import_is_rejected() {
    let result = executor().execute("import os\nos.remove('x')");
    assert_eq!(error_of(&result), "Error (line 1): import of 'os' is not allowed");
}

#[test]
fn unsafe_builtins_are_unreachable() {
    let mut executor = executor();
    for code in ["open('f.txt')", "eval('1')", "exec('x=1')", "__import__('os')"] {
        let result = executor.execute(code);
        assert!(error_of(&result).contains("is not defined"), "{code}");
    }
}

#[test]
fn print_redirection_is_ignored() {
    let result = executor().execute("some_object = []\nprint('hi', file=some_object)\nprint(some_object)");
    assert_eq!(result, ExecutionResult::ok("hi\n[]\n"));
}

#[test]
fn delay_validates_argument() {
    let mut executor = executor();
    assert!(executor.execute("delay(0.01)\narm.delay(0)").success);
    let result = executor.execute("delay(-1)");
    assert_eq!(
        error_of(&result),
        "Error (line 1): sleep length must be non-negative"
    );
    let result = executor.execute("delay('soon')");
    assert_eq!(
        error_of(&result),
        "Error (line 1): could not convert string to float: 'soon'"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Interactive mode
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn execute_line_preserves_state() {
    let mut executor = executor();
    assert_eq!(executor.execute_line("x = 5"), ExecutionResult::ok(""));
    assert_eq!(executor.execute_line("print(x)"), ExecutionResult::ok("5\n"));
}

#[test]
fn each_line_gets_a_fresh_buffer() {
    let mut executor = executor();
    assert_eq!(executor.execute_line("print('a')").output, "a\n");
    assert_eq!(executor.execute_line("print('b')").output, "b\n");
}

#[test]
fn reset_session_clears_state() {
    let mut executor = executor();
    assert!(!executor.session_active());
    executor.execute_line("x=1");
    assert!(executor.session_active());
    executor.reset_session();
    assert!(!executor.session_active());
    let result = executor.execute_line("print(x)");
    assert_eq!(error_of(&result), "NameError: name 'x' is not defined");
    assert!(executor.session_active());
}

#[test]
fn interactive_echoes_expression_values() {
    let mut executor = executor();
    assert_eq!(executor.execute_line("1 + 1").output, "2\n");
    assert_eq!(executor.execute_line("'hi'").output, "'hi'\n");
    assert_eq!(executor.execute_line("[1, 2]").output, "[1, 2]\n");
    assert_eq!(executor.execute_line("arm").output, "<arm>\n");
    assert_eq!(executor.execute_line("None").output, "");
    assert_eq!(executor.execute_line("arm.grab()").output, "");
}

#[test]
fn interactive_errors_name_the_kind() {
    let mut executor = executor();
    let result = executor.execute_line("1/0");
    assert_eq!(error_of(&result), "ZeroDivisionError: division by zero");
    let result = executor.execute_line("def f(:");
    assert!(error_of(&result).starts_with("Syntax Error (line 1): "));
}

#[test]
fn interactive_blocks_and_functions() {
    let mut executor = executor();
    assert!(executor
        .execute_line("def double(n):\n    return n * 2\n")
        .success);
    assert_eq!(executor.execute_line("double(21)").output, "42\n");
}

#[test]
fn one_shot_does_not_see_interactive_state() {
    let mut executor = executor();
    executor.execute_line("y = 2");
    assert!(!executor.execute("print(y)").success);
    assert_eq!(executor.execute_line("print(y)").output, "2\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Log callback
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn log_receives_prints_and_facade_calls() {
    let (mut executor, lines) = logged_executor();
    let result = executor.execute("arm.turn_left(30)\nprint('a', 'b')\narm.grab()\ndelay(0)");
    assert!(result.success);
    assert_eq!(
        *lines.lock(),
        vec!["arm.turn_left(30)", "a b", "arm.grab()", "delay(0)"]
    );
}

#[test]
fn log_gets_print_without_trailing_newline() {
    let (mut executor, lines) = logged_executor();
    executor.execute("print('x', end='')\nprint('multi\\n')");
    assert_eq!(*lines.lock(), vec!["x", "multi"]);
}

#[test]
fn interactive_echo_is_logged() {
    let (mut executor, lines) = logged_executor();
    executor.execute_line("3 * 3");
    assert_eq!(*lines.lock(), vec!["9"]);
}

#[test]
fn clearing_callback_stops_forwarding() {
    let (mut executor, lines) = logged_executor();
    executor.clear_log_callback();
    executor.execute("print('quiet')\narm.grab()");
    assert!(lines.lock().is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Interruption & limits
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn interrupt_stops_infinite_loop() {
    let mut executor = executor();
    let handle = executor.interrupt_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let result = executor.execute("print('spinning')\nwhile True:\n    pass");
    stopper.join().unwrap();
    assert_eq!(result.output, "spinning\n");
    assert!(error_of(&result).ends_with("execution stopped by user"));

    // The next call starts with a cleared flag.
    assert!(executor.execute("print('again')").success);
}

#[test]
fn interrupt_wakes_delay() {
    let mut executor = executor();
    let handle = executor.interrupt_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let started = Instant::now();
    let result = executor.execute("delay(30)");
    stopper.join().unwrap();
    assert_eq!(error_of(&result), "Error (line 1): execution stopped by user");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn interrupt_is_not_caught_by_except() {
    let mut executor = executor();
    let handle = executor.interrupt_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let result = executor.execute("try:\n    delay(30)\nexcept:\n    print('caught')");
    stopper.join().unwrap();
    assert_eq!(result.output, "");
    assert!(!result.success);
}

#[test]
fn step_limit_is_enforced() {
    let config = ExecutorConfig {
        step_limit: Some(10_000),
        ..ExecutorConfig::default()
    };
    let mut executor = CodeExecutor::with_config(robot(), config);
    let result = executor.execute("n = 0\nwhile True:\n    n += 1");
    assert!(error_of(&result).contains("execution step limit of 10000 exceeded"));
    assert!(executor.execute("print(sorted([3, 1, 2]))").success);
}

#[test]
fn recursion_limit_reports_recursion_error() {
    let robot = robot();
    let error = thread::Builder::new()
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            let mut executor = CodeExecutor::new(robot);
            let result = executor.execute("def down(n):\n    return down(n + 1)\n\ndown(0)");
            result.error
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(
        error.as_deref(),
        Some("Error (line 2): maximum recursion depth exceeded")
    );
}

#[test]
fn recursion_error_on_default_sized_thread() {
    let result = execute_on_thread(DEFAULT_THREAD_STACK, "def f():\n    f()\nf()");
    assert_eq!(error_of(&result), "Error (line 2): maximum recursion depth exceeded");
}

#[test]
fn str_of_deep_list_returns_recursion_error() {
    let code = "x = []\nfor i in range(200000):\n    x = [x]\nprint(len(str(x)))";
    let result = execute_on_thread(DEFAULT_THREAD_STACK, code);
    assert_eq!(
        error_of(&result),
        "Error (line 4): maximum recursion depth exceeded while getting the repr of an object"
    );
}

#[test]
fn deep_list_is_freed_without_recursing() {
    let code = "x = []\nfor i in range(300000):\n    x = [x]\nprint(1)";
    let result = execute_on_thread(DEFAULT_THREAD_STACK, code);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.output, "1\n");
}

#[test]
fn comparing_deep_lists_returns_recursion_error() {
    let code = "a = []\nb = []\nfor i in range(100000):\n    a = [a]\n    b = [b]\nprint(a == b)";
    let result = execute_on_thread(DEFAULT_THREAD_STACK, code);
    assert_eq!(
        error_of(&result),
        "Error (line 6): maximum recursion depth exceeded in comparison"
    );
}

#[test]
fn interactive_echo_of_deep_list_fails_cleanly() {
    let robot = robot();
    let results = thread::Builder::new()
        .stack_size(DEFAULT_THREAD_STACK)
        .spawn(move || {
            let mut executor = CodeExecutor::new(robot);
            let built = executor.execute_line("x = []\nfor i in range(5000):\n    x = [x]");
            let shown = executor.execute_line("x");
            let after = executor.execute_line("len(x)");
            (built, shown, after)
        })
        .unwrap()
        .join()
        .unwrap();
    let (built, shown, after) = results;
    assert!(built.success);
    assert_eq!(
        error_of(&shown),
        "RecursionError: maximum recursion depth exceeded while getting the repr of an object"
    );
    assert_eq!(after.output, "1\n");
}

#[test]
fn range_length_overflow_is_reported() {
    let result = executor().execute("print(len(range(-2**62, 2**62)))");
    assert_eq!(
        error_of(&result),
        "Error (line 1): Python int too large to convert to C ssize_t"
    );
    let result = executor().execute("print(range(-2**62, 2**62)[-1])");
    assert_eq!(result.output, "4611686018427387903\n");
}

#[test]
fn resizing_dict_during_loop_is_reported() {
    let result = executor().execute("d = {'a': 1}\nfor k in d:\n    d['b'] = 2");
    assert_eq!(
        error_of(&result),
        "Error (line 2): dictionary changed size during iteration"
    );
}

#[test]
fn leading_byte_order_mark_is_ignored() {
    let result = executor().execute("\u{feff}print(1)");
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.output, "1\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Result contract
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn success_matches_error_absence() {
    let mut executor = executor();
    for code in ["print(1)", "1/0", "x = ", "import sys", "arm.fly()", "pass"] {
        let result = executor.execute(code);
        assert_eq!(result.success, result.error.is_none(), "{code}");
        let result = executor.execute_line(code);
        assert_eq!(result.success, result.error.is_none(), "{code}");
    }
}

#[test]
fn result_serializes_to_json() {
    let result = executor().execute("print('hi')");
    let json = result.to_json().unwrap();
    assert_eq!(json, r#"{"output":"hi\n","success":true}"#);
}
