//! Student-code executor with one-shot and interactive modes.

use std::panic::{self, AssertUnwindSafe};

use neo_eval::{EvalResult, Evaluator, InterruptHandle, Namespace, RuntimeError};
use neo_hardware::SharedRobot;
use neo_types::ast::Module;
use neo_types::{SourceFile, SyntaxErrors};
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::log::{LogCallback, LogSink};
use crate::namespace::{builtins_with_print, fresh_globals, OutputCapture};
use crate::result::ExecutionResult;

/// Stack size for dedicated executor threads.
///
/// Any thread can run an executor: the evaluator moves onto heap-allocated
/// stack segments when it runs low. A large initial stack just means deep
/// student recursion rarely needs a new segment.
pub const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Persistent state of interactive mode.
struct Session {
    globals: Namespace,
}

/// Runs student code against the allow-listed namespace.
///
/// [`execute`](Self::execute) builds a fresh namespace every call;
/// [`execute_line`](Self::execute_line) keeps one across calls until
/// [`reset_session`](Self::reset_session). Neither ever panics or returns an
/// error: every failure becomes a failed [`ExecutionResult`].
///
/// Values inside a namespace are not thread-safe, so create the executor
/// on the thread that will run code (see [`WORKER_STACK_SIZE`]).
pub struct CodeExecutor {
    robot: SharedRobot,
    config: ExecutorConfig,
    log: LogSink,
    interrupt: InterruptHandle,
    session: Option<Session>,
}

impl CodeExecutor {
    pub fn new(robot: SharedRobot) -> Self {
        Self::with_config(robot, ExecutorConfig::default())
    }

    pub fn with_config(robot: SharedRobot, config: ExecutorConfig) -> Self {
        Self {
            robot,
            config,
            log: LogSink::new(),
            interrupt: InterruptHandle::new(),
            session: None,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Receive print lines and facade traces as they happen.
    pub fn set_log_callback(&self, callback: LogCallback) {
        self.log.set(callback);
    }

    pub fn clear_log_callback(&self) {
        self.log.clear();
    }

    /// Handle that stops the in-flight call with `KeyboardInterrupt`.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Whether interactive mode holds a namespace.
    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Discard the interactive namespace.
    pub fn reset_session(&mut self) {
        if self.session.take().is_some() {
            debug!("Interactive session reset");
        }
    }

    /// Run `code` as a complete program in a fresh namespace.
    pub fn execute(&mut self, code: &str) -> ExecutionResult {
        self.interrupt.clear();
        debug!(bytes = code.len(), "execute");
        let module = match parse(code) {
            Ok(module) => module,
            Err(errors) => return ExecutionResult::failed("", format_syntax_error(&errors)),
        };

        let capture = OutputCapture::new(self.log.clone());
        let globals = fresh_globals(&self.robot, &self.log, &self.interrupt);
        let outcome = guarded(|| self.evaluator(globals, &capture).run_module(&module));

        let output = capture.contents();
        match outcome {
            Ok(()) => ExecutionResult::ok(output),
            Err(Failure::Runtime(err)) => {
                debug!("execute failed: {err}");
                ExecutionResult::failed(output, format_runtime_error(&err))
            }
            Err(Failure::Panic(message)) => {
                ExecutionResult::failed(output, format!("Error: internal error: {message}"))
            }
        }
    }

    /// Run one interactive submission against the persistent namespace.
    ///
    /// Non-`None` values of top-level expression statements are echoed as
    /// their `repr()`.
    pub fn execute_line(&mut self, line: &str) -> ExecutionResult {
        self.interrupt.clear();
        debug!(bytes = line.len(), "execute_line");
        let globals = match &self.session {
            Some(session) => session.globals.clone(),
            None => {
                let globals = fresh_globals(&self.robot, &self.log, &self.interrupt);
                self.session = Some(Session {
                    globals: globals.clone(),
                });
                debug!("Interactive session started");
                globals
            }
        };
        let module = match parse(line) {
            Ok(module) => module,
            Err(errors) => return ExecutionResult::failed("", format_syntax_error(&errors)),
        };

        let capture = OutputCapture::new(self.log.clone());
        let outcome = guarded(|| {
            let mut echo = |value: &neo_eval::Value| -> EvalResult<()> {
                capture.print(&value.repr()?, "\n");
                Ok(())
            };
            self.evaluator(globals, &capture)
                .run_interactive(&module, &mut echo)
        });

        let output = capture.contents();
        match outcome {
            Ok(()) => ExecutionResult::ok(output),
            Err(Failure::Runtime(err)) => ExecutionResult::failed(output, err.to_string()),
            Err(Failure::Panic(message)) => {
                self.session = None;
                ExecutionResult::failed(output, format!("Error: internal error: {message}"))
            }
        }
    }

    fn evaluator(&self, globals: Namespace, capture: &OutputCapture) -> Evaluator {
        Evaluator::new(globals, builtins_with_print(capture))
            .with_limits(self.config.into())
            .with_interrupt(self.interrupt.clone())
    }
}

enum Failure {
    Runtime(RuntimeError),
    Panic(String),
}

/// Run `f`, turning a panic into a [`Failure`] instead of unwinding.
fn guarded(f: impl FnOnce() -> EvalResult<()>) -> Result<(), Failure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(Failure::Runtime),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Evaluator panicked: {message}");
            Err(Failure::Panic(message))
        }
    }
}

fn parse(code: &str) -> Result<Module, SyntaxErrors> {
    neo_parser::parse_source(&SourceFile::student(code))
}

/// `Syntax Error (line N): <message>` for the first error.
pub fn format_syntax_error(errors: &SyntaxErrors) -> String {
    match errors.first() {
        Some(first) => format!("Syntax Error (line {}): {}", first.line(), first.message),
        None => "Syntax Error: invalid syntax".to_string(),
    }
}

/// `Error (line N): <message>`, or `Error: <message>` without a student
/// frame. An empty message falls back to the error kind.
pub fn format_runtime_error(err: &RuntimeError) -> String {
    let message = if err.message.is_empty() {
        err.kind.name()
    } else {
        err.message.as_str()
    };
    match err.student_line() {
        Some(line) => format!("Error (line {line}): {message}"),
        None => format!("Error: {message}"),
    }
}
