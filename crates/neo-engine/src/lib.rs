//! # NEO Execution Engine
//!
//! Runs student programs against a small allow-listed namespace:
//!
//! - `arm`: the [`StudentArm`] facade over a shared robot handle
//! - `delay(seconds)`: interruptible sleep
//! - `print`: captured into the call's [`ExecutionResult::output`] and
//!   forwarded line by line to an optional [`LogCallback`]
//! - the built-ins of `neo_eval::builtin_table`
//!
//! ```no_run
//! use neo_engine::CodeExecutor;
//! use neo_hardware::RobotArm;
//!
//! let robot = RobotArm::simulated(None).into_shared();
//! let mut executor = CodeExecutor::new(robot);
//! let result = executor.execute("arm.turn_right(45)\nprint('done')");
//! assert!(result.success);
//! ```

mod config;
mod executor;
mod facade;
mod log;
mod namespace;
mod result;

pub use config::ExecutorConfig;
pub use neo_eval::InterruptHandle;
pub use executor::{format_runtime_error, format_syntax_error, CodeExecutor, WORKER_STACK_SIZE};
pub use facade::{delay_function, ArmMethod, StudentArm, DEFAULT_TURN};
pub use log::{LogCallback, LogSink};
pub use result::ExecutionResult;
