//! Background execution thread.
//!
//! The executor lives on its own thread with a large stack; the front end
//! talks to it over a pair of channels and keeps only the interrupt handle.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use neo_engine::{
    CodeExecutor, ExecutionResult, ExecutorConfig, InterruptHandle, LogCallback, WORKER_STACK_SIZE,
};
use neo_hardware::SharedRobot;
use tracing::debug;

enum Request {
    Script(String),
    Line(String),
    Reset,
}

pub struct Worker {
    requests: Sender<Request>,
    results: Receiver<ExecutionResult>,
    interrupt: InterruptHandle,
    thread: JoinHandle<()>,
}

impl Worker {
    pub fn spawn(robot: SharedRobot, config: ExecutorConfig, log: Option<LogCallback>) -> Result<Self> {
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (result_tx, result_rx) = bounded::<ExecutionResult>(1);
        let (handle_tx, handle_rx) = bounded::<InterruptHandle>(1);

        let thread = thread::Builder::new()
            .name("neo-executor".to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let mut executor = CodeExecutor::with_config(robot, config);
                if let Some(log) = log {
                    executor.set_log_callback(log);
                }
                if handle_tx.send(executor.interrupt_handle()).is_err() {
                    return;
                }
                for request in request_rx {
                    let result = match request {
                        Request::Script(code) => executor.execute(&code),
                        Request::Line(line) => executor.execute_line(&line),
                        Request::Reset => {
                            executor.reset_session();
                            continue;
                        }
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("Executor thread stopped");
            })
            .context("failed to spawn executor thread")?;

        let interrupt = handle_rx
            .recv()
            .context("executor thread exited during startup")?;
        Ok(Self {
            requests: request_tx,
            results: result_rx,
            interrupt,
            thread,
        })
    }

    /// Handle that stops whatever the worker is running.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Run a whole program in a fresh namespace.
    pub fn execute(&self, code: &str) -> Result<ExecutionResult> {
        self.round_trip(Request::Script(code.to_string()))
    }

    /// Run one REPL submission against the persistent namespace.
    pub fn execute_line(&self, line: &str) -> Result<ExecutionResult> {
        self.round_trip(Request::Line(line.to_string()))
    }

    pub fn reset_session(&self) -> Result<()> {
        self.requests
            .send(Request::Reset)
            .map_err(|_| anyhow!("executor thread is gone"))
    }

    /// Stop the thread after it finishes any queued request.
    pub fn join(self) -> Result<()> {
        let Worker {
            requests, thread, ..
        } = self;
        drop(requests);
        thread
            .join()
            .map_err(|_| anyhow!("executor thread panicked"))
    }

    fn round_trip(&self, request: Request) -> Result<ExecutionResult> {
        self.requests
            .send(request)
            .map_err(|_| anyhow!("executor thread is gone"))?;
        self.results
            .recv()
            .context("executor thread stopped before replying")
    }
}
