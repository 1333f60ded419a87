//! Terminal rendering of results and live log lines.

use std::io::{self, Write};
use std::sync::Arc;

use neo_engine::{ExecutionResult, LogCallback};
use neo_hardware::HardwareLog;
use owo_colors::OwoColorize;

/// Captured program output, without the trailing newline. Blank output
/// prints nothing.
pub fn write_output(output: &str) {
    if output.trim().is_empty() {
        return;
    }
    println!("{}", output.trim_end_matches('\n'));
}

pub fn write_error(error: &str) {
    println!("{}", error.red());
}

pub fn write_status(status: &str) {
    println!("{}", status.dimmed());
}

/// Output followed by the error line, if any.
pub fn write_result(result: &ExecutionResult) {
    write_output(&result.output);
    if let Some(error) = &result.error {
        write_error(error);
    }
}

/// Log callback that shows each line dimmed as it happens.
pub fn live_log() -> LogCallback {
    Arc::new(|line: &str| {
        write_status(line);
        let _ = io::stdout().flush();
    })
}

/// Same sink for the simulated joints.
pub fn hardware_log() -> HardwareLog {
    live_log()
}

pub fn clear_screen() {
    print!("\x1b[2J\x1b[H");
    let _ = io::stdout().flush();
}
