//! Script mode: run one file and report the outcome.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use neo_engine::ExecutionResult;

use crate::console;
use crate::worker::Worker;

/// Run `path` as a complete program. Returns whether it succeeded.
pub fn run_script(worker: &Worker, path: &Path) -> Result<bool> {
    let code = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let result = worker.execute(&code)?;
    report(&result);
    Ok(result.success)
}

fn report(result: &ExecutionResult) {
    console::write_output(&result.output);
    match &result.error {
        None => console::write_status("Execution complete."),
        Some(error) => console::write_error(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_engine::ExecutorConfig;
    use neo_hardware::RobotArm;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn script(code: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(code.as_bytes()).unwrap();
        file
    }

    fn worker() -> Worker {
        let robot = RobotArm::simulated(None).into_shared();
        Worker::spawn(robot, ExecutorConfig::default(), None).unwrap()
    }

    #[test]
    fn test_successful_script() {
        let worker = worker();
        let file = script("arm.grab()\nprint('ok')\n");
        assert!(run_script(&worker, file.path()).unwrap());
    }

    #[test]
    fn test_failing_script() {
        let worker = worker();
        let file = script("print(1 / 0)\n");
        assert!(!run_script(&worker, file.path()).unwrap());
    }

    #[test]
    fn test_missing_script() {
        let worker = worker();
        let dir = tempfile::tempdir().unwrap();
        let err = run_script(&worker, &dir.path().join("nope.py")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }
}
