//! Step budget, recursion depth and cooperative interruption.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{EvalResult, RuntimeError};

/// Default maximum call depth.
pub const DEFAULT_RECURSION_LIMIT: usize = 200;

/// Free stack below which deep evaluation switches to a fresh heap segment.
const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each heap-allocated stack segment.
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// Longest uninterrupted sleep inside [`InterruptHandle::sleep`].
pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Resource limits applied while evaluating student code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum statements + loop iterations + calls; `None` is unlimited.
    pub step_limit: Option<u64>,
    /// Maximum call depth, `<module>` included.
    pub recursion_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            step_limit: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

thread_local! {
    static NESTING_LIMIT: Cell<usize> = const { Cell::new(DEFAULT_RECURSION_LIMIT) };
}

/// How deep `repr`, `==` and ordering may descend into nested containers
/// on this thread.
pub(crate) fn nesting_limit() -> usize {
    NESTING_LIMIT.with(Cell::get)
}

/// Applies a recursion limit to container traversal until dropped.
pub(crate) struct NestingScope {
    previous: usize,
}

impl NestingScope {
    pub(crate) fn enter(limit: usize) -> Self {
        let previous = NESTING_LIMIT.with(|cell| cell.replace(limit));
        Self { previous }
    }
}

impl Drop for NestingScope {
    fn drop(&mut self) {
        NESTING_LIMIT.with(|cell| cell.set(self.previous));
    }
}

/// Step one level deeper into a nested structure, failing with
/// `RecursionError` once [`nesting_limit`] is reached.
pub(crate) fn descend(depth: usize, context: &str) -> EvalResult<usize> {
    if depth >= nesting_limit() {
        return Err(RuntimeError::recursion(context));
    }
    Ok(depth + 1)
}

/// Run `f`, first moving onto a heap-allocated stack segment when the
/// current thread's stack is nearly used up.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

/// Shared flag that asks a running evaluation to stop.
///
/// Cloneable and `Send + Sync`, so a Ctrl-C handler or UI thread can hold
/// one while a worker thread evaluates.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the running evaluation stop with `KeyboardInterrupt`.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Fail with `KeyboardInterrupt` if an interrupt is pending.
    pub fn check(&self) -> EvalResult<()> {
        if self.is_interrupted() {
            Err(RuntimeError::interrupted())
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking every [`SLEEP_SLICE`] to honour an
    /// interrupt.
    pub fn sleep(&self, duration: Duration) -> EvalResult<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
