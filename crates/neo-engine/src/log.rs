//! Real-time log forwarding.

use std::sync::Arc;

use parking_lot::RwLock;

/// Receives one line per printed line and per facade call.
///
/// Invoked on the thread running student code.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Replaceable slot holding the current [`LogCallback`].
///
/// Clones share the slot, so a facade built before `set_log_callback`
/// still reaches the new callback.
#[derive(Clone, Default)]
pub struct LogSink {
    slot: Arc<RwLock<Option<LogCallback>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, callback: LogCallback) {
        *self.slot.write() = Some(callback);
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Forward `line`; a no-op without a callback.
    pub fn emit(&self, line: &str) {
        let callback = self.slot.read().clone();
        if let Some(callback) = callback {
            callback(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_clones_share_callback() {
        let sink = LogSink::new();
        let other = sink.clone();
        other.emit("dropped");

        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        sink.set(Arc::new(move |line: &str| captured.lock().push(line.to_string())));
        other.emit("kept");
        sink.clear();
        other.emit("dropped again");

        assert_eq!(*lines.lock(), vec!["kept"]);
        assert!(!other.is_set());
    }
}
