//! Per-invocation diagnostic trace.

use std::cell::RefCell;
use tracing::{debug, warn};

/// Append-only trace lines for one handler invocation.
///
/// Lines are also mirrored to `tracing` under the `record_hooks::trace` target.
#[derive(Debug, Default)]
pub struct TraceLog {
    lines: RefCell<Vec<String>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never fails. Readers only borrow inside a single call, so the mutable borrow is free
    /// in practice; if it is not, the line is still emitted to `tracing` with a warning.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "record_hooks::trace", "{}", line);
        match self.lines.try_borrow_mut() {
            Ok(mut lines) => lines.push(line),
            Err(_) => warn!(target: "record_hooks::trace", line = %line, "Trace line dropped"),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}
