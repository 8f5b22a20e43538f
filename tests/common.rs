use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Mutex;

use indexmap::IndexMap;

use strata::error::TraceError;
use strata::{ContentLoader, TraceLogger};

/// In-memory content loader keyed by normalized path strings, with
/// call counters for the cache idempotence property.
#[derive(Clone, Default)]
pub struct MemoryLoader {
    inner: Rc<Inner>,
}

#[derive(Default)]
struct Inner {
    files: IndexMap<String, String>,
    reads: Cell<usize>,
    exists_checks: Cell<usize>,
}

impl MemoryLoader {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(path, contents)| (path.to_string(), contents.to_string()))
            .collect();
        MemoryLoader {
            inner: Rc::new(Inner {
                files,
                reads: Cell::new(0),
                exists_checks: Cell::new(0),
            }),
        }
    }

    pub fn reads(&self) -> usize {
        self.inner.reads.get()
    }

    pub fn exists_checks(&self) -> usize {
        self.inner.exists_checks.get()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/")
    }
}

/// Logger that records every message for assertions.
#[derive(Default)]
pub struct CapturingLogger {
    messages: Mutex<Vec<String>>,
}

impl CapturingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl TraceLogger for CapturingLogger {
    fn warn(&self, msg: &str) {
        self.messages.lock().unwrap().push(msg.to_string());
    }

    fn error(&self, msg: &str) {
        self.messages.lock().unwrap().push(msg.to_string());
    }
}

impl ContentLoader for MemoryLoader {
    fn exists(&self, _id: &str, path: &Path) -> bool {
        self.inner.exists_checks.set(self.inner.exists_checks.get() + 1);
        self.inner.files.contains_key(&Self::key(path))
    }

    fn read(&self, _id: &str, path: &Path) -> Result<String, TraceError> {
        self.inner.reads.set(self.inner.reads.get() + 1);
        self.inner
            .files
            .get(&Self::key(path))
            .cloned()
            .ok_or_else(|| TraceError::NotFound(path.to_path_buf()))
    }
}
