//! Injected content-access and logging collaborators.
//!
//! The engine never touches the filesystem directly; existence checks
//! and reads go through a [`ContentLoader`], defaulting to the real
//! filesystem. Collaborators return already-available data
//! synchronously; bridge genuinely asynchronous sources before the
//! engine sees them.

use std::path::Path;

use crate::error::TraceError;

/// Existence checks and content reads for module locations.
pub trait ContentLoader {
    /// Whether contents exist for the module at `path`.
    fn exists(&self, id: &str, path: &Path) -> bool;
    /// Read the contents for the module at `path`.
    fn read(&self, id: &str, path: &Path) -> Result<String, TraceError>;
}

/// The default collaborator: the real filesystem.
#[derive(Debug, Default)]
pub struct DiskLoader;

impl ContentLoader for DiskLoader {
    fn exists(&self, _id: &str, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, _id: &str, path: &Path) -> Result<String, TraceError> {
        let mut contents = std::fs::read_to_string(path)?;
        if contents.contains("\r\n") {
            contents = contents.replace("\r\n", "\n");
        }
        Ok(contents)
    }
}

/// Warning and error sink for trace diagnostics.
pub trait TraceLogger {
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Default logger backed by the `log` crate.
#[derive(Debug, Default)]
pub struct LogLogger;

impl TraceLogger for LogLogger {
    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}
