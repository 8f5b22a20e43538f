//! Trace failure modes.

use std::path::PathBuf;

use thiserror::Error;

/// Every way a trace can fail.
///
/// Resolution failures are fatal and abort the whole trace; the
/// transform pipeline recovers from its own stage errors instead of
/// surfacing them here.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Malformed or unusable loader configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No contents exist at the resolved module location.
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// A dependency reference that static analysis cannot evaluate.
    #[error("unsupported dynamic dependency in module {id}")]
    UnsupportedDependency { id: String },

    /// A plugin hook reported failure.
    #[error("plugin {id} failed: {reason}")]
    Plugin { id: String, reason: String },

    /// CommonJS conversion could not process the module.
    #[error("cannot convert module {id}: {reason}")]
    Conversion { id: String, reason: String },

    /// The module source did not parse as a script.
    #[error("cannot parse module {id}: {reason}")]
    Parse { id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraceError {
    /// Shorthand for a [`TraceError::Config`] from any message.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TraceError::Config(msg.into())
    }
}
