//! Build-time loader plugin capabilities.
//!
//! Plugins are modules addressed by a `prefix!resource` id. At build
//! time a registered plugin implementation may supply virtual source
//! for a resource and may rewrite contents through the transform
//! pipeline's write stage. Dispatch is by explicit capability check,
//! never by probing for methods.

use anyhow::Result;

use serde::Serialize;

/// Capability flags a plugin declares up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PluginCapabilities {
    /// Can supply virtual source for a resource at trace time.
    pub can_load: bool,
    /// Exposes a build-time write hook for traced resources.
    pub can_write: bool,
    /// Exposes a build-time whole-file write hook.
    pub can_write_file: bool,
}

/// Receiver for a plugin's write hook output.
pub trait ModuleWriter {
    /// Replace the module contents entirely.
    fn replace(&mut self, contents: String);
    /// Write contents as a named module; the supplied source is run
    /// through define naming before it replaces the contents.
    fn as_module(&mut self, id: &str, contents: String);
}

/// A build-time plugin implementation registered with a trace.
pub trait BuildPlugin {
    /// The capabilities this plugin declares.
    fn capabilities(&self) -> PluginCapabilities;

    /// Supply virtual source for a resource. Only consulted when
    /// `can_load` is declared and no file backs the resource.
    fn load(&self, _resource: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Rewrite the traced contents of a resource. Only invoked when
    /// `can_write` is declared. Leaving the writer untouched keeps
    /// the original contents.
    fn write(
        &self,
        _prefix: &str,
        _resource: &str,
        _writer: &mut dyn ModuleWriter,
    ) -> Result<()> {
        Ok(())
    }
}
