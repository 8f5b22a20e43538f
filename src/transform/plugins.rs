//! Stage 3: plugin build-time write hooks.
use std::path::Path;

use crate::context::Context;
use crate::error::TraceError;
use crate::plugin::ModuleWriter;

use super::to_transport;

/// Dispatch a registered plugin's write capability for a
/// plugin-prefixed id. The plugin owns the decision to replace the
/// contents or leave them untouched.
pub fn apply(
    ctx: &Context,
    id: &str,
    _path: Option<&Path>,
    contents: &str,
) -> Result<String, TraceError> {
    // The layer id is already canonical; split it instead of sending
    // it back through resolution, which would remap the prefix again.
    let (prefix, resource) = match id.find('!') {
        Some(split) => (&id[..split], &id[split + 1..]),
        None => return Ok(contents.to_string()),
    };
    let plugin = match ctx.plugin_impl(prefix) {
        Some(plugin) => plugin,
        None => return Ok(contents.to_string()),
    };
    if !plugin.capabilities().can_write {
        return Ok(contents.to_string());
    }

    let mut writer = ContentWriter {
        contents: contents.to_string(),
        failure: None,
    };
    plugin
        .write(prefix, resource, &mut writer)
        .map_err(|e| TraceError::Plugin {
            id: prefix.to_string(),
            reason: e.to_string(),
        })?;
    if let Some(err) = writer.failure {
        return Err(err);
    }
    Ok(writer.contents)
}

struct ContentWriter {
    contents: String,
    failure: Option<TraceError>,
}

impl ModuleWriter for ContentWriter {
    fn replace(&mut self, contents: String) {
        self.contents = contents;
    }

    fn as_module(&mut self, id: &str, contents: String) {
        match to_transport(id, &contents) {
            Ok((named, _)) => self.contents = named,
            Err(err) => self.failure = Some(err),
        }
    }
}
