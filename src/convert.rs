//! CommonJS to AMD conversion, usable as a pre-parse transform.
use std::sync::Arc;

use crate::analysis::{uses_amd, uses_commonjs};
use crate::error::TraceError;
use crate::loader::TraceLogger;
use crate::swc_utils::parse_script;
use crate::trace::ReadTransform;

/// Wrap a bare CommonJS module in an AMD declaration.
///
/// Sources that already use the AMD API, or that show no CommonJS
/// conventions at all, pass through unchanged. When the module
/// references `__filename` or `__dirname`, a preamble derives them
/// from the module uri.
pub fn convert(id: &str, contents: &str) -> Result<String, TraceError> {
    let parsed = parse_script(id, contents).map_err(|e| TraceError::Conversion {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    let props = uses_commonjs(&parsed.script);
    if uses_amd(&parsed.script) || !props.any() {
        return Ok(contents.to_string());
    }

    let preamble = if props.dirname || props.filename {
        "var __filename = module.uri || \"\", \
         __dirname = \
         __filename.substring(0, __filename.lastIndexOf(\"/\") + 1); "
    } else {
        ""
    };

    Ok(format!(
        "define(function (require, exports, module) {{{}{}\n}});\n",
        preamble, contents
    ))
}

/// Build a read transform that converts bare CommonJS modules on the
/// way in. A module that cannot be converted is passed through with a
/// warning to the logger instead of failing the trace.
pub fn cjs_read_transform(logger: Arc<dyn TraceLogger>) -> ReadTransform {
    Box::new(move |id, _path, contents| match convert(id, &contents) {
        Ok(converted) => converted,
        Err(err) => {
            logger.warn(&format!(
                "could not convert {}, skipping it: {}",
                id, err
            ));
            contents
        }
    })
}
