//! Stage 1: synthesize missing module declarations.
use std::path::Path;

use crate::config::ShimConfig;
use crate::context::Context;
use crate::error::TraceError;

use super::{make_js_array, to_transport};

/// Name an anonymous define in place; append a synthesized define for
/// modules that never declare one, honoring any shim config.
pub fn apply(
    ctx: &Context,
    id: &str,
    _path: Option<&Path>,
    contents: &str,
) -> Result<String, TraceError> {
    let (mut contents, info) = to_transport(id, contents)?;

    if info.declares(id) || ctx.config.skip_module_insertion {
        return Ok(contents);
    }

    // Shim config may be declared against the module id or against
    // the package name when the module is a package main.
    let package = ctx.config.pkgs_main.get(id);
    let shim = ctx
        .config
        .shim
        .get(id)
        .or_else(|| package.and_then(|pkg| ctx.config.shim.get(pkg)));

    match shim {
        Some(shim) if ctx.config.wrap_shim => {
            contents = wrap_shimmed(id, shim, &contents);
        }
        Some(shim) => {
            contents.push_str(&append_shimmed(id, shim));
        }
        None => {
            contents
                .push_str(&format!("\ndefine(\"{}\", function(){{}});\n", id));
        }
    }

    Ok(contents)
}

fn append_shimmed(id: &str, shim: &ShimConfig) -> String {
    let deps = if shim.deps.is_empty() {
        String::new()
    } else {
        format!("{}, ", make_js_array(&shim.deps))
    };
    let factory = match &shim.exports {
        Some(exports) => format!(
            "(function (global) {{\n\
             \x20   return function () {{\n\
             \x20       return global.{};\n\
             \x20   }};\n\
             }}(this))",
            exports
        ),
        None => "function(){}".to_string(),
    };
    format!("\ndefine(\"{}\", {}{});\n", id, deps, factory)
}

fn wrap_shimmed(id: &str, shim: &ShimConfig, contents: &str) -> String {
    let deps = if shim.deps.is_empty() {
        "[], ".to_string()
    } else {
        format!("{}, ", make_js_array(&shim.deps))
    };
    let ret = match &shim.exports {
        Some(exports) => format!("\nreturn root.{};", exports),
        None => String::new(),
    };
    format!(
        "(function(root) {{\n\
         define(\"{}\", {}function() {{\n\
         \x20 return (function() {{\n\
         {}\n{}\n\
         \x20 }}).apply(root, arguments);\n\
         }});\n\
         }}(this));\n",
        id, deps, contents, ret
    )
}
