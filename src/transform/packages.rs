//! Stage 2: package main adapters.
use std::path::Path;

use crate::analysis::named_define;
use crate::context::Context;
use crate::error::TraceError;
use crate::swc_utils::parse_script;

/// When a module is a package's designated main and its contents do
/// not already declare the package name, append an adapter define so
/// requiring the package name forwards to the main module's export.
pub fn apply(
    ctx: &Context,
    id: &str,
    _path: Option<&Path>,
    contents: &str,
) -> Result<String, TraceError> {
    let package = match ctx.config.pkgs_main.get(id) {
        Some(package) => package,
        None => return Ok(contents.to_string()),
    };

    let parsed = parse_script(id, contents)?;
    let has_package_name =
        named_define(&parsed.script).as_deref() == Some(package.as_str());

    let mut contents = contents.to_string();
    if !has_package_name {
        contents.push_str(&format!(
            ";define('{}', ['{}'], function (main) {{ return main; }});\n",
            package, id
        ));
    }
    Ok(contents)
}
