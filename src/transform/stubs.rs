//! Stage 4: stub excluded modules.
use crate::context::Context;

/// Inert declaration for a stubbed plugin implementation; dynamic
/// loading must fail loudly at runtime.
pub const PLUGIN_STUB: &str = "define({load: function(id){\
throw new Error(\"Dynamic load not allowed: \" + id);}});";

/// Inert declaration for a stubbed plain module.
pub const MODULE_STUB: &str = "define({});";

/// Replace the contents of stub-listed modules with a minimal inert
/// declaration. Applied last, after any plugin write, so a stubbed
/// plugin's own generated content is never rewritten by its hook.
pub fn apply(
    ctx: &Context,
    id: &str,
    stub_modules: &[String],
    contents: String,
) -> String {
    if !stub_modules.iter().any(|stub| stub == id) {
        return contents;
    }
    if ctx.is_plugin(id) {
        PLUGIN_STUB.to_string()
    } else {
        MODULE_STUB.to_string()
    }
}
