//! Post-resolution content rewriting.
//!
//! Four ordered stages make each traced module independently loadable
//! in a bundle: synthesize missing defines, adapt package mains, run
//! plugin write hooks, stub excluded modules. Stage failures are
//! recovered locally: the stage's output is discarded, the original
//! contents kept and a warning logged; a single module's transform
//! failure never aborts a trace.

pub mod defines;
pub mod packages;
pub mod plugins;
pub mod stubs;

use std::path::Path;
use std::sync::Arc;

use swc_common::Spanned;
use swc_ecma_ast::Expr;

use crate::analysis::{amd, traverse, Walk};
use crate::context::Context;
use crate::error::TraceError;
use crate::loader::{LogLogger, TraceLogger};
use crate::swc_utils::parse_script;

/// A post-trace content transform over `(context, id, path, contents)`.
pub type WriteTransform =
    Box<dyn Fn(&Context, &str, Option<&Path>, String) -> String>;

/// Options for the composed pipeline.
pub struct WriteTransformOptions {
    /// Ids whose contents are replaced with an inert stub.
    pub stub_modules: Vec<String>,
    /// Sink for recovered stage failures.
    pub logger: Arc<dyn TraceLogger>,
}

impl Default for WriteTransformOptions {
    fn default() -> Self {
        WriteTransformOptions {
            stub_modules: Vec::new(),
            logger: Arc::new(LogLogger),
        }
    }
}

/// Compose the four pipeline stages in their significant order.
///
/// Stubbing runs last so a stubbed plugin's own write output is
/// itself replaced.
pub fn all_write_transforms(options: WriteTransformOptions) -> WriteTransform {
    let WriteTransformOptions {
        stub_modules,
        logger,
    } = options;
    Box::new(move |ctx, id, path, contents| {
        let mut current = contents;
        let stages: [(&str, StageFn); 3] =
            [("defines", defines::apply), ("packages", packages::apply), ("plugins", plugins::apply)];
        for (name, stage) in stages.iter() {
            match stage(ctx, id, path, &current) {
                Ok(next) => current = next,
                Err(err) => logger.warn(&format!(
                    "{} transform failed for {}: {}",
                    name, id, err
                )),
            }
        }
        stubs::apply(ctx, id, &stub_modules, current)
    })
}

type StageFn =
    fn(&Context, &str, Option<&Path>, &str) -> Result<String, TraceError>;

/// What naming a module's define call revealed.
#[derive(Debug, Default)]
pub struct TransportInfo {
    /// Name already declared by the module, if any.
    pub named: Option<String>,
    /// Whether an anonymous define was given the canonical id.
    pub inserted: bool,
}

impl TransportInfo {
    /// Whether the contents now declare the expected id.
    pub fn declares(&self, id: &str) -> bool {
        self.inserted || self.named.as_deref() == Some(id)
    }
}

/// Give the first anonymous `define` call the canonical id, splicing
/// the name into the original source at the call's first argument.
pub fn to_transport(
    id: &str,
    contents: &str,
) -> Result<(String, TransportInfo), TraceError> {
    let parsed = parse_script(id, contents)?;
    let mut info = TransportInfo::default();
    let mut insert_at: Option<usize> = None;

    traverse(&parsed.script, |expr| {
        let call = match expr {
            Expr::Call(call) => call,
            _ => return Walk::Continue,
        };
        if amd::callee_kind(call) != Some(amd::CalleeKind::Define) {
            return Walk::Continue;
        }
        let decl = match amd::classify(call, amd::CalleeKind::Define) {
            Some(decl) => decl,
            None => return Walk::Continue,
        };
        match decl.name {
            Some(name) => info.named = Some(name),
            None => {
                if let Some(first) = call.args.first() {
                    insert_at = Some(parsed.offset_of(first.expr.span().lo));
                    info.inserted = true;
                }
            }
        }
        Walk::Stop
    });

    let contents = match insert_at {
        Some(offset) => {
            let mut out = String::with_capacity(contents.len() + id.len() + 3);
            out.push_str(&contents[..offset]);
            out.push_str(&format!("'{}',", id));
            out.push_str(&contents[offset..]);
            out
        }
        None => contents.to_string(),
    };

    Ok((contents, info))
}

pub(crate) fn make_js_array(items: &[String]) -> String {
    let quoted: Vec<String> =
        items.iter().map(|s| format!("\"{}\"", s)).collect();
    format!("[{}]", quoted.join(","))
}
