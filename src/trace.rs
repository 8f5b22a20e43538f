//! The trace entry point: options, orchestration and result assembly.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::context::{Context, TraceCache, TracedModule};
use crate::engine::Engine;
use crate::error::TraceError;
use crate::loader::{ContentLoader, DiskLoader, LogLogger, TraceLogger};
use crate::plugin::BuildPlugin;
use crate::transform::WriteTransform;

/// Pre-parse transform over `(id, path, contents)`.
pub type ReadTransform = Box<dyn Fn(&str, &Path, String) -> String>;

/// Options for one trace call.
///
/// Collaborators default to the real filesystem and the `log` crate;
/// tests and embedders inject their own.
pub struct TraceOptions {
    /// The module id to trace. Required.
    pub id: String,
    /// Include each module's contents in the result. Implied by
    /// `write_transform`.
    pub include_contents: bool,
    /// Collect `require('...')` calls nested inside factory bodies of
    /// modules that declared a dependency array. Disable only for
    /// compatibility with caches produced by one-hop traces.
    pub find_nested_dependencies: bool,
    /// Fail on non-literal `require()` arguments instead of skipping
    /// them.
    pub strict_requires: bool,
    /// Content access collaborator.
    pub loader: Box<dyn ContentLoader>,
    /// Transform applied to contents before parsing and extraction.
    pub read_transform: Option<ReadTransform>,
    /// Transform pipeline applied to contents in the result.
    pub write_transform: Option<WriteTransform>,
    /// Diagnostics sink, shared with any transform that needs one.
    pub logger: Arc<dyn TraceLogger>,
    /// Plugin implementations keyed by plugin module id.
    pub plugins: HashMap<String, Arc<dyn BuildPlugin>>,
    /// Prior trace to seed the context with.
    pub cache: Option<TraceCache>,
    /// Keep the context in the result for follow-up transform work
    /// instead of releasing it at trace end.
    pub retain_context: bool,
}

impl TraceOptions {
    /// Options for tracing `id` with every collaborator defaulted.
    pub fn new<S: Into<String>>(id: S) -> Self {
        TraceOptions {
            id: id.into(),
            include_contents: false,
            find_nested_dependencies: true,
            strict_requires: false,
            loader: Box::new(DiskLoader),
            read_transform: None,
            write_transform: None,
            logger: Arc::new(LogLogger),
            plugins: HashMap::new(),
            cache: None,
            retain_context: false,
        }
    }
}

/// The outcome of a successful trace.
#[derive(Debug)]
pub struct TraceResult {
    /// The build layer in dependency order.
    pub traced: Vec<TracedModule>,
    /// Non-fatal diagnostics accumulated during the trace.
    pub warnings: Vec<String>,
    /// The trace context, when retention was requested.
    pub context: Option<Context>,
}

impl TraceResult {
    /// Rebuild a cache from this result, for seeding a later trace.
    pub fn to_cache(&self) -> TraceCache {
        TraceCache {
            traced: self.traced.clone(),
        }
    }
}

/// Trace the set of nested dependencies for the entry id in the
/// options, under the given loader config.
///
/// All-or-nothing: resolution failures abort with no partial layer.
pub fn trace(
    mut options: TraceOptions,
    config: LoaderConfig,
) -> Result<TraceResult, TraceError> {
    if options.id.is_empty() {
        return Err(TraceError::config(
            "options must include an id to know what module to trace",
        ));
    }

    let resolved = config.resolve()?;
    let mut ctx = Context::new(resolved);

    if let Some(cache) = options.cache.take() {
        ctx.seed_cache(&cache)?;
    }
    for (id, plugin) in &options.plugins {
        ctx.register_plugin_impl(id, Arc::clone(plugin));
    }

    Engine::new(&mut ctx, &options).trace_entry(&options.id)?;

    let traced = assemble(&mut ctx, &options)?;
    let warnings = std::mem::take(&mut ctx.warnings);

    let context = if options.retain_context {
        Some(ctx)
    } else {
        ctx.release();
        None
    };

    Ok(TraceResult {
        traced,
        warnings,
        context,
    })
}

/// Build the output list from the layer, reading and transforming
/// contents when requested.
fn assemble(
    ctx: &mut Context,
    options: &TraceOptions,
) -> Result<Vec<TracedModule>, TraceError> {
    let include_contents =
        options.include_contents || options.write_transform.is_some();
    let ids: Vec<String> = ctx.layer_ids().to_vec();
    let mut out = Vec::with_capacity(ids.len());

    for id in ids {
        let record = match ctx.record(&id) {
            Some(record) => record,
            None => continue,
        };
        let path = record.path.clone();

        let mut contents = None;
        if include_contents {
            contents = record.raw_contents.clone();
            if contents.is_none() {
                if let Some(path) = &path {
                    if options.loader.exists(&id, path) {
                        let mut text = options.loader.read(&id, path)?;
                        if let Some(transform) = &options.read_transform {
                            text = transform(&id, path, text);
                        }
                        contents = Some(text);
                    }
                }
            }
            if let Some(transform) = options.write_transform.as_ref() {
                if let Some(text) = contents.take() {
                    contents =
                        Some(transform(ctx, &id, path.as_deref(), text));
                }
            }
        }

        if let Some(text) = &contents {
            if let Some(record) = ctx.record_mut(&id) {
                record.transformed_contents = Some(text.clone());
            }
        }

        out.push(TracedModule {
            id,
            path,
            contents,
        });
    }

    Ok(out)
}
