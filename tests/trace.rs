use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use strata::{
    all_write_transforms, trace, BuildPlugin, LoaderConfig, PluginCapabilities,
    TraceError, TraceOptions, TraceResult, WriteTransformOptions,
};

mod common;
use common::{CapturingLogger, MemoryLoader};

fn options(id: &str, loader: &MemoryLoader) -> TraceOptions {
    let mut options = TraceOptions::new(id);
    options.loader = Box::new(loader.clone());
    options
}

fn config(value: serde_json::Value) -> Result<LoaderConfig> {
    Ok(LoaderConfig::from_value(value)?)
}

fn ids(result: &TraceResult) -> Vec<&str> {
    result.traced.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn orders_dependencies_before_dependents() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a'], function(a) { a.run(); });"),
        (
            "a.js",
            "define(['b'], function(b) { return { name: 'a', b: b }; });",
        ),
        ("b.js", "define([], function() { return { name: 'b' }; });"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["b", "a", "main"], ids(&result));
    assert_eq!(
        Some(PathBuf::from("a.js")),
        result.traced[1].path.clone()
    );
    assert!(result.warnings.is_empty());
    Ok(())
}

#[test]
fn repeated_traces_are_identical() -> Result<()> {
    let files: &[(&str, &str)] = &[
        ("main.js", "require(['a', 'b'], function(a, b) {});"),
        ("a.js", "define(['c'], function(c) { return c; });"),
        ("b.js", "define(['c'], function(c) { return c; });"),
        ("c.js", "define([], function() { return 42; });"),
    ];
    let loader = MemoryLoader::new(files);
    let first = trace(options("main", &loader), Default::default())?;
    let second = trace(options("main", &loader), Default::default())?;

    assert_eq!(first.traced, second.traced);
    Ok(())
}

#[test]
fn shared_dependency_appears_exactly_once() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a', 'b'], function(a, b) {});"),
        ("a.js", "define(['c'], function(c) { return c; });"),
        ("b.js", "define(['c'], function(c) { return c; });"),
        ("c.js", "define([], function() { return 42; });"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["c", "a", "b", "main"], ids(&result));
    Ok(())
}

#[test]
fn dependency_cycle_resolves() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a'], function(a) {});"),
        ("a.js", "define(['b'], function(b) { return 'a'; });"),
        ("b.js", "define(['a'], function(a) { return 'b'; });"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["b", "a", "main"], ids(&result));
    Ok(())
}

#[test]
fn missing_module_fails_with_not_found() {
    let loader = MemoryLoader::new(&[]);
    let err = trace(options("main", &loader), Default::default()).unwrap_err();

    assert!(matches!(err, TraceError::NotFound(_)));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn dynamic_dependency_array_fails_the_trace() {
    let loader = MemoryLoader::new(&[(
        "main.js",
        "var extra = computeId();\n\
         define(['a', extra], function(a, b) {});",
    )]);
    let err = trace(options("main", &loader), Default::default()).unwrap_err();

    assert!(matches!(err, TraceError::UnsupportedDependency { .. }));
}

#[test]
fn empty_id_is_a_config_error() {
    let loader = MemoryLoader::new(&[]);
    let err = trace(options("", &loader), Default::default()).unwrap_err();

    assert!(matches!(err, TraceError::Config(_)));
}

#[test]
fn cached_trace_makes_no_loader_calls() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a'], function(a) {});"),
        ("a.js", "define(['b'], function(b) {});"),
        ("b.js", "define([], function() {});"),
    ]);
    let first = trace(options("main", &loader), Default::default())?;

    let fresh = MemoryLoader::new(&[]);
    let mut retry = options("main", &fresh);
    retry.cache = Some(first.to_cache());
    let second = trace(retry, Default::default())?;

    assert_eq!(ids(&first), ids(&second));
    assert_eq!(0, fresh.reads());
    assert_eq!(0, fresh.exists_checks());
    Ok(())
}

#[test]
fn nested_requires_are_traced_by_default() -> Result<()> {
    let loader = MemoryLoader::new(&[
        (
            "main.js",
            "define(['a'], function(a) { var b = require('b'); return b; });",
        ),
        ("a.js", "define([], function() {});"),
        ("b.js", "define([], function() {});"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["a", "b", "main"], ids(&result));
    Ok(())
}

#[test]
fn nested_requires_can_be_skipped() -> Result<()> {
    let loader = MemoryLoader::new(&[
        (
            "main.js",
            "define(['a'], function(a) { var b = require('b'); return b; });",
        ),
        ("a.js", "define([], function() {});"),
    ]);
    let mut opts = options("main", &loader);
    opts.find_nested_dependencies = false;
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["a", "main"], ids(&result));
    Ok(())
}

#[test]
fn map_config_scopes_take_precedence_over_star() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a', 'c'], function(a, c) {});"),
        ("a.js", "define(['c'], function(c) { return c; });"),
        ("c-scoped.js", "define([], function() { return 'scoped'; });"),
        ("c-global.js", "define([], function() { return 'global'; });"),
    ]);
    let cfg = config(json!({
        "map": {
            "*": { "c": "c-global" },
            "a": { "c": "c-scoped" }
        }
    }))?;
    let result = trace(options("main", &loader), cfg)?;

    assert_eq!(vec!["c-scoped", "a", "c-global", "main"], ids(&result));
    Ok(())
}

#[test]
fn paths_config_relocates_without_renaming() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("js/lib/main.js", "require(['app/page1'], function(p) {});"),
        ("js/app/page1.js", "define([], function() {});"),
    ]);
    let cfg = config(json!({
        "baseUrl": "js/lib",
        "paths": { "app": "../app" }
    }))?;
    let result = trace(options("main", &loader), cfg)?;

    // The id stays canonical; only the location moves.
    assert_eq!(vec!["app/page1", "main"], ids(&result));
    assert_eq!(
        Some(PathBuf::from("js/app/page1.js")),
        result.traced[0].path.clone()
    );
    Ok(())
}

#[test]
fn package_names_resolve_to_their_main() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['store', 'cart'], function(s, c) {});"),
        ("store/store-main.js", "define([], function() {});"),
        ("cart/main.js", "define([], function() {});"),
    ]);
    let cfg = config(json!({
        "packages": [
            { "name": "store", "main": "store-main" },
            "cart"
        ]
    }))?;
    let result = trace(options("main", &loader), cfg)?;

    assert_eq!(vec!["store/store-main", "cart/main", "main"], ids(&result));
    Ok(())
}

#[test]
fn shim_supplies_deps_for_a_legacy_script() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['legacy'], function(l) {});"),
        ("legacy.js", "var Legacy = { version: 1 };"),
        ("dep.js", "define([], function() {});"),
    ]);
    let cfg = config(json!({
        "shim": { "legacy": { "deps": ["dep"], "exports": "Legacy" } }
    }))?;
    let mut opts = options("main", &loader);
    opts.retain_context = true;
    let result = trace(opts, cfg)?;

    assert_eq!(vec!["dep", "legacy", "main"], ids(&result));
    let ctx = result.context.as_ref().unwrap();
    let record = ctx.record("legacy").unwrap();
    assert!(record.is_shimmed);
    assert_eq!(vec!["dep".to_string()], record.dependency_ids);
    Ok(())
}

#[test]
fn shim_never_overrides_declared_deps() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['legacy'], function(l) {});"),
        ("legacy.js", "define(['real'], function(r) { return r; });"),
        ("real.js", "define([], function() {});"),
    ]);
    let cfg = config(json!({
        "shim": { "legacy": { "deps": ["shimdep"] } }
    }))?;
    let mut opts = options("main", &loader);
    opts.retain_context = true;
    let result = trace(opts, cfg)?;

    assert_eq!(vec!["real", "legacy", "main"], ids(&result));
    assert!(!result
        .context
        .as_ref()
        .unwrap()
        .record("legacy")
        .unwrap()
        .is_shimmed);
    Ok(())
}

#[test]
fn bare_commonjs_modules_are_traced() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['lib'], function(lib) {});"),
        (
            "lib.js",
            "var helper = require('./helper');\nmodule.exports = helper;",
        ),
        ("helper.js", "define([], function() { return 1; });"),
    ]);
    let mut opts = options("main", &loader);
    opts.retain_context = true;
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["helper", "lib", "main"], ids(&result));
    assert!(result.context.as_ref().unwrap().record("lib").unwrap().is_cjs);
    Ok(())
}

#[test]
fn mismatched_define_name_is_a_warning_not_an_error() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a'], function(a) {});"),
        ("a.js", "define('aliased', [], function() {});"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["a", "main"], ids(&result));
    assert_eq!(1, result.warnings.len());
    assert!(result.warnings[0].contains("aliased"));
    Ok(())
}

#[test]
fn name_only_define_mismatch_is_a_warning() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a'], function(a) {});"),
        ("a.js", "define('aliased');"),
    ]);
    let result = trace(options("main", &loader), Default::default())?;

    assert_eq!(vec!["a", "main"], ids(&result));
    assert_eq!(1, result.warnings.len());
    assert!(result.warnings[0].contains("aliased"));
    Ok(())
}

#[test]
fn fatal_errors_reach_the_injected_logger() {
    let loader = MemoryLoader::new(&[]);
    let logger = Arc::new(CapturingLogger::default());
    let mut opts = options("main", &loader);
    opts.logger = logger.clone();

    let err = trace(opts, Default::default()).unwrap_err();

    assert!(matches!(err, TraceError::NotFound(_)));
    let messages = logger.messages();
    assert_eq!(1, messages.len());
    assert!(messages[0].contains("not found"));
}

#[test]
fn canonical_plugin_prefix_is_not_remapped_again() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a!res'], function(r) {});"),
        ("b.js", "define([], function() {});"),
        ("c.js", "define([], function() {});"),
    ]);
    // a maps to b; the canonical prefix b must not chain on to c.
    let cfg = config(json!({ "map": { "*": { "a": "b", "b": "c" } } }))?;
    let result = trace(options("main", &loader), cfg)?;

    assert_eq!(vec!["b", "b!res", "main"], ids(&result));
    Ok(())
}

#[test]
fn plugin_resource_is_read_from_a_probed_file() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['text!tmpl.html'], function(t) {});"),
        ("text.js", "define([], function() { return { load: 1 }; });"),
        ("tmpl.html", "<p>not javascript</p>"),
    ]);
    let mut opts = options("main", &loader);
    opts.include_contents = true;
    opts.retain_context = true;
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["text", "text!tmpl.html", "main"], ids(&result));
    assert_eq!(
        Some("<p>not javascript</p>".to_string()),
        result.traced[1].contents.clone()
    );
    assert!(result
        .context
        .as_ref()
        .unwrap()
        .record("text!tmpl.html")
        .unwrap()
        .is_plugin_resource);
    Ok(())
}

struct VirtualTextPlugin;

impl BuildPlugin for VirtualTextPlugin {
    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            can_load: true,
            ..Default::default()
        }
    }

    fn load(&self, resource: &str) -> Result<Option<String>> {
        Ok(Some(format!("<section>{}</section>", resource)))
    }
}

#[test]
fn plugin_load_hook_supplies_virtual_source() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['text!banner.html'], function(t) {});"),
        ("text.js", "define([], function() {});"),
    ]);
    let mut opts = options("main", &loader);
    opts.include_contents = true;
    opts.plugins
        .insert("text".to_string(), Arc::new(VirtualTextPlugin));
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["text", "text!banner.html", "main"], ids(&result));
    assert_eq!(None, result.traced[1].path);
    assert_eq!(
        Some("<section>banner.html</section>".to_string()),
        result.traced[1].contents.clone()
    );
    Ok(())
}

#[test]
fn unresolvable_plugin_resource_stays_id_only() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['text!missing.html'], function(t) {});"),
        ("text.js", "define([], function() {});"),
    ]);
    let mut opts = options("main", &loader);
    opts.include_contents = true;
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["text", "text!missing.html", "main"], ids(&result));
    assert_eq!(None, result.traced[1].path);
    assert_eq!(None, result.traced[1].contents);
    Ok(())
}

#[test]
fn read_transform_runs_before_extraction() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "define(['REPLACE_ME'], function(a) {});"),
        ("a.js", "define([], function() {});"),
    ]);
    let mut opts = options("main", &loader);
    opts.include_contents = true;
    opts.read_transform =
        Some(Box::new(|_id, _path, contents: String| {
            contents.replace("REPLACE_ME", "a")
        }));
    let result = trace(opts, Default::default())?;

    assert_eq!(vec!["a", "main"], ids(&result));
    let main = result.traced.last().unwrap();
    assert!(main.contents.as_ref().unwrap().contains("['a']"));
    Ok(())
}

#[test]
fn write_transform_pipeline_names_and_stubs() -> Result<()> {
    let loader = MemoryLoader::new(&[
        ("main.js", "require(['a', 'b'], function(a, b) {});"),
        ("a.js", "define([], function() { return 'a'; });"),
        ("b.js", "define([], function() { return 'b'; });"),
    ]);
    let mut opts = options("main", &loader);
    opts.write_transform = Some(all_write_transforms(WriteTransformOptions {
        stub_modules: vec!["b".to_string()],
        ..Default::default()
    }));
    let result = trace(opts, Default::default())?;

    let by_id = |id: &str| {
        result
            .traced
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.contents.clone())
            .unwrap()
    };
    assert!(by_id("a").starts_with("define('a',"));
    assert_eq!("define({});", by_id("b"));
    Ok(())
}
