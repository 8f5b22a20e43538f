//! Per-trace mutable state: module records, registries and the layer.
//!
//! A [`Context`] is created for one trace call and exclusively owned
//! by it; two concurrent traces use two independent contexts and
//! never share state. The traced set only ever grows for the
//! lifetime of the context.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::error::TraceError;
use crate::plugin::{BuildPlugin, PluginCapabilities};
use crate::resolver::{make_module_map, ModuleMap};

/// Lifecycle state of a module record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    Requested,
    Reading,
    Extracting,
    Shimming,
    Passthrough,
    QueuingChildren,
    Resolved,
    Failed(String),
}

/// Everything known about one canonical module id within a trace.
#[derive(Debug)]
pub struct ModuleRecord {
    /// Canonical id.
    pub id: String,
    /// The resolved reference this record was created from.
    pub map: ModuleMap,
    /// Backing file location; absent for plugin-virtual resources.
    pub path: Option<PathBuf>,
    /// Contents after the pre-parse transform.
    pub raw_contents: Option<String>,
    /// Contents after the write transform pipeline.
    pub transformed_contents: Option<String>,
    /// Declared dependency ids in source order.
    pub dependency_ids: Vec<String>,
    /// Parameter names, same length and order as `dependency_ids`.
    pub params: Vec<String>,
    /// Whether shim config supplied this record's dependencies.
    pub is_shimmed: bool,
    /// Whether the module uses CommonJS conventions.
    pub is_cjs: bool,
    /// Whether this record is a plugin-supplied resource.
    pub is_plugin_resource: bool,
    /// Current lifecycle state.
    pub state: ModuleState,
}

impl ModuleRecord {
    pub(crate) fn new(map: ModuleMap) -> Self {
        ModuleRecord {
            id: map.id.clone(),
            map,
            path: None,
            raw_contents: None,
            transformed_contents: None,
            dependency_ids: Vec::new(),
            params: Vec::new(),
            is_shimmed: false,
            is_cjs: false,
            is_plugin_resource: false,
            state: ModuleState::Requested,
        }
    }
}

/// One entry of a trace result: the serializable module shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedModule {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// A previously computed layer used to skip redundant re-resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceCache {
    pub traced: Vec<TracedModule>,
}

/// Trace-scoped registry of module records, plugins and the build
/// layer under construction.
pub struct Context {
    /// The resolved loader config for this trace.
    pub config: ResolvedConfig,
    registry: IndexMap<String, ModuleRecord>,
    plugins: IndexMap<String, PluginCapabilities>,
    plugin_impls: HashMap<String, Arc<dyn BuildPlugin>>,
    traced: IndexSet<String>,
    in_progress: IndexSet<String>,
    layer: Vec<String>,
    /// Non-fatal diagnostics accumulated during the trace.
    pub warnings: Vec<String>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("plugins", &self.plugins)
            .field(
                "plugin_impls",
                &self.plugin_impls.keys().collect::<Vec<_>>(),
            )
            .field("traced", &self.traced)
            .field("in_progress", &self.in_progress)
            .field("layer", &self.layer)
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl Context {
    /// Create a fresh context for one trace.
    pub fn new(config: ResolvedConfig) -> Self {
        Context {
            config,
            registry: IndexMap::new(),
            plugins: IndexMap::new(),
            plugin_impls: HashMap::new(),
            traced: IndexSet::new(),
            in_progress: IndexSet::new(),
            layer: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolve a raw reference against a parent using this context's
    /// config.
    pub fn make_module_map(
        &self,
        raw: &str,
        parent: Option<&str>,
    ) -> Result<ModuleMap, TraceError> {
        make_module_map(raw, parent, &self.config)
    }

    /// Look up a record by canonical id.
    pub fn record(&self, id: &str) -> Option<&ModuleRecord> {
        self.registry.get(id)
    }

    pub(crate) fn record_mut(&mut self, id: &str) -> Option<&mut ModuleRecord> {
        self.registry.get_mut(id)
    }

    pub(crate) fn insert_record(&mut self, record: ModuleRecord) {
        self.registry.insert(record.id.clone(), record);
    }

    /// Whether an id has been fully resolved.
    pub fn is_traced(&self, id: &str) -> bool {
        self.traced.contains(id)
    }

    /// Whether an id is currently being resolved (cycle guard).
    pub fn is_in_progress(&self, id: &str) -> bool {
        self.in_progress.contains(id)
    }

    pub(crate) fn enter(&mut self, id: &str) {
        self.in_progress.insert(id.to_string());
    }

    /// Mark an id resolved and append it to the layer. Appends at
    /// most once per id.
    pub(crate) fn resolve(&mut self, id: &str) {
        self.in_progress.remove(id);
        if self.traced.insert(id.to_string()) {
            self.layer.push(id.to_string());
        }
    }

    /// The ordered, deduplicated build layer so far.
    pub fn build_layer(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.layer
            .iter()
            .filter_map(move |id| self.registry.get(id))
    }

    /// Ids of the build layer in dependency order.
    pub fn layer_ids(&self) -> &[String] {
        &self.layer
    }

    /// Register a plugin id in the plugin registry.
    pub fn register_plugin(&mut self, id: &str, capabilities: PluginCapabilities) {
        self.plugins.entry(id.to_string()).or_insert(capabilities);
    }

    /// Register a plugin implementation for an id.
    pub fn register_plugin_impl(&mut self, id: &str, plugin: Arc<dyn BuildPlugin>) {
        self.plugins.insert(id.to_string(), plugin.capabilities());
        self.plugin_impls.insert(id.to_string(), plugin);
    }

    /// Whether an id was identified as a plugin implementation.
    pub fn is_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// The registered implementation for a plugin id, if any.
    pub fn plugin_impl(&self, id: &str) -> Option<&Arc<dyn BuildPlugin>> {
        self.plugin_impls.get(id)
    }

    /// Seed this context from a prior trace. Every cached id is
    /// marked traced and pre-appended to the layer in cached order,
    /// so a complete cache re-traces with zero collaborator calls.
    pub fn seed_cache(&mut self, cache: &TraceCache) -> Result<(), TraceError> {
        for entry in &cache.traced {
            let map = if entry.id.contains('!') {
                self.make_module_map(&entry.id, None)?
            } else {
                ModuleMap {
                    id: entry.id.clone(),
                    name: entry.id.clone(),
                    prefix: None,
                }
            };
            let mut record = ModuleRecord::new(map);
            record.path = entry.path.clone();
            record.raw_contents = entry.contents.clone();
            record.state = ModuleState::Resolved;
            if let Some(prefix) = record.map.prefix.clone() {
                self.register_plugin(&prefix, Default::default());
            }
            self.insert_record(record);
            self.resolve(&entry.id);
        }
        Ok(())
    }

    /// Release retained resources. Idempotent; never fails.
    pub fn release(&mut self) {
        self.registry.clear();
        self.plugin_impls.clear();
        self.plugins.clear();
        self.in_progress.clear();
        self.layer.clear();
    }
}
