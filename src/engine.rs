//! The resolution engine: recursive discovery of a build layer.
//!
//! Drives every module id through the per-id state machine
//! `Requested -> Reading -> Extracting -> Shimming|Passthrough ->
//! QueuingChildren -> Resolved`, appending each record to the layer in
//! true post-order. Discovery is single threaded and strictly
//! depth-first in declared dependency order, which makes the output
//! byte-reproducible across runs.

use crate::analysis::{self, FindOptions, PSEUDO_IDS};
use crate::context::{Context, ModuleRecord, ModuleState};
use crate::error::TraceError;
use crate::resolver::{name_to_path, plugin_resource_candidates, ModuleMap};
use crate::swc_utils::parse_script;
use crate::trace::TraceOptions;

pub struct Engine<'a> {
    ctx: &'a mut Context,
    options: &'a TraceOptions,
}

impl<'a> Engine<'a> {
    pub fn new(ctx: &'a mut Context, options: &'a TraceOptions) -> Self {
        Engine { ctx, options }
    }

    /// Trace the entry id, recursively resolving its dependency
    /// graph into the context's build layer.
    pub fn trace_entry(&mut self, id: &str) -> Result<(), TraceError> {
        self.load(id, None)
    }

    fn load(&mut self, raw: &str, parent: Option<&str>) -> Result<(), TraceError> {
        let map = self.ctx.make_module_map(raw, parent)?;
        self.load_resolved(map)
    }

    /// Drive an already-canonical reference through the state
    /// machine. Ids here are never passed back through resolution;
    /// re-applying `map` to a canonical id would remap it twice.
    fn load_resolved(&mut self, map: ModuleMap) -> Result<(), TraceError> {
        let id = map.id.clone();

        if PSEUDO_IDS.contains(&id.as_str()) {
            return Ok(());
        }
        // Already satisfied, or a cycle back into an in-flight id.
        if self.ctx.is_traced(&id) || self.ctx.is_in_progress(&id) {
            return Ok(());
        }

        self.ctx.enter(&id);
        self.ctx.insert_record(ModuleRecord::new(map.clone()));

        // A plugin-prefixed id depends on its plugin module, which
        // goes through this same machine first.
        if let Some(prefix) = map.prefix.clone() {
            self.load_resolved(ModuleMap {
                id: prefix.clone(),
                name: prefix.clone(),
                prefix: None,
            })?;
            let capabilities = self
                .options
                .plugins
                .get(&prefix)
                .map(|p| p.capabilities())
                .unwrap_or_default();
            self.ctx.register_plugin(&prefix, capabilities);
        }

        let dep_ids = match self.read_and_extract(&map, &id) {
            Ok(deps) => deps,
            Err(err) => {
                self.options.logger.error(&err.to_string());
                if let Some(record) = self.ctx.record_mut(&id) {
                    record.state = ModuleState::Failed(err.to_string());
                }
                return Err(err);
            }
        };

        if let Some(record) = self.ctx.record_mut(&id) {
            record.state = ModuleState::QueuingChildren;
        }
        for dep in &dep_ids {
            self.load(dep, Some(&id))?;
        }

        if let Some(record) = self.ctx.record_mut(&id) {
            record.state = ModuleState::Resolved;
        }
        self.ctx.resolve(&id);
        Ok(())
    }

    /// Reading and extraction for one record. Returns the dependency
    /// ids to queue, in declared order.
    fn read_and_extract(
        &mut self,
        map: &ModuleMap,
        id: &str,
    ) -> Result<Vec<String>, TraceError> {
        if let Some(record) = self.ctx.record_mut(id) {
            record.state = ModuleState::Reading;
        }

        if map.prefix.is_some() {
            return self.read_plugin_resource(map, id);
        }

        let path = name_to_path(&self.ctx.config, &map.name, ".js");
        if !self.options.loader.exists(id, &path) {
            return Err(TraceError::NotFound(path));
        }
        let mut contents = self.options.loader.read(id, &path)?;
        if let Some(transform) = &self.options.read_transform {
            contents = transform(id, &path, contents);
        }

        if let Some(record) = self.ctx.record_mut(id) {
            record.state = ModuleState::Extracting;
            record.path = Some(path);
        }

        let parsed = parse_script(id, &contents)?;
        let info = analysis::analyze(
            id,
            &parsed.script,
            FindOptions {
                nested: self.options.find_nested_dependencies,
                strict: self.options.strict_requires,
            },
        )?;

        if let Some(name) = &info.named_define {
            if name != id {
                let msg = format!(
                    "module {} declares mismatched define name {}",
                    id, name
                );
                self.options.logger.warn(&msg);
                self.ctx.warnings.push(msg);
            }
        }

        // Shim merge applies only when extraction found nothing; a
        // module with its own dependencies is never overridden.
        let shim = if info.deps.is_empty() {
            self.ctx.config.shim.get(id).cloned()
        } else {
            None
        };

        let record = match self.ctx.record_mut(id) {
            Some(record) => record,
            None => return Ok(Vec::new()),
        };
        record.raw_contents = Some(contents);
        record.is_cjs = info.is_cjs;

        if let Some(shim) = shim {
            record.state = ModuleState::Shimming;
            record.is_shimmed = true;
            for dep in &shim.deps {
                record.dependency_ids.push(dep.clone());
                record.params.push(analysis::synthesize_param(dep));
            }
        } else {
            record.state = ModuleState::Passthrough;
            for dep in info.deps {
                record.dependency_ids.push(dep.id);
                record.params.push(dep.param);
            }
        }

        Ok(record
            .dependency_ids
            .iter()
            .filter(|dep| !PSEUDO_IDS.contains(&dep.as_str()))
            .cloned()
            .collect())
    }

    /// Locate a plugin resource: probe the candidate paths in order,
    /// then fall back to a plugin-supplied virtual source. A resource
    /// with neither stays id-only, which is not fatal.
    fn read_plugin_resource(
        &mut self,
        map: &ModuleMap,
        id: &str,
    ) -> Result<Vec<String>, TraceError> {
        let mut found = None;
        for candidate in plugin_resource_candidates(&self.ctx.config, map) {
            if self.options.loader.exists(id, &candidate) {
                found = Some(candidate);
                break;
            }
        }

        let mut contents = None;
        if let Some(path) = &found {
            let mut text = self.options.loader.read(id, path)?;
            if let Some(transform) = &self.options.read_transform {
                text = transform(id, path, text);
            }
            contents = Some(text);
        } else if let Some(prefix) = &map.prefix {
            if let Some(plugin) = self.options.plugins.get(prefix) {
                if plugin.capabilities().can_load {
                    contents = plugin.load(&map.name).map_err(|e| {
                        TraceError::Plugin {
                            id: prefix.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                }
            }
        }

        if let Some(record) = self.ctx.record_mut(id) {
            record.is_plugin_resource = true;
            record.path = found;
            record.raw_contents = contents;
            record.state = ModuleState::Passthrough;
        }
        Ok(Vec::new())
    }
}
