//! Canonical module id resolution.
//!
//! Turns a raw textual module reference plus its declaring parent into
//! a canonical [`ModuleMap`], honoring plugin prefixes, `map` entries,
//! relative ids and package mains. Location derivation (`paths`
//! substitution against the base location) is a separate step so that
//! canonical ids stay stable for dedup and cache identity.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::error::TraceError;

/// A canonical module reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleMap {
    /// Full canonical id, including the plugin prefix when present.
    pub id: String,
    /// The resource part: the id without any plugin prefix.
    pub name: String,
    /// Resolved plugin module id for `prefix!resource` references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Resolve a raw reference against its declaring parent.
///
/// Rule order is deterministic: plugin prefix split (the prefix is
/// itself resolved recursively), `map` application, relative
/// resolution, package main rewrite.
pub fn make_module_map(
    raw: &str,
    parent: Option<&str>,
    config: &ResolvedConfig,
) -> Result<ModuleMap, TraceError> {
    if raw.is_empty() {
        return Err(TraceError::config("module id must not be empty"));
    }

    if let Some(split) = raw.find('!') {
        let (prefix_raw, name_raw) = (&raw[..split], &raw[split + 1..]);
        let prefix = make_module_map(prefix_raw, parent, config)?;
        // The resource name only gets relative resolution; mapping a
        // plugin resource through `map` or package mains would bind
        // loader config to plugin-private naming.
        let name = if name_raw.starts_with("./") || name_raw.starts_with("../") {
            resolve_relative(name_raw, parent)?
        } else {
            name_raw.to_string()
        };
        let id = format!("{}!{}", prefix.id, name);
        return Ok(ModuleMap {
            id,
            name,
            prefix: Some(prefix.id),
        });
    }

    let mapped = apply_map(raw, parent, config);
    let mut id = resolve_relative(&mapped, parent)?;

    if let Some(main) = config.pkgs.get(&id) {
        id = main.clone();
    }

    Ok(ModuleMap {
        name: id.clone(),
        id,
        prefix: None,
    })
}

/// Apply `map` config: contextual scopes (longest parent segment
/// prefix first) take precedence over the global `*` scope; within a
/// scope the longest source segment prefix wins.
fn apply_map(id: &str, parent: Option<&str>, config: &ResolvedConfig) -> String {
    let mut scopes: Vec<&str> = Vec::new();
    if let Some(parent) = parent {
        let mut contextual: Vec<&str> = config
            .map
            .keys()
            .map(|k| k.as_str())
            .filter(|k| *k != "*" && segment_prefix(parent, k))
            .collect();
        contextual.sort_by_key(|k| std::cmp::Reverse(k.len()));
        scopes.extend(contextual);
    }
    if config.map.contains_key("*") {
        scopes.push("*");
    }

    for scope in scopes {
        let entries = &config.map[scope];
        let mut best: Option<(&str, &str)> = None;
        for (source, target) in entries.iter() {
            if segment_prefix(id, source)
                && best.map_or(true, |(b, _)| source.len() > b.len())
            {
                best = Some((source, target));
            }
        }
        if let Some((source, target)) = best {
            return format!("{}{}", target, &id[source.len()..]);
        }
    }
    id.to_string()
}

/// Whether `prefix` matches `id` on a segment boundary.
fn segment_prefix(id: &str, prefix: &str) -> bool {
    id == prefix
        || (id.starts_with(prefix)
            && id.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Resolve `./` and `../` against the parent id's directory, else
/// against the base location.
fn resolve_relative(id: &str, parent: Option<&str>) -> Result<String, TraceError> {
    if !id.starts_with("./") && !id.starts_with("../") {
        return normalize_id(id);
    }
    let base = parent
        .and_then(|p| p.rsplit_once('/').map(|(dir, _)| dir))
        .unwrap_or("");
    let joined = if base.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", base, id)
    };
    normalize_id(&joined)
}

/// Collapse `.` and `..` segments. Leading `..` segments that escape
/// the base location are preserved. An empty path segment is a
/// malformed id.
fn normalize_id(id: &str) -> Result<String, TraceError> {
    let mut out: Vec<&str> = Vec::new();
    for segment in id.split('/') {
        match segment {
            "" => {
                return Err(TraceError::config(format!(
                    "malformed module id: {}",
                    id
                )))
            }
            "." => {}
            ".." => {
                if matches!(out.last(), Some(&"..")) || out.is_empty() {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return Err(TraceError::config(format!("malformed module id: {}", id)));
    }
    Ok(out.join("/"))
}

/// Derive the filesystem location for a resource name.
///
/// Longest segment-prefix substitution from `paths` applies first,
/// then package locations, then the base location. `ext` is appended
/// verbatim; pass an empty string for bare plugin resource probes.
pub fn name_to_path(config: &ResolvedConfig, name: &str, ext: &str) -> PathBuf {
    let mut located: Option<String> = None;

    let mut best: Option<&str> = None;
    for prefix in config.paths.keys() {
        if segment_prefix(name, prefix)
            && best.map_or(true, |b| prefix.len() > b.len())
        {
            best = Some(prefix);
        }
    }
    if let Some(prefix) = best {
        located = Some(format!("{}{}", config.paths[prefix], &name[prefix.len()..]));
    }

    if located.is_none() {
        for (pkg, location) in config.pkg_locations.iter() {
            if segment_prefix(name, pkg) {
                located =
                    Some(format!("{}{}", location, &name[pkg.len()..]));
                break;
            }
        }
    }

    let mut path = located.unwrap_or_else(|| name.to_string());
    path.push_str(ext);

    let full = match &config.base_url {
        Some(base) if !path.starts_with('/') => format!("{}/{}", base, path),
        _ => path,
    };
    PathBuf::from(normalize_path(&full))
}

/// Lexically collapse `.` and `..` segments of a relative location.
fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(&"..")) || out.is_empty() {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Candidate locations for a plugin resource, in probe order: the
/// resource with its original extension, the bare resource, then the
/// resource with the plugin id as extension.
pub fn plugin_resource_candidates(
    config: &ResolvedConfig,
    map: &ModuleMap,
) -> Vec<PathBuf> {
    let prefix = match &map.prefix {
        Some(prefix) => prefix,
        None => return Vec::new(),
    };
    let mut candidates = Vec::new();
    if let Some(dot) = map.name.rfind('.') {
        let (stem, ext) = map.name.split_at(dot);
        if !stem.is_empty() {
            candidates.push(name_to_path(config, stem, ext));
        }
    }
    candidates.push(name_to_path(config, &map.name, ""));
    candidates.push(name_to_path(
        config,
        &format!("{}.{}", map.name, prefix),
        "",
    ));
    candidates
}
