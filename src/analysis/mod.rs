//! Static dependency extraction for AMD and CommonJS style modules.
//!
//! The extractor never executes module code: it walks the parsed
//! script for `define` / `require` declaration shapes and collects the
//! declared dependency ids together with the formal parameter names
//! they are bound to, preserving source declaration order. Dedup of
//! ids across modules happens later, at the engine level.

pub mod amd;
pub mod cjs;
pub mod walk;

use swc_ecma_ast::{Expr, Lit, Script};

use crate::error::TraceError;
use crate::swc_utils::parse_script;

pub use cjs::{uses_commonjs, CommonJsProps};
pub use walk::{traverse, Walk};

/// Pseudo dependency ids supplied by the loader itself, never traced.
pub const PSEUDO_IDS: [&str; 3] = ["require", "exports", "module"];

/// One declared dependency and the parameter name bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The declared id, unnormalized; may be relative or plugin-prefixed.
    pub id: String,
    /// Formal parameter name, synthesized when the source gave none.
    pub param: String,
}

/// Dependency ids and parameter names as parallel ordered lists.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DependencyList {
    pub modules: Vec<String>,
    pub params: Vec<String>,
}

impl From<Vec<Dependency>> for DependencyList {
    fn from(deps: Vec<Dependency>) -> Self {
        let mut list = DependencyList::default();
        for dep in deps {
            list.modules.push(dep.id);
            list.params.push(dep.param);
        }
        list
    }
}

/// Options controlling a dependency scan.
#[derive(Debug, Clone, Copy)]
pub struct FindOptions {
    /// Also collect `require('...')` calls nested inside factory
    /// bodies of modules that declared a dependency array.
    pub nested: bool,
    /// Treat non-literal `require()` arguments as errors instead of
    /// skipping them.
    pub strict: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions {
            nested: true,
            strict: false,
        }
    }
}

/// Everything the engine needs to know about one module's source.
#[derive(Debug, Default)]
pub struct ModuleInfo {
    /// Declared dependencies in source order, deduplicated by first
    /// occurrence.
    pub deps: Vec<Dependency>,
    /// Name from the first string-named `define`, if any.
    pub named_define: Option<String>,
    /// Whether any AMD-style declaration call was found.
    pub has_amd: bool,
    /// Whether the module uses CommonJS conventions (bare CommonJS
    /// source or the CommonJS-sugar factory form).
    pub is_cjs: bool,
}

/// Analyze a parsed module for its declared dependencies.
pub fn analyze(
    id: &str,
    script: &Script,
    options: FindOptions,
) -> Result<ModuleInfo, TraceError> {
    let mut info = ModuleInfo::default();
    let mut failure: Option<TraceError> = None;
    let mut factory_scans: Vec<cjs::RequireScan> = Vec::new();

    traverse(script, |expr| {
        let call = match expr {
            Expr::Call(call) => call,
            _ => return Walk::Continue,
        };
        let kind = match amd::callee_kind(call) {
            Some(kind) => kind,
            None => return Walk::Continue,
        };
        let decl = match amd::classify(call, kind) {
            Some(decl) => decl,
            // require('id'): picked up by the CommonJS scan.
            None => return Walk::Continue,
        };

        info.has_amd = true;
        if kind == amd::CalleeKind::Define
            && info.named_define.is_none()
            && decl.name.is_some()
        {
            info.named_define = decl.name.clone();
        }

        let params = decl
            .factory
            .as_ref()
            .map(|f| f.params())
            .unwrap_or_default();

        if let Some(array) = decl.deps {
            for (i, elem) in array.elems.iter().enumerate() {
                let dep_id = match elem {
                    Some(elem) if elem.spread.is_none() => match &*elem.expr {
                        Expr::Lit(Lit::Str(s)) => s.value.to_string(),
                        _ => {
                            failure = Some(TraceError::UnsupportedDependency {
                                id: id.to_string(),
                            });
                            return Walk::Stop;
                        }
                    },
                    _ => {
                        failure = Some(TraceError::UnsupportedDependency {
                            id: id.to_string(),
                        });
                        return Walk::Stop;
                    }
                };
                let param = params
                    .get(i)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| synthesize_param(&dep_id));
                push_dep(&mut info.deps, dep_id, param);
            }
        } else if decl.name.is_none() || decl.factory.is_some() {
            // Factory without a dependency array: the CommonJS-sugar
            // convention maps the parameters onto the pseudo ids and
            // the body is scanned for require() literals.
            for (i, param) in params.iter().take(PSEUDO_IDS.len()).enumerate() {
                let dep_id = PSEUDO_IDS[i].to_string();
                let param = param
                    .clone()
                    .unwrap_or_else(|| synthesize_param(&dep_id));
                push_dep(&mut info.deps, dep_id, param);
            }
            if decl.factory.is_some() {
                info.is_cjs = true;
                factory_scans.push(scan_call_factory(call));
            }
        }
        Walk::Continue
    });

    if let Some(err) = failure {
        return Err(err);
    }

    if info.has_amd {
        for scan in &factory_scans {
            if scan.non_literal && options.strict {
                return Err(TraceError::UnsupportedDependency {
                    id: id.to_string(),
                });
            }
            for dep_id in &scan.ids {
                let param = synthesize_param(dep_id);
                push_dep(&mut info.deps, dep_id.clone(), param);
            }
        }
        if options.nested {
            let scan = cjs::scan_script(script);
            if scan.non_literal && options.strict {
                return Err(TraceError::UnsupportedDependency {
                    id: id.to_string(),
                });
            }
            for dep_id in &scan.ids {
                let param = synthesize_param(dep_id);
                push_dep(&mut info.deps, dep_id.clone(), param);
            }
        }
    } else {
        // No AMD declaration at all: fall through to a plain
        // CommonJS scan of the whole module body.
        let scan = cjs::scan_script(script);
        if scan.non_literal && options.strict {
            return Err(TraceError::UnsupportedDependency {
                id: id.to_string(),
            });
        }
        info.is_cjs = uses_commonjs(script).any();
        if !scan.ids.is_empty() {
            push_dep(&mut info.deps, "require".to_string(), "require".to_string());
            for dep_id in &scan.ids {
                let param = synthesize_param(dep_id);
                push_dep(&mut info.deps, dep_id.clone(), param);
            }
        }
    }

    Ok(info)
}

fn scan_call_factory(call: &swc_ecma_ast::CallExpr) -> cjs::RequireScan {
    for arg in &call.args {
        match &*arg.expr {
            Expr::Fn(_) | Expr::Arrow(_) => return cjs::scan_expr(&arg.expr),
            _ => {}
        }
    }
    Default::default()
}

fn push_dep(deps: &mut Vec<Dependency>, id: String, param: String) {
    if !deps.iter().any(|d| d.id == id) {
        deps.push(Dependency { id, param });
    }
}

/// Find the dependencies of AMD-style module source, falling through
/// to the CommonJS scan for sugar and bare CommonJS modules.
pub fn find_dependencies(id: &str, contents: &str) -> Result<DependencyList, TraceError> {
    let parsed = parse_script(id, contents)?;
    let info = analyze(id, &parsed.script, Default::default())?;
    Ok(info.deps.into())
}

/// Find only CommonJS dependencies, the `require('...')` form.
pub fn find_cjs_dependencies(
    id: &str,
    contents: &str,
) -> Result<DependencyList, TraceError> {
    let parsed = parse_script(id, contents)?;
    let scan = cjs::scan_script(&parsed.script);
    let deps: Vec<Dependency> = scan
        .ids
        .into_iter()
        .map(|dep_id| {
            let param = synthesize_param(&dep_id);
            Dependency { id: dep_id, param }
        })
        .collect();
    Ok(deps.into())
}

/// Name of the first string-named `define` call, if any.
pub fn named_define(script: &Script) -> Option<String> {
    let mut name = None;
    traverse(script, |expr| {
        if let Expr::Call(call) = expr {
            if amd::callee_kind(call) == Some(amd::CalleeKind::Define) {
                if let Some(decl) = amd::classify(call, amd::CalleeKind::Define) {
                    if decl.name.is_some() {
                        name = decl.name;
                        return Walk::Stop;
                    }
                }
            }
        }
        Walk::Continue
    });
    name
}

/// Whether the script contains any AMD-style declaration call.
pub fn uses_amd(script: &Script) -> bool {
    let mut found = false;
    traverse(script, |expr| {
        if let Expr::Call(call) = expr {
            if amd::callee_kind(call).is_some() {
                found = true;
                return Walk::Stop;
            }
        }
        Walk::Continue
    });
    found
}

/// Synthesize a parameter name from a dependency id: the final path
/// segment of the resource part, relative markers stripped, reduced
/// to identifier characters.
pub fn synthesize_param(dep_id: &str) -> String {
    let resource = dep_id.rsplit('!').next().unwrap_or(dep_id);
    let segment = resource.rsplit('/').next().unwrap_or(resource);
    let mut param: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if param.is_empty() || param.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        param.insert(0, '_');
    }
    param
}
