//! Loader configuration: the resolution rules a trace runs under.
//!
//! Mirrors the runtime loader's config shape (`baseUrl`, `paths`,
//! `packages`, `map`, `shim`) and derives the package-main lookup
//! tables the resolver and transforms need. Validation is eager; a
//! malformed config fails before any resolution begins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use swc_ecma_ast::{
    Callee, Decl, Expr, Lit, MemberProp, Pat, Prop, PropName, PropOrSpread,
    Stmt, UnaryOp,
};

use crate::analysis::{traverse, Walk};
use crate::error::TraceError;
use crate::swc_utils::parse_script;

/// Shim declaration for a module without its own declaration header.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShimConfig {
    /// Synthetic dependency list, traced before the shimmed module.
    #[serde(default)]
    pub deps: Vec<String>,
    /// Global accessor whose value becomes the module's export.
    #[serde(default)]
    pub exports: Option<String>,
}

/// A package declaration: either a bare name or a full record.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PackageConfig {
    Name(String),
    Full {
        name: String,
        #[serde(default = "default_main")]
        main: String,
        #[serde(default)]
        location: Option<String>,
    },
}

fn default_main() -> String {
    "main".to_string()
}

/// Raw loader configuration, deserializable from the JSON shape a
/// `require.config()` call carries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Base location module locations resolve against.
    pub base_url: Option<String>,
    /// Id prefix to alternate location substitutions.
    pub paths: IndexMap<String, String>,
    /// Package declarations.
    pub packages: Vec<PackageConfig>,
    /// Id mappings; the `"*"` scope applies to every parent.
    pub map: IndexMap<String, IndexMap<String, String>>,
    /// Shim declarations for legacy scripts.
    pub shim: IndexMap<String, ShimConfig>,
    /// Wrap shimmed modules in an IIFE instead of appending a define.
    pub wrap_shim: bool,
    /// Skip synthesized define insertion in the transform pipeline.
    pub skip_module_insertion: bool,
}

impl LoaderConfig {
    /// Deserialize a config from extracted plain data.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TraceError> {
        serde_json::from_value(value)
            .map_err(|e| TraceError::config(e.to_string()))
    }

    /// Validate the config and derive the package lookup tables.
    pub fn resolve(self) -> Result<ResolvedConfig, TraceError> {
        let mut pkgs = IndexMap::new();
        let mut pkgs_main = IndexMap::new();
        let mut pkg_locations = IndexMap::new();

        for pkg in &self.packages {
            let (name, main, location) = match pkg {
                PackageConfig::Name(name) => (name.as_str(), "main", None),
                PackageConfig::Full {
                    name,
                    main,
                    location,
                } => (name.as_str(), main.as_str(), location.as_deref()),
            };
            if name.is_empty() {
                return Err(TraceError::config("package name must not be empty"));
            }
            let main = main
                .trim_start_matches("./")
                .trim_end_matches(".js");
            if main.is_empty() {
                return Err(TraceError::config(format!(
                    "package {} has an empty main module",
                    name
                )));
            }
            let main_id = format!("{}/{}", name, main);
            pkgs.insert(name.to_string(), main_id.clone());
            pkgs_main.insert(main_id, name.to_string());
            if let Some(location) = location {
                if location.is_empty() {
                    return Err(TraceError::config(format!(
                        "package {} has an empty location",
                        name
                    )));
                }
                pkg_locations
                    .insert(name.to_string(), trim_slash(location));
            }
        }

        for (prefix, location) in &self.paths {
            if prefix.is_empty() || location.is_empty() {
                return Err(TraceError::config(
                    "paths entries must not be empty",
                ));
            }
        }
        for (scope, entries) in &self.map {
            for (source, target) in entries {
                if source.is_empty() || target.is_empty() {
                    return Err(TraceError::config(format!(
                        "map scope {} has an empty entry",
                        scope
                    )));
                }
            }
        }
        for (id, shim) in &self.shim {
            if id.is_empty() || shim.deps.iter().any(|d| d.is_empty()) {
                return Err(TraceError::config(
                    "shim entries must not be empty",
                ));
            }
        }

        let paths = self
            .paths
            .iter()
            .map(|(k, v)| (k.clone(), trim_slash(v)))
            .collect();

        Ok(ResolvedConfig {
            base_url: self.base_url.as_deref().map(trim_slash),
            paths,
            map: self.map,
            shim: self.shim,
            wrap_shim: self.wrap_shim,
            skip_module_insertion: self.skip_module_insertion,
            pkgs,
            pkgs_main,
            pkg_locations,
        })
    }
}

fn trim_slash(s: &str) -> String {
    s.trim_end_matches('/').to_string()
}

/// A validated config with derived lookup tables, owned by one trace
/// context.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub base_url: Option<String>,
    pub paths: IndexMap<String, String>,
    pub map: IndexMap<String, IndexMap<String, String>>,
    pub shim: IndexMap<String, ShimConfig>,
    pub wrap_shim: bool,
    pub skip_module_insertion: bool,
    /// Package name to package main module id.
    pub pkgs: IndexMap<String, String>,
    /// Reverse lookup: main module id to package name.
    pub pkgs_main: IndexMap<String, String>,
    /// Package name to declared location.
    pub pkg_locations: IndexMap<String, String>,
}

/// Statically extract the configuration object from source believed
/// to contain a `require.config({...})` style call.
///
/// Handles `require.config(...)`, `requirejs.config(...)`, the
/// object-first `require({...}, [...])` form and a top level
/// `var require = {...}` declaration. The object literal must be
/// self-contained; any value depending on an outside binding fails
/// with a config error.
pub fn find_config(contents: &str) -> Result<serde_json::Value, TraceError> {
    let parsed = parse_script("config", contents)?;

    // var require = {...} at the top level.
    for stmt in &parsed.script.body {
        if let Stmt::Decl(Decl::Var(var)) = stmt {
            for decl in &var.decls {
                if let Pat::Ident(binding) = &decl.name {
                    let sym = &*binding.id.sym;
                    if sym == "require" || sym == "requirejs" {
                        if let Some(init) = &decl.init {
                            if let Expr::Object(_) = &**init {
                                return eval_literal(init);
                            }
                        }
                    }
                }
            }
        }
    }

    let mut found: Option<Result<serde_json::Value, TraceError>> = None;
    traverse(&parsed.script, |expr| {
        let call = match expr {
            Expr::Call(call) => call,
            _ => return Walk::Continue,
        };
        if !is_config_callee(&call.callee) {
            return Walk::Continue;
        }
        if let Some(arg) = call.args.first() {
            if arg.spread.is_none() {
                if let Expr::Object(_) = &*arg.expr {
                    found = Some(eval_literal(&arg.expr));
                    return Walk::Stop;
                }
            }
        }
        Walk::Continue
    });

    found.unwrap_or_else(|| {
        Err(TraceError::config("no loader config call found"))
    })
}

fn is_config_callee(callee: &Callee) -> bool {
    let expr = match callee {
        Callee::Expr(expr) => &**expr,
        _ => return false,
    };
    match expr {
        Expr::Ident(ident) => {
            matches!(&*ident.sym, "require" | "requirejs")
        }
        Expr::Member(member) => {
            let obj = match &*member.obj {
                Expr::Ident(ident) => &*ident.sym,
                _ => return false,
            };
            let prop = match &member.prop {
                MemberProp::Ident(ident) => &*ident.sym,
                _ => return false,
            };
            matches!(obj, "require" | "requirejs") && prop == "config"
        }
        _ => false,
    }
}

/// Evaluate a literal expression to plain data.
fn eval_literal(expr: &Expr) -> Result<serde_json::Value, TraceError> {
    use serde_json::Value;

    match expr {
        Expr::Lit(Lit::Str(s)) => Ok(Value::String(s.value.to_string())),
        Expr::Lit(Lit::Bool(b)) => Ok(Value::Bool(b.value)),
        Expr::Lit(Lit::Null(_)) => Ok(Value::Null),
        Expr::Lit(Lit::Num(n)) => Ok(number_value(n.value)),
        Expr::Unary(unary) if unary.op == UnaryOp::Minus => {
            if let Expr::Lit(Lit::Num(n)) = &*unary.arg {
                Ok(number_value(-n.value))
            } else {
                Err(non_literal())
            }
        }
        Expr::Array(array) => {
            let mut items = Vec::with_capacity(array.elems.len());
            for elem in &array.elems {
                match elem {
                    Some(elem) if elem.spread.is_none() => {
                        items.push(eval_literal(&elem.expr)?);
                    }
                    _ => return Err(non_literal()),
                }
            }
            Ok(Value::Array(items))
        }
        Expr::Object(object) => {
            let mut entries = serde_json::Map::new();
            for prop in &object.props {
                let kv = match prop {
                    PropOrSpread::Prop(prop) => match &**prop {
                        Prop::KeyValue(kv) => kv,
                        _ => return Err(non_literal()),
                    },
                    PropOrSpread::Spread(_) => return Err(non_literal()),
                };
                let key = match &kv.key {
                    PropName::Ident(ident) => ident.sym.to_string(),
                    PropName::Str(s) => s.value.to_string(),
                    _ => return Err(non_literal()),
                };
                entries.insert(key, eval_literal(&kv.value)?);
            }
            Ok(Value::Object(entries))
        }
        Expr::Paren(paren) => eval_literal(&paren.expr),
        _ => Err(non_literal()),
    }
}

fn number_value(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn non_literal() -> TraceError {
    TraceError::config(
        "config cannot be statically evaluated; it depends on values \
         that are not literals",
    )
}
