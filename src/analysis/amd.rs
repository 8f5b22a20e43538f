//! Classification of AMD-style module declaration calls.
//!
//! A module declaration is a call to `define`, `require` or
//! `requirejs` whose literal arguments decide its shape: name only,
//! dependency array only, name plus array, or factory only. Dynamic
//! dependency arrays are not statically traceable and are reported
//! as errors by the callers of [`classify`].

use swc_ecma_ast::{ArrayLit, ArrowExpr, CallExpr, Callee, Expr, Function, Lit, Pat};

/// Which loader entry point a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    /// A `define(...)` declaration.
    Define,
    /// A `require(...)` / `requirejs(...)` application call.
    Require,
}

/// The factory argument of a declaration, when one was given inline.
pub enum FactoryExpr<'a> {
    Fn(&'a Function),
    Arrow(&'a ArrowExpr),
}

impl<'a> FactoryExpr<'a> {
    /// Formal parameter names in declaration order. Parameters bound
    /// by destructuring have no usable name and yield `None`.
    pub fn params(&self) -> Vec<Option<String>> {
        match self {
            FactoryExpr::Fn(f) => f
                .params
                .iter()
                .map(|p| ident_name(&p.pat))
                .collect(),
            FactoryExpr::Arrow(a) => {
                a.params.iter().map(ident_name).collect()
            }
        }
    }
}

fn ident_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(binding) => Some(binding.id.sym.to_string()),
        _ => None,
    }
}

/// A classified declaration call.
pub struct Declaration<'a> {
    /// Name from a string-literal first argument.
    pub name: Option<String>,
    /// The literal dependency array, when present.
    pub deps: Option<&'a ArrayLit>,
    /// The factory function, when given inline.
    pub factory: Option<FactoryExpr<'a>>,
}

/// Identify `define` / `require` / `requirejs` calls by their callee.
///
/// Member calls such as `require.config(...)` are not declarations
/// and return `None`.
pub fn callee_kind(call: &CallExpr) -> Option<CalleeKind> {
    if let Callee::Expr(expr) = &call.callee {
        if let Expr::Ident(ident) = &**expr {
            return match &*ident.sym {
                "define" => Some(CalleeKind::Define),
                "require" | "requirejs" => Some(CalleeKind::Require),
                _ => None,
            };
        }
    }
    None
}

/// Classify the arguments of a declaration call.
///
/// Returns `None` for shapes that carry no static module information:
/// calls without arguments, and `require('id')` (the CommonJS form,
/// handled by the CJS scan). A lone string argument to `define` is
/// the name-only shape and does declare the module.
pub fn classify(call: &CallExpr, kind: CalleeKind) -> Option<Declaration<'_>> {
    let args: Vec<&Expr> = call
        .args
        .iter()
        .filter(|a| a.spread.is_none())
        .map(|a| unwrap_parens(&a.expr))
        .collect();

    let first = match args.first() {
        Some(first) => *first,
        None => return None,
    };

    let mut decl = Declaration {
        name: None,
        deps: None,
        factory: None,
    };

    let mut rest = &args[1..];
    match first {
        Expr::Lit(Lit::Str(s)) => {
            if args.len() == 1 {
                // require('id') is not a declaration; define('id') is.
                if kind == CalleeKind::Require {
                    return None;
                }
                decl.name = Some(s.value.to_string());
                return Some(decl);
            }
            decl.name = Some(s.value.to_string());
        }
        Expr::Array(arr) => {
            decl.deps = Some(arr);
        }
        Expr::Fn(f) => {
            decl.factory = Some(FactoryExpr::Fn(&*f.function));
            return Some(decl);
        }
        Expr::Arrow(a) => {
            decl.factory = Some(FactoryExpr::Arrow(a));
            return Some(decl);
        }
        Expr::Object(_) => {
            // define({...}) or the require({config}, [deps]) form.
            if let Some(Expr::Array(arr)) = rest.first() {
                decl.deps = Some(arr);
                rest = &rest[1..];
            } else {
                return Some(decl);
            }
        }
        _ => return None,
    }

    for arg in rest {
        match arg {
            Expr::Array(arr) if decl.deps.is_none() => {
                decl.deps = Some(arr);
            }
            Expr::Fn(f) if decl.factory.is_none() => {
                decl.factory = Some(FactoryExpr::Fn(&*f.function));
            }
            Expr::Arrow(a) if decl.factory.is_none() => {
                decl.factory = Some(FactoryExpr::Arrow(a));
            }
            _ => {}
        }
    }

    Some(decl)
}

fn unwrap_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => unwrap_parens(&paren.expr),
        _ => expr,
    }
}
