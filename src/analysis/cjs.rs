//! CommonJS-style dependency scanning.
//!
//! Collects every `require(<string literal>)` call in source order,
//! first occurrence wins. Non-literal arguments are skipped, or
//! reported when a strict scan was requested.

use swc_ecma_ast::{CallExpr, Callee, Expr, Lit, MemberProp, Script};
use swc_ecma_visit::{Visit, VisitWith};

/// Outcome of a scan for `require()` calls.
#[derive(Debug, Default)]
pub struct RequireScan {
    /// Literal dependency ids in first-occurrence order.
    pub ids: Vec<String>,
    /// Whether a call with a non-literal argument was seen.
    pub non_literal: bool,
}

struct RequireCollector {
    scan: RequireScan,
}

impl Visit for RequireCollector {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if is_require_callee(n) && n.args.len() == 1 {
            let arg = &n.args[0];
            if arg.spread.is_none() {
                match &*arg.expr {
                    Expr::Lit(Lit::Str(s)) => {
                        let id = s.value.to_string();
                        if !self.scan.ids.contains(&id) {
                            self.scan.ids.push(id);
                        }
                    }
                    _ => self.scan.non_literal = true,
                }
            }
        }
        n.visit_children_with(self);
    }
}

fn is_require_callee(call: &CallExpr) -> bool {
    if let Callee::Expr(expr) = &call.callee {
        if let Expr::Ident(ident) = &**expr {
            return &*ident.sym == "require";
        }
    }
    false
}

/// Scan an entire script for `require()` literals.
pub fn scan_script(script: &Script) -> RequireScan {
    let mut collector = RequireCollector {
        scan: Default::default(),
    };
    script.visit_with(&mut collector);
    collector.scan
}

/// Scan a single expression, typically a factory function body.
pub fn scan_expr(expr: &Expr) -> RequireScan {
    let mut collector = RequireCollector {
        scan: Default::default(),
    };
    expr.visit_with(&mut collector);
    collector.scan
}

/// CommonJS conventions referenced by a module body.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonJsProps {
    pub require: bool,
    pub exports: bool,
    pub module_exports: bool,
    pub dirname: bool,
    pub filename: bool,
}

impl CommonJsProps {
    /// True when any CommonJS convention was referenced.
    pub fn any(&self) -> bool {
        self.require
            || self.exports
            || self.module_exports
            || self.dirname
            || self.filename
    }
}

struct CommonJsProbe {
    props: CommonJsProps,
}

impl Visit for CommonJsProbe {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if is_require_callee(n) && n.args.len() == 1 {
            if let Expr::Lit(Lit::Str(_)) = &*n.args[0].expr {
                self.props.require = true;
            }
        }
        n.visit_children_with(self);
    }

    fn visit_member_expr(&mut self, n: &swc_ecma_ast::MemberExpr) {
        if let Expr::Ident(obj) = &*n.obj {
            match &*obj.sym {
                "exports" => self.props.exports = true,
                "module" => {
                    if let MemberProp::Ident(prop) = &n.prop {
                        if &*prop.sym == "exports" {
                            self.props.module_exports = true;
                        }
                    }
                }
                _ => {}
            }
        }
        n.visit_children_with(self);
    }

    fn visit_ident(&mut self, n: &swc_ecma_ast::Ident) {
        match &*n.sym {
            "__dirname" => self.props.dirname = true,
            "__filename" => self.props.filename = true,
            _ => {}
        }
    }
}

/// Probe a script for CommonJS usage without collecting dependencies.
pub fn uses_commonjs(script: &Script) -> CommonJsProps {
    let mut probe = CommonJsProbe {
        props: Default::default(),
    };
    script.visit_with(&mut probe);
    probe.props
}
