//! Pre-order AST traversal with caller-controlled descent.
//!
//! The extractor and the transform stages all need the same primitive:
//! walk an immutable tree, look at each expression, and either keep
//! going, skip the subtree, or stop the whole traversal. The visitor
//! never mutates the tree.
use swc_ecma_ast::{Expr, Script};
use swc_ecma_visit::{Visit, VisitWith};

/// Control signal returned by a traversal callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Descend into this node's children.
    Continue,
    /// Skip this node's children, continue with the next sibling.
    SkipChildren,
    /// Stop the entire traversal.
    Stop,
}

struct ExprWalker<F>
where
    F: FnMut(&Expr) -> Walk,
{
    callback: F,
    stopped: bool,
}

impl<F> Visit for ExprWalker<F>
where
    F: FnMut(&Expr) -> Walk,
{
    fn visit_expr(&mut self, n: &Expr) {
        if self.stopped {
            return;
        }
        match (self.callback)(n) {
            Walk::Continue => n.visit_children_with(self),
            Walk::SkipChildren => {}
            Walk::Stop => self.stopped = true,
        }
    }
}

/// Visit every expression in the script in source order.
///
/// The callback decides, per node, whether children are visited; a
/// `Stop` aborts the remainder of the walk.
pub fn traverse<F>(script: &Script, callback: F)
where
    F: FnMut(&Expr) -> Walk,
{
    let mut walker = ExprWalker {
        callback,
        stopped: false,
    };
    script.visit_with(&mut walker);
}
