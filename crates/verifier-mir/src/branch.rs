//! The *Branch* scope tree (spec.md §4.2): an arena of linear execution
//! segments, parent-referenced by index rather than by owned pointer or
//! `Rc` (spec.md §9's redesign note - avoids the reference-cycle and
//! interior-mutability machinery an owned-parent-pointer tree would need).

use verifier_util::index_vec::{Idx, IndexVec};
use verifier_util::{FxHashMap, Span, Symbol};

use crate::mir::{Assign, Expr, Var};
use crate::MirError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchId(u32);

impl Idx for BranchId {
    fn from_usize(idx: usize) -> Self {
        BranchId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct BranchNode {
    parent: Option<BranchId>,
    /// This branch's own index among its parent's subscopes.
    idx: u32,
    /// The positive (then-branch) or negated (else-branch) test expression;
    /// `None` for the root.
    condition: Option<Expr>,
    variables: FxHashMap<Symbol, Vec<Var>>,
    /// Monotonically increasing, never reset - even after reconciliation,
    /// so a later subscope never reuses a retired branch's index
    /// (spec.md §4.2 "subscope").
    next_subscope: u32,
}

/// One function's (or the module's) independent Branch tree, plus the
/// scope-resolution/reconciliation operations spec.md §4.2 defines on it.
pub struct BranchArena {
    nodes: IndexVec<BranchId, BranchNode>,
    pub root: BranchId,
}

impl BranchArena {
    pub fn new() -> Self {
        let mut nodes = IndexVec::new();
        let root = nodes.push(BranchNode {
            parent: None,
            idx: 0,
            condition: None,
            variables: FxHashMap::default(),
            next_subscope: 0,
        });
        Self { nodes, root }
    }

    pub fn subscope(&mut self, parent: BranchId, condition: Option<Expr>) -> BranchId {
        let idx = self.nodes[parent].next_subscope;
        self.nodes[parent].next_subscope += 1;
        self.nodes.push(BranchNode {
            parent: Some(parent),
            idx,
            condition,
            variables: FxHashMap::default(),
            next_subscope: 0,
        })
    }

    pub fn scope_path(&self, branch: BranchId) -> Vec<u32> {
        let mut path = Vec::new();
        let mut cur = Some(branch);
        while let Some(b) = cur {
            path.push(self.nodes[b].idx);
            cur = self.nodes[b].parent;
        }
        path.reverse();
        path
    }

    /// The branch's path condition: `_condition` values from root to self,
    /// omitting the root's `None`.
    pub fn path_condition(&self, branch: BranchId) -> Vec<Expr> {
        let mut conds = Vec::new();
        let mut cur = Some(branch);
        while let Some(b) = cur {
            if let Some(c) = &self.nodes[b].condition {
                conds.push(c.clone());
            }
            cur = self.nodes[b].parent;
        }
        conds.reverse();
        conds
    }

    pub fn resolve_var(&self, branch: BranchId, ident: Symbol) -> Result<Var, MirError> {
        let mut cur = Some(branch);
        while let Some(b) = cur {
            if let Some(versions) = self.nodes[b].variables.get(&ident) {
                if let Some(v) = versions.last() {
                    return Ok(v.clone());
                }
            }
            cur = self.nodes[b].parent;
        }
        Err(MirError::illegal(format!(
            "cannot load undefined variable '{}'",
            ident.as_str()
        )))
    }

    pub fn store_var(&mut self, branch: BranchId, ident: Symbol, ty: verifier_hir::Type, decl_span: Span) -> Var {
        let scope = self.scope_path(branch);
        let versions = self.nodes[branch].variables.entry(ident).or_default();
        let var = Var {
            ident,
            version: versions.len() as u32,
            scope,
            ty,
            decl_span,
        };
        versions.push(var.clone());
        var
    }

    /// Merges a just-finished `if`/`else` pair of child branches back into
    /// `parent` (spec.md §4.2 "Reconciliation algorithm"). `children` is
    /// exactly the branches opened for this one `if`, in then-before-else
    /// order - not `parent`'s full lifetime history of subscopes.
    pub fn reconcile(&mut self, parent: BranchId, children: &[BranchId]) -> Result<Vec<Assign>, MirError> {
        let mut idents: Vec<Symbol> = Vec::new();
        for &c in children {
            for ident in self.nodes[c].variables.keys() {
                if !idents.contains(ident) {
                    idents.push(*ident);
                }
            }
        }

        let mut assigns = Vec::new();
        for ident in idents {
            let scope = self.scope_path(parent);
            let existing = self.nodes[parent]
                .variables
                .get(&ident)
                .map(|v| v.len())
                .unwrap_or(0);

            let mut resolved = Vec::with_capacity(children.len());
            let mut ty = None;
            let mut historical = Vec::new();
            for &c in children {
                let v = self.resolve_var(c, ident)?;
                ty.get_or_insert(v.ty);
                resolved.push((self.path_condition(c), v));
                if let Some(h) = self.nodes[c].variables.get(&ident) {
                    historical.extend(h.iter().cloned());
                }
            }
            let merged = Var {
                ident,
                version: existing as u32,
                scope,
                ty: ty.expect("at least one child resolves a written ident"),
                decl_span: Span::DUMMY,
            };

            for (path_condition, rhs_var) in resolved {
                assigns.push(Assign {
                    path_condition,
                    lhs: merged.clone(),
                    rhs: Expr::Var(rhs_var),
                });
            }

            let entry = self.nodes[parent].variables.entry(ident).or_default();
            entry.extend(historical);
            entry.push(merged);
        }
        Ok(assigns)
    }

    /// Every `Var` this arena ever stored, in branch-then-version order -
    /// the declaration universe LIR needs for `declare-fun`.
    pub fn all_vars(&self) -> Vec<Var> {
        let mut out = Vec::new();
        for (_, node) in self.nodes.iter_enumerated() {
            for versions in node.variables.values() {
                out.extend(versions.iter().cloned());
            }
        }
        out
    }
}

impl Default for BranchArena {
    fn default() -> Self {
        Self::new()
    }
}
