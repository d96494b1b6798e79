//! MIR node definitions (spec.md §3, "MIR entities") and the predefined
//! SMT function-id table (spec.md §4.2, "Expressions").

use std::hash::{Hash, Hasher};

use verifier_hir::Type;
use verifier_util::{Span, Symbol};

/// A scope path: branch indices from the module's root (index 0) down to
/// the branch a `Var` was written in (spec.md §3, "Scope-path invariant").
pub type ScopePath = Vec<u32>;

/// Two `Var`s are equal iff `(ident, version, scope)` match. A `Var` once
/// emitted is never mutated; reassignment produces a new, distinct `Var`.
/// `decl_span` is display-only metadata (the driver's counterexample
/// pretty-printer, spec.md §6) and is excluded from `Eq`/`Hash` below -
/// a reconciliation-merged `Var` has no single declaring site, so two
/// `Var`s that are otherwise identical must not be treated as distinct
/// merely because one carries `Span::DUMMY`.
#[derive(Debug, Clone)]
pub struct Var {
    pub ident: Symbol,
    pub version: u32,
    pub scope: ScopePath,
    pub ty: Type,
    pub decl_span: Span,
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident && self.version == other.version && self.scope == other.scope && self.ty == other.ty
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident.hash(state);
        self.version.hash(state);
        self.scope.hash(state);
        self.ty.hash(state);
    }
}

/// One of the fixed SMT function identifiers a binary/unary operator is
/// rewritten into (spec.md §4.2). Binary `SUB` and unary `SUB` are distinct
/// ids that both render to `-` (DESIGN.md Open Question #1); `MUL` has
/// exactly one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub i32);

pub mod predefined {
    use super::FuncId;

    pub const ADD: FuncId = FuncId(1);
    pub const SUB: FuncId = FuncId(2);
    pub const MUL: FuncId = FuncId(3);
    pub const DIV: FuncId = FuncId(4);
    pub const MOD: FuncId = FuncId(5);
    pub const EQ: FuncId = FuncId(6);
    pub const LT: FuncId = FuncId(7);
    pub const LTE: FuncId = FuncId(8);
    pub const GT: FuncId = FuncId(9);
    pub const GTE: FuncId = FuncId(10);
    pub const AND: FuncId = FuncId(11);
    pub const OR: FuncId = FuncId(12);
    pub const NOT: FuncId = FuncId(13);
    pub const NEG: FuncId = FuncId(14);

    /// The SMT-LIB symbol each predefined id renders to. Binary `SUB` and
    /// unary `NEG` both render to `-`; the distinct ids only matter while
    /// deciding arity, not at emission.
    pub fn symbol(id: FuncId) -> &'static str {
        match id {
            ADD => "+",
            SUB => "-",
            MUL => "*",
            DIV => "/",
            MOD => "mod",
            EQ => "=",
            LT => "<",
            LTE => "<=",
            GT => ">",
            GTE => ">=",
            AND => "and",
            OR => "or",
            NOT => "not",
            NEG => "-",
            _ => unreachable!("not a predefined function id: {id:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Var),
    Constant { value: Literal, ty: Type },
    Call { func_id: FuncId, args: Vec<Expr>, ty: Type },
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Var(v) => v.ty,
            Expr::Constant { ty, .. } => *ty,
            Expr::Call { ty, .. } => *ty,
        }
    }
}

/// `path_condition` is the list of branch conditions (root to leaf) active
/// when this node was emitted; rendered at LIR as `(=> (and path_condition) body)`.
#[derive(Debug, Clone)]
pub struct Assign {
    pub path_condition: Vec<Expr>,
    pub lhs: Var,
    pub rhs: Expr,
}

#[derive(Debug, Clone)]
pub struct Assert {
    pub path_condition: Vec<Expr>,
    pub test: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Assumption {
    pub path_condition: Vec<Expr>,
    pub expr: Expr,
}

/// A modular call-site (spec.md §4.2 "Function calls"): the callee's body
/// is never explored, only its contract. `return_value` is the fresh
/// havoc'd `Var` standing in for the call's result everywhere else in the
/// caller's expression tree.
#[derive(Debug, Clone)]
pub struct FuncCall {
    pub func_name: Symbol,
    pub path_condition: Vec<Expr>,
    pub preconditions: Vec<Expr>,
    pub postconditions: Vec<Expr>,
    pub return_value: Var,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(Assign),
    Assert(Assert),
    Assumption(Assumption),
    FuncCall(FuncCall),
}

#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: Symbol,
    pub params: Vec<Var>,
    pub ret_type: Type,
    /// Every `Var` ever written anywhere in this function's own Branch
    /// tree - the declaration universe LIR needs for `declare-fun`.
    pub vars: Vec<Var>,
    pub body: Vec<Stmt>,
    pub path_condition: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct Module {
    /// Every `Var` ever written anywhere in the module-level Branch tree.
    pub vars: Vec<Var>,
    pub body: Vec<Stmt>,
    pub funcs: Vec<FuncDef>,
}
