//! verifier-parse - AST node definitions.
//!
//! This module contains all AST node definitions produced by the parser.
//! The vocabulary here is deliberately small: it mirrors the HIR entity
//! table (spec.md §3) closely enough that HIR lowering is close to a direct
//! translation, plus the syntactic sugar (augmented/multi-target assignment,
//! chained comparisons) that HIR lowering desugars or rejects.

use verifier_util::{Span, Symbol};

/// AST root - a source file is a flat list of top-level statements,
/// including function definitions (mirroring the original's
/// `ast.Module.body` holding both `FunctionDef` and plain statements).
pub type Ast = Vec<Stmt>;

/// The three source-level type annotations. `float` in the surface syntax
/// maps to `Real`, matching the original's int/float/bool vocabulary while
/// spec.md names the lattice `{Bool, Int, Real}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAnnotation {
    Bool,
    Int,
    Real,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeAnnotation,
    pub span: Span,
}

/// A function definition, decorated by zero or more leading `@assumes(...)`
/// / `@ensures(...)` clauses (spec.md §4.1 "Function collection").
#[derive(Debug, Clone)]
pub struct FnDef {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_type: TypeAnnotation,
    pub assumes: Vec<Expr>,
    pub ensures: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    FnDef(FnDef),
    Expr(Expr),
    Assert {
        test: Expr,
        span: Span,
    },
    /// `a = b = e`: multiple targets bound to the same rhs value.
    Assign {
        targets: Vec<Symbol>,
        value: Expr,
        span: Span,
    },
    /// `x op= y`, desugared at HIR lowering to `x = x op y`.
    AugAssign {
        target: Symbol,
        op: BinOp,
        value: Expr,
        span: Span,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        span: Span,
    },
    /// The first statement of `body` must be a `loop_invariant(...)` call;
    /// enforced during HIR lowering, not here (spec.md §4.1).
    While {
        test: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FnDef(f) => f.span,
            Stmt::Expr(e) => e.span(),
            Stmt::Assert { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::AugAssign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Return { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal, Span),
    /// A bare name, e.g. `x`, `__return__`.
    Name(Symbol, Span),
    /// `param.<name>` — the only dotted form the subset supports.
    ParamAttr {
        name: Symbol,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    /// `a < b < c` chains are represented faithfully here and rejected
    /// during HIR lowering (spec.md §4.1, "Chained comparisons ... are
    /// rejected") rather than by the grammar, matching the original's
    /// `ast.Compare` shape.
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
        span: Span,
    },
    Call {
        func: Symbol,
        args: Vec<Expr>,
        span: Span,
    },
    /// Inline assignment expression (`name := value`); evaluates to the
    /// assigned value after performing the assignment as a side effect.
    NamedExpr {
        target: Symbol,
        value: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, s)
            | Expr::Name(_, s)
            | Expr::ParamAttr { span: s, .. }
            | Expr::Unary { span: s, .. }
            | Expr::Binary { span: s, .. }
            | Expr::Compare { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::NamedExpr { span: s, .. } => *s,
        }
    }
}
