//! LIR entities (spec.md §4.3): a textual SMT-LIB emission tree.
//!
//! Declarations `(declare-fun name () sort)`, an `Assume` wrapping one
//! s-expression as a permanent top-level `(assert ...)`, and a
//! `ValidityScope` wrapping `(push)(assumptions)(assert (not test))
//! (check-sat)(pop)`. `Term` is the textual `Call`/`Ident`/`Constant`
//! vocabulary everything else is built from.

/// Sort mapping (spec.md §4.3): `Int -> Int`, `Bool -> Bool`, `Real -> Real`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Int,
    Bool,
    Real,
}

impl Sort {
    pub fn smt_name(self) -> &'static str {
        match self {
            Sort::Int => "Int",
            Sort::Bool => "Bool",
            Sort::Real => "Real",
        }
    }
}

impl From<verifier_hir::Type> for Sort {
    fn from(ty: verifier_hir::Type) -> Self {
        match ty {
            verifier_hir::Type::Bool => Sort::Bool,
            verifier_hir::Type::Int => Sort::Int,
            verifier_hir::Type::Real => Sort::Real,
        }
    }
}

/// A textual s-expression: an already-flattened identifier, a rendered
/// constant, or a call to one of the predefined SMT functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Ident(String),
    Bool(bool),
    Int(i64),
    Real(f64),
    Call { func: &'static str, args: Vec<Term> },
}

impl Term {
    pub fn call(func: &'static str, args: Vec<Term>) -> Self {
        Term::Call { func, args }
    }

    pub fn render(&self) -> String {
        match self {
            Term::Ident(s) => s.clone(),
            Term::Bool(b) => b.to_string(),
            Term::Int(v) => v.to_string(),
            Term::Real(v) => format!("{v:?}"),
            Term::Call { func, args } => {
                let rendered: Vec<String> = args.iter().map(Term::render).collect();
                format!("({func} {})", rendered.join(" "))
            }
        }
    }
}

/// `(declare-fun name () sort)` - a zero-arity uninterpreted constant, one
/// per `Var` ever written anywhere in the program. `source_name`/`decl_span`
/// are carried alongside the flattened `name` purely for the driver's
/// counterexample pretty-printer (spec.md §6): they never affect emission.
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    pub sort: Sort,
    pub source_name: String,
    pub decl_span: verifier_util::Span,
}

impl Decl {
    pub fn render(&self) -> String {
        format!("(declare-fun {} () {})", self.name, self.sort.smt_name())
    }
}

/// A permanent top-level `(assert expr)`.
#[derive(Debug, Clone)]
pub struct Assume {
    pub term: Term,
}

impl Assume {
    pub fn render(&self) -> String {
        format!("(assert {})", self.term.render())
    }
}

/// `(push 1) <assumptions> (assert (not test)) (check-sat) (pop 1)`. A
/// `sat` result from `check-sat` means the asserted property can fail.
/// `span` is the originating source assertion/precondition check, carried
/// through purely for the driver's counterexample pretty-printer
/// (spec.md §6, §7) - it plays no role in emission.
#[derive(Debug, Clone)]
pub struct ValidityScope {
    pub assumptions: Vec<Term>,
    pub test: Term,
    pub span: verifier_util::Span,
}

impl ValidityScope {
    pub fn render(&self) -> String {
        let mut lines = vec!["(push 1)".to_string()];
        for a in &self.assumptions {
            lines.push(format!("(assert {})", a.render()));
        }
        lines.push(format!("(assert (not {}))", self.test.render()));
        lines.push("(check-sat)".to_string());
        lines.push("(pop 1)".to_string());
        lines.join("\n")
    }
}

/// A bare `(push 1) <items> (pop 1)` sandbox with no `check-sat` of its
/// own - used to wrap a function's body so nothing it declares or
/// internally asserts leaks into the module's permanent top-level state
/// (modular verification checks each function in isolation).
#[derive(Debug, Clone)]
pub struct Scope {
    pub items: Vec<Item>,
}

impl Scope {
    pub fn render(&self) -> String {
        let mut lines = vec!["(push 1)".to_string()];
        for item in &self.items {
            lines.push(item.render());
        }
        lines.push("(pop 1)".to_string());
        lines.join("\n")
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Assume(Assume),
    ValidityScope(ValidityScope),
    Scope(Scope),
}

impl Item {
    pub fn render(&self) -> String {
        match self {
            Item::Assume(a) => a.render(),
            Item::ValidityScope(v) => v.render(),
            Item::Scope(s) => s.render(),
        }
    }
}

/// The top-level declarations (module and every function's variables) plus
/// the ordered list of assumes and validity scopes LIR produces.
#[derive(Debug, Clone)]
pub struct Model {
    pub decls: Vec<Decl>,
    pub items: Vec<Item>,
}
