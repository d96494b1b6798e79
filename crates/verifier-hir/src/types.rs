//! The closed type lattice `T = {Bool, Int, Real}` (spec.md §3).
//!
//! `Bool` is a numeric subtype of `Int`: it participates in arithmetic and
//! promotes exactly like `Int` does. There are no user-defined types, no
//! generics, and no function types in this lattice - every HIR node carries
//! one of these three variants.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Real,
}

impl Type {
    /// `true` for every member of the lattice; kept as a named predicate
    /// (rather than inlined `match`es) because "is this numeric" is asked
    /// from several lowering sites (booleanization, bitwise-op rejection).
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Real)
    }

    /// Result type of an arithmetic `BinExpr` per spec.md §4.1: `Int` if
    /// both operands are `Int` (treating `Bool` as `Int`), else `Real` if
    /// either operand is `Real`.
    pub fn arithmetic_result(self, other: Type) -> Type {
        if self == Type::Real || other == Type::Real {
            Type::Real
        } else {
            Type::Int
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Real => write!(f, "real"),
        }
    }
}

impl From<verifier_parse::ast::TypeAnnotation> for Type {
    fn from(ann: verifier_parse::ast::TypeAnnotation) -> Self {
        match ann {
            verifier_parse::ast::TypeAnnotation::Bool => Type::Bool,
            verifier_parse::ast::TypeAnnotation::Int => Type::Int,
            verifier_parse::ast::TypeAnnotation::Real => Type::Real,
        }
    }
}
