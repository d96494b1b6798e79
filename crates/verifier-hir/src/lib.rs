//! verifier-hir - Lowers a [`verifier_parse::Ast`] into a typed HIR module.
//!
//! Type inference over `{Bool, Int, Real}`, booleanization of `Bool`-
//! demanding positions, desugaring of surface sugar (`!=`, unary `+`,
//! augmented/multi-target assignment, chained comparisons), function and
//! decorator collection, and loop-invariant enforcement all happen in this
//! single pass (spec.md §4.1). MIR lowering consumes the result.

pub mod hir;
pub mod lower;
pub mod types;

pub use hir::Module;
pub use lower::{lower, LowerError, LowerErrorKind, LowerResult};
pub use types::Type;
