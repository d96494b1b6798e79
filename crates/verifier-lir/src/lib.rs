//! verifier-lir - Lowers a [`verifier_mir::Module`] into LIR (spec.md
//! §4.3) and renders it as textual SMT-LIB (spec.md §1, stage 5).

pub mod emit;
pub mod lir;
pub mod lower;

pub use emit::emit;
pub use lir::{Decl, Item, Model, Scope, Sort, Term, ValidityScope};
pub use lower::lower;
