//! verifier-mir - Lowers a [`verifier_hir::Module`] into MIR (spec.md §4.2):
//! SSA-form variables scoped by a Branch tree, path-condition propagation,
//! modular function-call encoding, and loop abstraction by invariant.

pub mod branch;
pub mod lower;
pub mod mir;

pub use branch::{BranchArena, BranchId};
pub use lower::{lower, MirError, MirErrorKind, MirResult};
pub use mir::Module;
