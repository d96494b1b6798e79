//! verifier-util - Core utilities and foundation types
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This crate provides the fundamental utilities shared by every pass of the
//! verifier pipeline (parse -> HIR -> MIR -> LIR -> SMT emission): typed
//! indices, string interning, source-location tracking, and diagnostics.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. ZERO-COST ABSTRACTIONS
//!    Typed indices and interned symbols compile down to a single integer,
//!    with no runtime penalty compared to hand-written `usize`/`u32` use.
//!
//! 2. TYPE SAFETY
//!    Distinct index types (`VarId`, `BranchId`, `DeclId`, ...) prevent mixing
//!    different ID spaces across IR passes.
//!
//! 3. NO SHARED MUTABLE STATE ACROSS PASSES
//!    The only process-global state here is the string interner; everything
//!    else (diagnostics, source maps) is owned by the component using it.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use error::{
    DiagnosticError, DiagnosticResult, IndexVecError, IndexVecResult, SourceMapError,
    SourceMapResult, SymbolError, SymbolResult,
};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::{InternerStats, Symbol};

// Re-export commonly used hash collections so downstream crates don't need
// their own `rustc-hash` dependency declaration.
pub use rustc_hash::{FxHashMap, FxHashSet};
