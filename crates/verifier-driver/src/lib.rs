//! verifier-driver - The `verify` CLI: reads a source file, runs it through
//! every pipeline phase (spec.md §1), emits SMT-LIB, drives an external
//! solver over it, and renders the result (spec.md §6).

pub mod config;
pub mod error;
pub mod report;
pub mod session;
pub mod solver;

pub use config::Config;
pub use error::{DriverError, Result};
pub use session::{Session, VerifyOutcome};
