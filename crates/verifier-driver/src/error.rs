//! The driver's own error type, distinct from the pipeline phases' errors.
//!
//! Every phase error (lex/parse/HIR/MIR) is converted to a
//! [`verifier_util::Diagnostic`] at the phase boundary and wrapped here as
//! [`DriverError::Pipeline`], so [`crate::report`] only ever needs to
//! render one shape regardless of which phase actually failed.

use std::path::PathBuf;

use thiserror::Error;
use verifier_util::{Diagnostic, Span};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// A lex/parse/HIR/MIR error - exit code 2 (spec.md §6). Flattened
    /// out of the phase's `Diagnostic` at the boundary so the CLI can
    /// render `span`/`message` without re-matching on which phase failed.
    #[error("{message}")]
    Pipeline { message: String, span: Span },

    /// The external solver could not be invoked at all (binary missing,
    /// spawn failure, or it exited with a status other than via `exit`).
    #[error("solver invocation failed: {0}")]
    Solver(String),
}

impl DriverError {
    pub fn pipeline(diag: Diagnostic) -> Self {
        Self::Pipeline {
            message: diag.message,
            span: diag.span,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
