//! Pipeline orchestration: source text -> AST -> HIR -> MIR -> LIR -> SMT,
//! then handed to the external solver. Grounded on `faxc-drv`'s
//! `Session`/`run_pipeline` shape - phases run in sequence, each one's
//! error short-circuits the rest, mapped to the CLI's exit codes by
//! `main.rs`.

use std::path::Path;

use verifier_lir::Model;

use crate::config::Config;
use crate::error::{DriverError, Result};
use crate::solver::{CheckResult, Solver};

pub struct Session {
    pub config: Config,
}

/// The outcome of a full `verify` run once every phase up to and
/// including the solver has completed without an internal failure.
pub struct VerifyOutcome {
    pub smt_text: String,
    pub model: Model,
    pub results: Vec<CheckResult>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the whole pipeline against one source file.
    pub fn verify(&self, path: &Path) -> Result<VerifyOutcome> {
        let source = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let model = self.lower_to_lir(&source)?;
        let smt_text = verifier_lir::emit(&model);

        if self.config.verbose {
            tracing::debug!(decls = model.decls.len(), items = model.items.len(), "emitted LIR");
        }

        let mut solver = Solver::spawn(&self.config)?;
        let results = solver.run(&model)?;

        Ok(VerifyOutcome {
            smt_text,
            model,
            results,
        })
    }

    fn lower_to_lir(&self, source: &str) -> Result<Model> {
        let ast = verifier_parse::parse(source).map_err(|e| DriverError::pipeline(e.into_diagnostic()))?;
        tracing::debug!("parsed AST");

        let hir = verifier_hir::lower(&ast).map_err(|e| DriverError::pipeline(e.into_diagnostic()))?;
        tracing::debug!(functions = hir.body.len(), "lowered to HIR");

        let mir = verifier_mir::lower(&hir).map_err(|e| DriverError::pipeline(e.into_diagnostic()))?;
        tracing::debug!(vars = mir.vars.len(), "lowered to MIR");

        Ok(verifier_lir::lower(&mir))
    }
}
