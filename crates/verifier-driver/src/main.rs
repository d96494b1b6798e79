//! `verify` - the command-line entry point (spec.md §6):
//!
//! ```text
//! verify [--output-smt] <file>
//! ```
//!
//! Exit codes: 0 success, 1 verification failure, 2 parse/lowering error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use verifier_driver::{report, Config, DriverError, Session};

/// Verify a program against its `@assumes`/`@ensures`/`loop_invariant`
/// annotations by discharging each assertion to an external SMT solver.
#[derive(Parser, Debug)]
#[command(name = "verify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Static program verifier", long_about = None)]
struct Cli {
    /// Print the emitted SMT-LIB text before verification.
    #[arg(long)]
    output_smt: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, env = "VERIFY_VERBOSE")]
    verbose: bool,

    /// Path to a `verify.toml` configuration file.
    #[arg(short, long, env = "VERIFY_CONFIG")]
    config: Option<PathBuf>,

    /// The source file to verify.
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(DriverError::Pipeline { message, span }) => {
            eprintln!("error at line {}, column {}: {}", span.line, span.column, message);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Runs the verifier end to end; `Ok(true)` means every assertion held.
fn run(cli: &Cli) -> verifier_driver::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.verbose = config.verbose || cli.verbose;

    let session = Session::new(config);
    let outcome = session.verify(&cli.file)?;

    if cli.output_smt {
        println!("{}", outcome.smt_text);
    }

    match report::first_failure(&outcome.model, &outcome.results) {
        Some(counterexample) => {
            eprintln!("{}", report::render(&counterexample));
            Ok(false)
        }
        None => Ok(true),
    }
}

fn init_logging(verbose: bool) -> Result<(), String> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer().with_target(false).with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_bare_file() {
        let cli = Cli::parse_from(["verify", "program.vf"]);
        assert_eq!(cli.file, PathBuf::from("program.vf"));
        assert!(!cli.output_smt);
    }

    #[test]
    fn cli_parses_output_smt_flag() {
        let cli = Cli::parse_from(["verify", "--output-smt", "program.vf"]);
        assert!(cli.output_smt);
    }

    #[test]
    fn cli_parses_verbose_flag() {
        let cli = Cli::parse_from(["verify", "--verbose", "program.vf"]);
        assert!(cli.verbose);
    }
}
