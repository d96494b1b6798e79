//! Configuration for the `verify` CLI (SPEC_FULL.md's ambient-stack
//! expansion of spec.md §6): an optional `verify.toml` next to the
//! invocation, loaded with `serde` + `toml`, with a baked-in default for
//! every field so the tool runs with zero configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

pub const CONFIG_FILE_NAME: &str = "verify.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Name or path of the external SMT solver binary.
    #[serde(default = "default_solver")]
    pub solver: String,

    /// Extra arguments passed to the solver on every invocation.
    #[serde(default)]
    pub solver_args: Vec<String>,

    #[serde(default)]
    pub verbose: bool,
}

fn default_solver() -> String {
    "z3".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            solver_args: vec!["-in".to_string()],
            verbose: false,
        }
    }
}

impl Config {
    /// Look for `verify.toml` in the current directory; fall back to
    /// defaults if it isn't there.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| DriverError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}
