//! CLI end-to-end tests for the `verify` binary (spec.md §8's E1-E6
//! testable properties, exercised through the real command line). The
//! assertion-discharging tests require a `z3` binary on `PATH`, same as
//! any test suite that drives a real external tool rather than a mock.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn verify_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_verify"))
}

#[test]
fn help_flag_succeeds() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn missing_file_exits_with_parse_or_lowering_code() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg(fixtures_dir().join("does_not_exist.vf"));
    cmd.assert().code(2);
}

#[test]
fn syntax_error_exits_2_with_location() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg(fixtures_dir().join("syntax_error.vf"));
    cmd.assert().code(2).stderr(predicate::str::contains("line"));
}

#[test]
fn valid_program_exits_0() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg(fixtures_dir().join("valid_assertion.vf"));
    cmd.assert().code(0);
}

#[test]
fn failing_assertion_exits_1_with_counterexample() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg(fixtures_dir().join("failing_assertion.vf"));
    cmd.assert().code(1).stderr(predicate::str::contains("assertion failed"));
}

#[test]
fn output_smt_flag_prints_emitted_text_before_verifying() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg("--output-smt").arg(fixtures_dir().join("valid_assertion.vf"));
    cmd.assert().code(0).stdout(predicate::str::contains("declare-fun"));
}

#[test]
fn modular_function_contract_verifies_without_inlining() {
    let mut cmd = Command::new(verify_bin());
    cmd.arg(fixtures_dir().join("function_contract.vf"));
    cmd.assert().code(0);
}
