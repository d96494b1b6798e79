//! Drives the external SMT solver over an emitted [`verifier_lir::Model`]
//! (spec.md §4.3, §5: "the solver is invoked once per emitted program").
//!
//! Grounded on `original_source/py2smt/check.py`'s `check_inner`: a single
//! long-lived solver session with declarations added once up front, plain
//! `Assume`s added permanently, and each `ValidityScope`/`Scope` getting
//! its own `push`/`pop` sandbox. Here the "solver" is an actual external
//! `z3` process talked to over stdin/stdout rather than an in-process
//! library, so every statement that produces solver-visible state is
//! written as SMT-LIB text and every `check-sat` blocks on reading the
//! process's next response line.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use verifier_lir::{Decl, Item, Model, Scope, ValidityScope};
use verifier_util::Span;

use crate::config::Config;
use crate::error::{DriverError, Result};

/// One `(name, raw-SMT-value-text)` pair from a `sat` model.
pub type ModelFrame = (String, String);

#[derive(Debug, Clone)]
pub enum Verdict {
    Unsat,
    /// The assertion can fail; carries the model's interpretation of every
    /// currently-declared decision variable.
    Sat(Vec<ModelFrame>),
    /// The solver gave up (`unknown`) - treated like `Sat` is not safe and
    /// like `Unsat` is not sound, so it is surfaced to the driver as its
    /// own outcome rather than silently folded into either.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub span: Span,
    pub verdict: Verdict,
}

pub struct Solver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<std::process::ChildStdout>,
}

impl Solver {
    pub fn spawn(config: &Config) -> Result<Self> {
        let mut child = Command::new(&config.solver)
            .args(&config.solver_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DriverError::Solver(format!("failed to launch '{}': {e}", config.solver)))?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));

        Ok(Self { child, stdin, stdout })
    }

    fn send(&mut self, line: &str) -> Result<()> {
        writeln!(self.stdin, "{line}").map_err(|e| DriverError::Solver(format!("write to solver failed: {e}")))
    }

    fn read_reply(&mut self) -> Result<String> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .stdout
                .read_line(&mut line)
                .map_err(|e| DriverError::Solver(format!("read from solver failed: {e}")))?;
            if n == 0 {
                return Err(DriverError::Solver("solver closed its output unexpectedly".into()));
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    /// Runs the whole model, returning every `ValidityScope`'s verdict in
    /// emission order. Declarations are sent once, up front, exactly as
    /// `declare-fun`s; every other item is driven per
    /// `original_source/py2smt/check.py`'s sequencing.
    pub fn run(&mut self, model: &Model) -> Result<Vec<CheckResult>> {
        for decl in &model.decls {
            self.send(&decl.render())?;
        }

        let mut results = Vec::new();
        for item in &model.items {
            self.run_item(item, &model.decls, &mut results)?;
        }
        Ok(results)
    }

    fn run_item(&mut self, item: &Item, decls: &[Decl], results: &mut Vec<CheckResult>) -> Result<()> {
        match item {
            Item::Assume(a) => self.send(&a.render()),
            Item::Scope(s) => self.run_scope(s, decls, results),
            Item::ValidityScope(v) => self.run_validity_scope(v, decls, results),
        }
    }

    fn run_scope(&mut self, scope: &Scope, decls: &[Decl], results: &mut Vec<CheckResult>) -> Result<()> {
        self.send("(push 1)")?;
        for item in &scope.items {
            self.run_item(item, decls, results)?;
        }
        self.send("(pop 1)")
    }

    fn run_validity_scope(&mut self, v: &ValidityScope, decls: &[Decl], results: &mut Vec<CheckResult>) -> Result<()> {
        self.send("(push 1)")?;
        for a in &v.assumptions {
            self.send(&format!("(assert {})", a.render()))?;
        }
        self.send(&format!("(assert (not {}))", v.test.render()))?;
        self.send("(check-sat)")?;
        let reply = self.read_reply()?;

        let verdict = match reply.as_str() {
            "unsat" => Verdict::Unsat,
            "unknown" => Verdict::Unknown,
            "sat" => Verdict::Sat(self.read_model(decls)?),
            other => {
                return Err(DriverError::Solver(format!(
                    "unexpected (check-sat) reply: '{other}'"
                )))
            }
        };

        self.send("(pop 1)")?;
        results.push(CheckResult { span: v.span, verdict });
        Ok(())
    }

    fn read_model(&mut self, decls: &[Decl]) -> Result<Vec<ModelFrame>> {
        if decls.is_empty() {
            return Ok(Vec::new());
        }
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        self.send(&format!("(get-value ({}))", names.join(" ")))?;
        let reply = self.read_reply()?;
        Ok(parse_get_value(&reply))
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        let _ = self.send("(exit)");
        let _ = self.child.wait();
    }
}

/// A minimal s-expression tokenizer, just enough to split a `get-value`
/// reply like `((a 1) (b (- 2)) (c true))` into `[("a", "1"), ("b", "(-
/// 2)"), ("c", "true")]` without depending on a general SMT-LIB parser.
fn parse_get_value(reply: &str) -> Vec<ModelFrame> {
    let tokens = tokenize(reply);
    let (root, _) = parse_sexpr(&tokens, 0);
    let Sexpr::List(pairs) = root else { return Vec::new() };

    pairs
        .into_iter()
        .filter_map(|pair| {
            let Sexpr::List(mut parts) = pair else { return None };
            if parts.len() < 2 {
                return None;
            }
            let value = parts.split_off(1).into_iter().next()?;
            let Sexpr::Atom(name) = parts.into_iter().next()? else { return None };
            Some((name, render_sexpr(&value)))
        })
        .collect()
}

enum Sexpr {
    Atom(String),
    List(Vec<Sexpr>),
}

fn tokenize(src: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    for ch in src.chars() {
        match ch {
            '(' | ')' => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    tokens
}

fn parse_sexpr(tokens: &[String], pos: usize) -> (Sexpr, usize) {
    if tokens.get(pos).map(String::as_str) != Some("(") {
        return (Sexpr::Atom(tokens.get(pos).cloned().unwrap_or_default()), pos + 1);
    }
    let mut items = Vec::new();
    let mut i = pos + 1;
    while tokens.get(i).map(String::as_str) != Some(")") {
        if i >= tokens.len() {
            break;
        }
        let (item, next) = parse_sexpr(tokens, i);
        items.push(item);
        i = next;
    }
    (Sexpr::List(items), i + 1)
}

fn render_sexpr(expr: &Sexpr) -> String {
    match expr {
        Sexpr::Atom(s) => s.clone(),
        Sexpr::List(items) => {
            let rendered: Vec<String> = items.iter().map(render_sexpr).collect();
            format!("({})", rendered.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_model() {
        let frames = parse_get_value("((a 1) (b true))");
        assert_eq!(frames, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "true".to_string())]);
    }

    #[test]
    fn parses_negative_numbers_as_nested_lists() {
        let frames = parse_get_value("((a (- 2)))");
        assert_eq!(frames, vec![("a".to_string(), "(- 2)".to_string())]);
    }

    #[test]
    fn empty_reply_yields_no_frames() {
        assert!(parse_get_value("()").is_empty());
    }
}
