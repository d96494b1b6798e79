//! Counterexample pretty-printing (spec.md §6, §7): "one frame per
//! decision variable, showing the source name, line, and assigned value".

use verifier_lir::{Decl, Model};
use verifier_util::Span;

use crate::solver::{CheckResult, ModelFrame, Verdict};

pub struct Counterexample {
    pub assertion_span: Span,
    pub frames: Vec<Frame>,
}

pub struct Frame {
    pub source_name: String,
    pub line: u32,
    pub value: String,
}

/// The first `ValidityScope` whose `check-sat` came back `sat`, in
/// emission order - a verifier reports the first failure it finds rather
/// than exhaustively collecting every one (unlike
/// `original_source/py2smt/check.py`, whose loop keeps overwriting a
/// single `error` variable so it inadvertently reports the *last* `sat`
/// scope it saw; DESIGN.md records this as a corrected bug, not a
/// behavior this driver replicates).
pub fn first_failure(model: &Model, results: &[CheckResult]) -> Option<Counterexample> {
    for result in results {
        if let Verdict::Sat(model_frames) = &result.verdict {
            return Some(Counterexample {
                assertion_span: result.span,
                frames: render_frames(model, model_frames),
            });
        }
    }
    None
}

fn render_frames(model: &Model, model_frames: &[ModelFrame]) -> Vec<Frame> {
    model_frames
        .iter()
        .filter_map(|(flattened_name, value)| {
            let decl = model.decls.iter().find(|d: &&Decl| &d.name == flattened_name)?;
            Some(Frame {
                source_name: decl.source_name.clone(),
                line: decl.decl_span.line,
                value: value.clone(),
            })
        })
        .collect()
}

/// Renders a stack-trace-style counterexample to a single string, one
/// frame per line, suitable for printing directly to stderr.
pub fn render(counterexample: &Counterexample) -> String {
    let mut lines = vec![format!(
        "assertion failed at line {}",
        counterexample.assertion_span.line
    )];
    for frame in &counterexample.frames {
        lines.push(format!(
            "  {} (line {}) = {}",
            frame.source_name, frame.line, frame.value
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use verifier_lir::Sort;

    fn sample_model() -> Model {
        Model {
            decls: vec![Decl {
                name: "a$0".to_string(),
                sort: Sort::Int,
                source_name: "a".to_string(),
                decl_span: Span::new(0, 1, 3, 1),
            }],
            items: Vec::new(),
        }
    }

    #[test]
    fn no_sat_result_yields_no_counterexample() {
        let model = sample_model();
        let results = vec![CheckResult {
            span: Span::DUMMY,
            verdict: Verdict::Unsat,
        }];
        assert!(first_failure(&model, &results).is_none());
    }

    #[test]
    fn sat_result_renders_one_frame_per_declared_variable() {
        let model = sample_model();
        let results = vec![CheckResult {
            span: Span::new(0, 1, 5, 1),
            verdict: Verdict::Sat(vec![("a$0".to_string(), "7".to_string())]),
        }];
        let ce = first_failure(&model, &results).expect("expected a counterexample");
        assert_eq!(ce.frames.len(), 1);
        assert_eq!(ce.frames[0].source_name, "a");
        assert_eq!(ce.frames[0].line, 3);
        assert_eq!(ce.frames[0].value, "7");

        let text = render(&ce);
        assert!(text.contains("line 5"));
        assert!(text.contains("a (line 3) = 7"));
    }
}
