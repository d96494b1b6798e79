//! MIR -> LIR lowering (spec.md §4.3).
//!
//! A flattening pass: every `Var` becomes a globally-unique textual
//! identifier `{prefix}{ident}${scope}${version}` (scope indices joined by
//! `_`); every `Stmt` becomes an `Assume` or a `ValidityScope`, its path
//! condition folded in as `(=> path_condition body)`. Each `FuncDef` pushes
//! `{name}!` onto the prefix stack for the span of its own body and is
//! wrapped in a bare push/pop `Scope` so its declarations and internal
//! asserts never leak into the module's permanent top-level state.

use verifier_mir::mir::{self, predefined};
use verifier_util::FxHashMap;

use crate::lir::{Assume, Decl, Item, Model, Scope, Term, ValidityScope};

pub fn lower(module: &mir::Module) -> Model {
    let mut lowerer = Lowerer::new(module);

    for var in &module.vars {
        lowerer.add_decl(var);
    }

    let mut items = Vec::with_capacity(module.funcs.len() + module.body.len());
    for f in &module.funcs {
        items.push(Item::Scope(lowerer.lower_func(f)));
    }
    for stmt in &module.body {
        items.extend(lowerer.lower_stmt(stmt));
    }

    Model {
        decls: lowerer.decls,
        items,
    }
}

struct Lowerer {
    prefix: String,
    in_funcdef: bool,
    decls: Vec<Decl>,
    /// Module-level `__return__` vars, numbered in call-site order
    /// (spec.md §4.3's `!call_<n>!` prefix) - precomputed rather than
    /// read off a live counter at render time, so a var's rendering never
    /// depends on how many *later* calls happen to have run by the time
    /// something else references it.
    call_indices: FxHashMap<mir::Var, u32>,
}

impl Lowerer {
    fn new(module: &mir::Module) -> Self {
        let mut call_indices = FxHashMap::default();
        let mut n = 0u32;
        for stmt in &module.body {
            if let mir::Stmt::FuncCall(c) = stmt {
                n += 1;
                call_indices.insert(c.return_value.clone(), n);
            }
        }
        Self {
            prefix: String::new(),
            in_funcdef: false,
            decls: Vec::new(),
            call_indices,
        }
    }

    fn flatten(&self, var: &mir::Var) -> Term {
        let scope = var
            .scope
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("_");
        let mut prefix = self.prefix.clone();
        if !self.in_funcdef {
            if let Some(n) = self.call_indices.get(var) {
                prefix = format!("!call_{n}!{prefix}");
            }
        }
        Term::Ident(format!("{prefix}{}${scope}${}", var.ident.as_str(), var.version))
    }

    fn add_decl(&mut self, var: &mir::Var) {
        let ident = self.flatten(var);
        let Term::Ident(name) = ident else { unreachable!() };
        self.decls.push(Decl {
            name,
            sort: var.ty.into(),
            source_name: var.ident.as_str().to_string(),
            decl_span: var.decl_span,
        });
    }

    fn lower_expr(&self, expr: &mir::Expr) -> Term {
        match expr {
            mir::Expr::Var(v) => self.flatten(v),
            mir::Expr::Constant { value, .. } => match value {
                mir::Literal::Int(v) => Term::Int(*v),
                mir::Literal::Real(v) => Term::Real(*v),
                mir::Literal::Bool(v) => Term::Bool(*v),
            },
            mir::Expr::Call { func_id, args, .. } => Term::call(
                predefined::symbol(*func_id),
                args.iter().map(|a| self.lower_expr(a)).collect(),
            ),
        }
    }

    fn and_all(&self, terms: Vec<Term>) -> Option<Term> {
        match terms.len() {
            0 => None,
            1 => terms.into_iter().next(),
            _ => Some(Term::call("and", terms)),
        }
    }

    /// Folds a branch's path condition into `body` as `(=> (and pc) body)`;
    /// `body` unchanged if the path condition is empty (the root branch).
    fn wrap_path_condition(&self, path_condition: &[mir::Expr], body: Term) -> Term {
        let conds: Vec<Term> = path_condition.iter().map(|e| self.lower_expr(e)).collect();
        match self.and_all(conds) {
            None => body,
            Some(cond) => Term::call("=>", vec![cond, body]),
        }
    }

    fn lower_stmt(&mut self, stmt: &mir::Stmt) -> Vec<Item> {
        match stmt {
            mir::Stmt::Assign(a) => {
                let eq = Term::call("=", vec![self.flatten(&a.lhs), self.lower_expr(&a.rhs)]);
                let wrapped = self.wrap_path_condition(&a.path_condition, eq);
                vec![Item::Assume(Assume { term: wrapped })]
            }
            mir::Stmt::Assert(a) => {
                // Unlike the distilled reference implementation (whose
                // LIR pass drops `Assert`'s path condition entirely), the
                // test is wrapped in its path condition before negation:
                // `(not (=> pc test))` reduces to `pc and (not test)`,
                // so the check only fires along a feasible path.
                let test = self.lower_expr(&a.test);
                let wrapped = self.wrap_path_condition(&a.path_condition, test);
                vec![Item::ValidityScope(ValidityScope {
                    assumptions: Vec::new(),
                    test: wrapped,
                    span: a.span,
                })]
            }
            mir::Stmt::Assumption(a) => {
                let e = self.lower_expr(&a.expr);
                let wrapped = self.wrap_path_condition(&a.path_condition, e);
                vec![Item::Assume(Assume { term: wrapped })]
            }
            mir::Stmt::FuncCall(c) => self.lower_funccall(c),
        }
    }

    /// A call site with both a precondition check and a postcondition
    /// assume produces both items, in that order (check, then assume).
    fn lower_funccall(&mut self, call: &mir::FuncCall) -> Vec<Item> {
        let mut items = Vec::with_capacity(2);
        if !call.preconditions.is_empty() {
            let terms: Vec<Term> = call.preconditions.iter().map(|e| self.lower_expr(e)).collect();
            let conj = self.and_all(terms).expect("checked non-empty above");
            let wrapped = self.wrap_path_condition(&call.path_condition, conj);
            items.push(Item::ValidityScope(ValidityScope {
                assumptions: Vec::new(),
                test: wrapped,
                span: call.span,
            }));
        }
        if !call.postconditions.is_empty() {
            let terms: Vec<Term> = call.postconditions.iter().map(|e| self.lower_expr(e)).collect();
            let conj = self.and_all(terms).expect("checked non-empty above");
            let wrapped = self.wrap_path_condition(&call.path_condition, conj);
            items.push(Item::Assume(Assume { term: wrapped }));
        }
        items
    }

    fn lower_func(&mut self, f: &mir::FuncDef) -> Scope {
        let outer_prefix = std::mem::replace(&mut self.prefix, format!("{}{}!", self.prefix, f.name.as_str()));
        self.in_funcdef = true;

        for var in &f.vars {
            self.add_decl(var);
        }

        let mut items = Vec::with_capacity(f.body.len());
        for stmt in &f.body {
            items.extend(self.lower_stmt(stmt));
        }

        self.in_funcdef = false;
        self.prefix = outer_prefix;
        Scope { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_src(src: &str) -> Model {
        let ast = verifier_parse::parse(src).expect("source should parse");
        let hir = verifier_hir::lower(&ast).expect("hir lowering should succeed");
        let mir = verifier_mir::lower(&hir).expect("mir lowering should succeed");
        lower(&mir)
    }

    #[test]
    fn flattens_module_level_variable() {
        let model = lower_src("a = 1;\nassert a;\n");
        assert!(model.decls.iter().any(|d| d.name.starts_with("a$")));
    }

    #[test]
    fn sibling_calls_keep_distinct_call_indices_regardless_of_reference_order() {
        let src = "\
            def f(a: int) -> int {\n\
            @ensures(__return__ == a)\n\
            return a;\n\
            }\n\
            assert f(1) + f(2) == 3;\n";
        let model = lower_src(src);
        let text = crate::emit::emit(&model);
        // Both call-site return vars must render with their OWN index -
        // the second call must not retroactively rename the first's.
        assert!(text.contains("!call_1!"));
        assert!(text.contains("!call_2!"));
    }

    #[test]
    fn function_scope_is_independent_of_module_prefix() {
        let src = "def f(a: int) -> int { return a; }\nassert f(1) == 1;\n";
        let model = lower_src(src);
        assert!(model.decls.iter().any(|d| d.name.starts_with("f!")));
    }
}
