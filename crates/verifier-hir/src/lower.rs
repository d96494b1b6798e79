//! AST -> HIR lowering (spec.md §4.1).
//!
//! A single pass, failing fast on the first illegal construct: type
//! inference over `{Bool, Int, Real}`, booleanization of `Bool`-demanding
//! positions, desugaring (`!=`, unary `+`, augmented assignment,
//! multi-target assignment, chained-comparison rejection), function/
//! decorator collection, and loop-invariant enforcement.

use verifier_parse::ast::{self, Ast};
use verifier_util::diagnostic::{E_HIR_ILLEGAL_OP, E_HIR_MISSING_INVARIANT, E_HIR_UNSUPPORTED};
use verifier_util::{Diagnostic, FxHashMap, Span, Symbol};

use crate::hir;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerErrorKind {
    UnsupportedConstruct,
    IllegalOperation,
    MissingInvariant,
}

#[derive(Debug, Clone)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub message: String,
    pub span: Span,
}

impl LowerError {
    fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: LowerErrorKind::UnsupportedConstruct,
            message: message.into(),
            span,
        }
    }

    fn illegal(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: LowerErrorKind::IllegalOperation,
            message: message.into(),
            span,
        }
    }

    fn missing_invariant(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: LowerErrorKind::MissingInvariant,
            message: message.into(),
            span,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let code = match self.kind {
            LowerErrorKind::UnsupportedConstruct => E_HIR_UNSUPPORTED,
            LowerErrorKind::IllegalOperation => E_HIR_ILLEGAL_OP,
            LowerErrorKind::MissingInvariant => E_HIR_MISSING_INVARIANT,
        };
        Diagnostic::error(self.message, self.span).with_code(code)
    }
}

pub type LowerResult<T> = Result<T, LowerError>;

/// A declared function's signature, visible to call sites regardless of
/// source order (functions are collected before any body is lowered).
struct FuncSig {
    ret_type: Type,
    arity: usize,
}

pub fn lower(ast: &Ast) -> LowerResult<hir::Module> {
    let mut lowerer = Lowerer::new();
    lowerer.collect_funcs(ast)?;
    let body = lowerer.lower_stmts(ast)?;
    Ok(hir::Module { body })
}

struct Lowerer {
    funcs: FxHashMap<Symbol, FuncSig>,
    scopes: Vec<FxHashMap<Symbol, Type>>,
}

const RETURN_NAME: &str = "__return__";
const LOOP_INVARIANT_NAME: &str = "loop_invariant";

impl Lowerer {
    fn new() -> Self {
        Self {
            funcs: FxHashMap::default(),
            scopes: vec![FxHashMap::default()],
        }
    }

    fn scope(&mut self) -> &mut FxHashMap<Symbol, Type> {
        self.scopes.last_mut().expect("at least one scope frame")
    }

    fn resolve(&self, ident: Symbol, span: Span) -> LowerResult<Type> {
        self.scopes
            .last()
            .and_then(|s| s.get(&ident).copied())
            .ok_or_else(|| {
                LowerError::illegal(format!("load of undefined name '{}'", ident.as_str()), span)
            })
    }

    fn store(&mut self, ident: Symbol, ty: Type) {
        self.scope().insert(ident, ty);
    }

    /// Registers every top-level `FnDef`'s signature ahead of lowering any
    /// statement body, so forward/self/mutually-recursive call sites
    /// resolve regardless of source order.
    fn collect_funcs(&mut self, ast: &Ast) -> LowerResult<()> {
        for stmt in ast {
            if let ast::Stmt::FnDef(f) = stmt {
                if self.funcs.contains_key(&f.name) {
                    return Err(LowerError::illegal(
                        format!("function '{}' is already defined", f.name.as_str()),
                        f.span,
                    ));
                }
                self.funcs.insert(
                    f.name,
                    FuncSig {
                        ret_type: f.ret_type.into(),
                        arity: f.params.len(),
                    },
                );
            }
        }
        Ok(())
    }

    fn lower_stmts(&mut self, stmts: &[ast::Stmt]) -> LowerResult<Vec<hir::Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.lower_stmt(stmt)?);
        }
        Ok(out)
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> LowerResult<Vec<hir::Stmt>> {
        match stmt {
            ast::Stmt::FnDef(f) => Ok(vec![hir::Stmt::FuncDef(self.lower_fn_def(f)?)]),
            ast::Stmt::Expr(e) => Ok(vec![hir::Stmt::Expr(self.lower_expr(e)?)]),
            ast::Stmt::Assert { test, span } => {
                let test = self.to_bool(self.lower_expr(test)?)?;
                Ok(vec![hir::Stmt::Assert { test, span: *span }])
            }
            ast::Stmt::Assign {
                targets,
                value,
                span,
            } => {
                let rhs = self.lower_expr(value)?;
                let ty = rhs.ty();
                let mut out = Vec::with_capacity(targets.len());
                for &target in targets {
                    self.store(target, ty);
                    out.push(hir::Stmt::Assign {
                        lhs: hir::Name {
                            ident: target,
                            ty,
                            span: *span,
                        },
                        rhs: rhs.clone(),
                        span: *span,
                    });
                }
                Ok(out)
            }
            ast::Stmt::AugAssign {
                target,
                op,
                value,
                span,
            } => {
                // `x` on the rhs must bind to the pre-update version; we
                // resolve it before calling `store` below.
                let lhs_ty = self.resolve(*target, *span)?;
                let lhs_expr = hir::Expr::Name {
                    ident: *target,
                    ty: lhs_ty,
                    ctx: hir::NameCtx::Load,
                    span: *span,
                };
                let rhs_value = self.lower_expr(value)?;
                let rhs = self.lower_binop(*op, lhs_expr, rhs_value, *span)?;
                let ty = rhs.ty();
                self.store(*target, ty);
                Ok(vec![hir::Stmt::Assign {
                    lhs: hir::Name {
                        ident: *target,
                        ty,
                        span: *span,
                    },
                    rhs,
                    span: *span,
                }])
            }
            ast::Stmt::If {
                test,
                body,
                orelse,
                span,
            } => {
                let test = self.to_bool(self.lower_expr(test)?)?;
                let body = self.lower_stmts(body)?;
                let orelse = self.lower_stmts(orelse)?;
                Ok(vec![hir::Stmt::If {
                    test,
                    body,
                    orelse,
                    span: *span,
                }])
            }
            ast::Stmt::While { test, body, span } => Ok(vec![self.lower_while(test, body, *span)?]),
            ast::Stmt::Return { value, span } => {
                let value = value.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                Ok(vec![hir::Stmt::Return { value, span: *span }])
            }
        }
    }

    fn lower_while(
        &mut self,
        test: &ast::Expr,
        body: &[ast::Stmt],
        span: Span,
    ) -> LowerResult<hir::Stmt> {
        let (invariant_args, rest) = match body.first() {
            Some(ast::Stmt::Expr(ast::Expr::Call { func, args, .. }))
                if func.as_str() == LOOP_INVARIANT_NAME =>
            {
                (args.as_slice(), &body[1..])
            }
            _ => {
                return Err(LowerError::missing_invariant(
                    "while loop must begin with a loop_invariant(...) statement",
                    span,
                ))
            }
        };

        let test = self.to_bool(self.lower_expr(test)?)?;
        let mut invariants = Vec::with_capacity(invariant_args.len());
        for e in invariant_args {
            invariants.push(self.to_bool(self.lower_expr(e)?)?);
        }
        let body = self.lower_stmts(rest)?;

        let mut touched_vars = Vec::new();
        collect_idents_expr(&test, &mut touched_vars);
        for inv in &invariants {
            collect_idents_expr(inv, &mut touched_vars);
        }
        for stmt in &body {
            collect_idents_stmt(stmt, &mut touched_vars);
        }

        Ok(hir::Stmt::Loop {
            test,
            invariants,
            body,
            touched_vars,
            span,
        })
    }

    fn lower_fn_def(&mut self, f: &ast::FnDef) -> LowerResult<hir::FuncDef> {
        self.scopes.push(FxHashMap::default());

        let ret_type: Type = f.ret_type.into();
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            let ty: Type = p.ty.into();
            self.store(p.name, ty);
            params.push(hir::Param {
                ident: p.name,
                ty,
                span: p.span,
            });
        }
        self.store(Symbol::intern(RETURN_NAME), ret_type);

        let mut preconds = Vec::with_capacity(f.assumes.len());
        for e in &f.assumes {
            preconds.push(self.to_bool(self.lower_expr(e)?)?);
        }
        let mut postconds = Vec::with_capacity(f.ensures.len());
        for e in &f.ensures {
            postconds.push(self.to_bool(self.lower_expr(e)?)?);
        }
        let body = self.lower_stmts(&f.body)?;

        self.scopes.pop();

        Ok(hir::FuncDef {
            name: f.name,
            params,
            ret_type,
            preconds,
            postconds,
            body,
            span: f.span,
        })
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> LowerResult<hir::Expr> {
        match expr {
            ast::Expr::Literal(lit, span) => Ok(hir::Expr::Constant {
                value: lower_literal(*lit),
                ty: literal_type(*lit),
                span: *span,
            }),
            ast::Expr::Name(ident, span) => {
                let ty = self.resolve(*ident, *span)?;
                Ok(hir::Expr::Name {
                    ident: *ident,
                    ty,
                    ctx: hir::NameCtx::Load,
                    span: *span,
                })
            }
            ast::Expr::ParamAttr { name, span } => {
                let ty = self.resolve(*name, *span)?;
                Ok(hir::Expr::Name {
                    ident: *name,
                    ty,
                    ctx: hir::NameCtx::Load,
                    span: *span,
                })
            }
            ast::Expr::Unary { op, operand, span } => self.lower_unary(*op, operand, *span),
            ast::Expr::Binary {
                op,
                lhs,
                rhs,
                span,
            } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                self.lower_binop(*op, lhs, rhs, *span)
            }
            ast::Expr::Compare {
                left,
                ops,
                comparators,
                span,
            } => {
                if ops.len() > 1 {
                    return Err(LowerError::unsupported(
                        "chained comparisons are not supported",
                        *span,
                    ));
                }
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(&comparators[0])?;
                self.lower_cmp(ops[0], lhs, rhs, *span)
            }
            ast::Expr::Call { func, args, span } => self.lower_call(*func, args, *span),
            ast::Expr::NamedExpr {
                target,
                value,
                span,
            } => {
                let value = self.lower_expr(value)?;
                let ty = value.ty();
                self.store(*target, ty);
                Ok(hir::Expr::NamedExpr {
                    target: *target,
                    value: Box::new(value),
                    ty,
                    span: *span,
                })
            }
        }
    }

    fn lower_unary(
        &mut self,
        op: ast::UnaryOp,
        operand: &ast::Expr,
        span: Span,
    ) -> LowerResult<hir::Expr> {
        let operand = self.lower_expr(operand)?;
        match op {
            ast::UnaryOp::Not => {
                let operand = self.to_bool(operand)?;
                Ok(hir::Expr::Unary {
                    op: hir::UnaryOp::Not,
                    operand: Box::new(operand),
                    ty: Type::Bool,
                    span,
                })
            }
            ast::UnaryOp::Neg => {
                if !operand.ty().is_numeric() {
                    return Err(LowerError::illegal(
                        "unary '-' is only allowed on numeric types",
                        span,
                    ));
                }
                // Result follows the operand: `Real` stays `Real`, `Bool`
                // and `Int` both promote to `Int`.
                let ty = match operand.ty() {
                    Type::Real => Type::Real,
                    Type::Int | Type::Bool => Type::Int,
                };
                Ok(hir::Expr::Unary {
                    op: hir::UnaryOp::Neg,
                    operand: Box::new(operand),
                    ty,
                    span,
                })
            }
            ast::UnaryOp::Invert => {
                if operand.ty() != Type::Int {
                    return Err(LowerError::illegal(
                        "the '~' operator is only allowed on integers",
                        span,
                    ));
                }
                Ok(hir::Expr::Unary {
                    op: hir::UnaryOp::Invert,
                    operand: Box::new(operand),
                    ty: Type::Int,
                    span,
                })
            }
        }
    }

    fn lower_binop(
        &self,
        op: ast::BinOp,
        lhs: hir::Expr,
        rhs: hir::Expr,
        span: Span,
    ) -> LowerResult<hir::Expr> {
        use ast::BinOp as A;
        use hir::BinOp as H;

        let (hop, ty) = match op {
            A::Add | A::Sub | A::Mul | A::Div | A::FloorDiv | A::Mod | A::Pow => {
                let ty = lhs.ty().arithmetic_result(rhs.ty());
                let hop = match op {
                    A::Add => H::Add,
                    A::Sub => H::Sub,
                    A::Mul => H::Mul,
                    A::Div => H::Div,
                    A::FloorDiv => H::FloorDiv,
                    A::Mod => H::Mod,
                    A::Pow => H::Pow,
                    _ => unreachable!(),
                };
                (hop, ty)
            }
            A::LShift | A::RShift | A::BitOr | A::BitXor | A::BitAnd => {
                let ty = lhs.ty().arithmetic_result(rhs.ty());
                if ty == Type::Real {
                    return Err(LowerError::illegal(
                        "bit operations are only allowed on integer types",
                        span,
                    ));
                }
                let hop = match op {
                    A::LShift => H::LShift,
                    A::RShift => H::RShift,
                    A::BitOr => H::BitOr,
                    A::BitXor => H::BitXor,
                    A::BitAnd => H::BitAnd,
                    _ => unreachable!(),
                };
                (hop, Type::Int)
            }
            A::And | A::Or => {
                if lhs.ty() != rhs.ty() {
                    return Err(LowerError::illegal(
                        "boolean operators require operands of the same type",
                        span,
                    ));
                }
                let hop = if matches!(op, A::And) { H::And } else { H::Or };
                (hop, lhs.ty())
            }
        };
        Ok(hir::Expr::Binary {
            op: hop,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
            span,
        })
    }

    fn lower_cmp(
        &self,
        op: ast::CmpOp,
        lhs: hir::Expr,
        rhs: hir::Expr,
        span: Span,
    ) -> LowerResult<hir::Expr> {
        // `!=` desugars to `not (lhs == rhs)` (spec.md §4.1 "Desugaring").
        if op == ast::CmpOp::NotEq {
            let eq = hir::Expr::Binary {
                op: hir::BinOp::Eq,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                ty: Type::Bool,
                span,
            };
            return Ok(hir::Expr::Unary {
                op: hir::UnaryOp::Not,
                operand: Box::new(eq),
                ty: Type::Bool,
                span,
            });
        }
        let hop = match op {
            ast::CmpOp::Eq => hir::BinOp::Eq,
            ast::CmpOp::Lt => hir::BinOp::Lt,
            ast::CmpOp::Lte => hir::BinOp::Lte,
            ast::CmpOp::Gt => hir::BinOp::Gt,
            ast::CmpOp::Gte => hir::BinOp::Gte,
            ast::CmpOp::NotEq => unreachable!(),
        };
        Ok(hir::Expr::Binary {
            op: hop,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: Type::Bool,
            span,
        })
    }

    fn lower_call(&mut self, func: Symbol, args: &[ast::Expr], span: Span) -> LowerResult<hir::Expr> {
        if func.as_str() == LOOP_INVARIANT_NAME {
            return Err(LowerError::unsupported(
                "loop_invariant(...) may only appear as a while loop's first statement",
                span,
            ));
        }
        let sig = self.funcs.get(&func).ok_or_else(|| {
            LowerError::illegal(format!("call to undefined function '{}'", func.as_str()), span)
        })?;
        if args.len() != sig.arity {
            return Err(LowerError::illegal(
                format!(
                    "function '{}' expects {} argument(s), found {}",
                    func.as_str(),
                    sig.arity,
                    args.len()
                ),
                span,
            ));
        }
        let ty = sig.ret_type;
        let mut lowered_args = Vec::with_capacity(args.len());
        for a in args {
            lowered_args.push(self.lower_expr(a)?);
        }
        Ok(hir::Expr::Call {
            func,
            args: lowered_args,
            ty,
            span,
        })
    }

    /// Booleanization (spec.md §4.1): an `Int`/`Real` expression in a
    /// `Bool`-demanding position is wrapped as `not (x == 0)`; `Bool` is
    /// left unchanged.
    fn to_bool(&self, expr: hir::Expr) -> LowerResult<hir::Expr> {
        if expr.ty() == Type::Bool {
            return Ok(expr);
        }
        let span = expr.span();
        let (value, ty) = match expr.ty() {
            Type::Int => (hir::Literal::Int(0), Type::Int),
            Type::Real => (hir::Literal::Real(0.0), Type::Real),
            Type::Bool => unreachable!(),
        };
        let zero = hir::Expr::Constant { value, ty, span };
        let eq = hir::Expr::Binary {
            op: hir::BinOp::Eq,
            lhs: Box::new(expr),
            rhs: Box::new(zero),
            ty: Type::Bool,
            span,
        };
        Ok(hir::Expr::Unary {
            op: hir::UnaryOp::Not,
            operand: Box::new(eq),
            ty: Type::Bool,
            span,
        })
    }
}

fn lower_literal(lit: ast::Literal) -> hir::Literal {
    match lit {
        ast::Literal::Int(v) => hir::Literal::Int(v),
        ast::Literal::Real(v) => hir::Literal::Real(v),
        ast::Literal::Bool(v) => hir::Literal::Bool(v),
    }
}

fn literal_type(lit: ast::Literal) -> Type {
    match lit {
        ast::Literal::Int(_) => Type::Int,
        ast::Literal::Real(_) => Type::Real,
        ast::Literal::Bool(_) => Type::Bool,
    }
}

fn collect_idents_expr(expr: &hir::Expr, out: &mut Vec<Symbol>) {
    match expr {
        hir::Expr::Constant { .. } => {}
        hir::Expr::Name { ident, .. } => push_unique(out, *ident),
        hir::Expr::Unary { operand, .. } => collect_idents_expr(operand, out),
        hir::Expr::Binary { lhs, rhs, .. } => {
            collect_idents_expr(lhs, out);
            collect_idents_expr(rhs, out);
        }
        hir::Expr::Call { args, .. } => {
            for a in args {
                collect_idents_expr(a, out);
            }
        }
        hir::Expr::NamedExpr { target, value, .. } => {
            push_unique(out, *target);
            collect_idents_expr(value, out);
        }
    }
}

fn collect_idents_stmt(stmt: &hir::Stmt, out: &mut Vec<Symbol>) {
    match stmt {
        hir::Stmt::FuncDef(_) => {}
        hir::Stmt::Expr(e) => collect_idents_expr(e, out),
        hir::Stmt::Assign { lhs, rhs, .. } => {
            push_unique(out, lhs.ident);
            collect_idents_expr(rhs, out);
        }
        hir::Stmt::Assert { test, .. } => collect_idents_expr(test, out),
        hir::Stmt::If {
            test, body, orelse, ..
        } => {
            collect_idents_expr(test, out);
            for s in body {
                collect_idents_stmt(s, out);
            }
            for s in orelse {
                collect_idents_stmt(s, out);
            }
        }
        hir::Stmt::Loop {
            test,
            invariants,
            body,
            ..
        } => {
            collect_idents_expr(test, out);
            for e in invariants {
                collect_idents_expr(e, out);
            }
            for s in body {
                collect_idents_stmt(s, out);
            }
        }
        hir::Stmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_idents_expr(v, out);
            }
        }
        hir::Stmt::Pass => {}
    }
}

fn push_unique(out: &mut Vec<Symbol>, sym: Symbol) {
    if !out.contains(&sym) {
        out.push(sym);
    }
}
