//! Recursive-descent parser with Pratt-style binary operator precedence.
//!
//! Grounded in `faxc-par`'s `bp` (binding power) module convention: a
//! precedence table of `u8` constants consumed by a single
//! `parse_bin_expr(min_bp)` loop, rather than one function per precedence
//! level.

use crate::ast::{BinOp, CmpOp, Expr, FnDef, Literal, Param, Stmt, TypeAnnotation, UnaryOp};
use verifier_lex::{lex, Token, TokenKind};
use verifier_util::diagnostic::{DiagnosticCode, E_PARSER_EXPECTED_TOKEN, E_PARSER_UNEXPECTED_EOF, E_PARSER_UNEXPECTED_TOKEN};
use verifier_util::{Diagnostic, Span, Symbol};

/// Binding power levels for Pratt parsing of the verifier's fixed operator
/// vocabulary (spec.md §3). Higher binds tighter.
#[doc(hidden)]
pub mod bp {
    pub const MIN: u8 = 0;
    pub const OR: u8 = 2;
    pub const AND: u8 = 4;
    pub const COMPARISON: u8 = 6;
    pub const BITWISE_OR: u8 = 8;
    pub const BITWISE_XOR: u8 = 10;
    pub const BITWISE_AND: u8 = 12;
    pub const SHIFT: u8 = 14;
    pub const ADDITIVE: u8 = 16;
    pub const MULTIPLICATIVE: u8 = 18;
    pub const POWER: u8 = 20;
    pub const UNARY: u8 = 22;
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub code: DiagnosticCode,
}

impl ParseError {
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(self.message, self.span).with_code(self.code)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Lex and parse `source` into a complete AST.
pub fn parse(source: &str) -> ParseResult<crate::ast::Ast> {
    let tokens = lex(source).map_err(|e| ParseError {
        message: e.message,
        span: e.span,
        code: e.code,
    })?;
    Parser::new(tokens).parse_module()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Token {
        self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.peek();
        if !self.at_eof() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(self.unexpected(kind.describe(), tok))
        }
    }

    fn unexpected(&self, expected: &str, found: Token) -> ParseError {
        let code = if matches!(found.kind, TokenKind::Eof) {
            E_PARSER_UNEXPECTED_EOF
        } else {
            E_PARSER_EXPECTED_TOKEN
        };
        ParseError {
            message: format!("expected {expected}, found {}", found.kind.describe()),
            span: found.span,
            code,
        }
    }

    fn ident(&mut self) -> ParseResult<(Symbol, Span)> {
        let tok = self.peek();
        if let TokenKind::Ident(sym) = tok.kind {
            self.advance();
            Ok((sym, tok.span))
        } else {
            Err(self.unexpected("identifier", tok))
        }
    }

    // ---- module & statements -------------------------------------------------

    pub fn parse_module(&mut self) -> ParseResult<crate::ast::Ast> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.eat(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_eof() {
                return Err(self.unexpected("'}'", self.peek()));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.eat(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        let (name, span) = self.ident()?;
        match name.as_str() {
            "bool" => Ok(TypeAnnotation::Bool),
            "int" => Ok(TypeAnnotation::Int),
            "float" => Ok(TypeAnnotation::Real),
            other => Err(ParseError {
                message: format!("unknown type annotation '{other}'"),
                span,
                code: E_PARSER_UNEXPECTED_TOKEN,
            }),
        }
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::At => self.parse_decorated_fn_def(),
            TokenKind::Def => self.parse_fn_def(Vec::new(), Vec::new()),
            TokenKind::Assert => {
                let span = self.advance().span;
                let test = self.parse_expr()?;
                self.eat(TokenKind::Semicolon)?;
                Ok(Stmt::Assert { test, span })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => {
                let span = self.advance().span;
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.eat(TokenKind::Semicolon)?;
                Ok(Stmt::Return { value, span })
            }
            TokenKind::Ident(_) => self.parse_ident_led_stmt(),
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span();
                self.eat(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Disambiguates `name = ...`, `name op= ...`, `name = name = ... = e`,
    /// and plain expression statements that happen to start with an
    /// identifier (calls, comparisons, etc.).
    fn parse_ident_led_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.pos;
        let (first, first_span) = self.ident()?;

        if let Some(op) = self.peek_aug_assign_op() {
            self.advance();
            let value = self.parse_expr()?;
            let span = first_span;
            self.eat(TokenKind::Semicolon)?;
            return Ok(Stmt::AugAssign {
                target: first,
                op,
                value,
                span,
            });
        }

        if self.check(&TokenKind::Eq) {
            let mut targets = vec![first];
            loop {
                self.eat(TokenKind::Eq)?;
                // Look ahead: `ident =` continues the target chain.
                if matches!(self.peek_kind(), TokenKind::Ident(_)) {
                    let save = self.pos;
                    let (name, _) = self.ident()?;
                    if self.check(&TokenKind::Eq) {
                        targets.push(name);
                        continue;
                    }
                    self.pos = save;
                }
                let value = self.parse_expr()?;
                self.eat(TokenKind::Semicolon)?;
                return Ok(Stmt::Assign {
                    targets,
                    value,
                    span: first_span,
                });
            }
        }

        // Not an assignment: rewind and parse as a general expression
        // statement (covers calls like `plus(1, 2);` and bare names).
        self.pos = start;
        let expr = self.parse_expr()?;
        self.eat(TokenKind::Semicolon)?;
        Ok(Stmt::Expr(expr))
    }

    fn peek_aug_assign_op(&self) -> Option<BinOp> {
        Some(match self.peek_kind() {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::PercentEq => BinOp::Mod,
            _ => return None,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let span = self.advance().span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let orelse = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            test,
            body,
            orelse,
            span,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let span = self.advance().span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { test, body, span })
    }

    fn parse_decorator_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.eat(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_decorated_fn_def(&mut self) -> ParseResult<Stmt> {
        let mut assumes = Vec::new();
        let mut ensures = Vec::new();
        while self.check(&TokenKind::At) {
            self.advance();
            let tok = self.peek();
            match tok.kind {
                TokenKind::Assumes => {
                    self.advance();
                    assumes.extend(self.parse_decorator_args()?);
                }
                TokenKind::Ensures => {
                    self.advance();
                    ensures.extend(self.parse_decorator_args()?);
                }
                _ => {
                    return Err(ParseError {
                        message: format!(
                            "unsupported decorator '@{}'",
                            tok.kind.describe()
                        ),
                        span: tok.span,
                        code: E_PARSER_UNEXPECTED_TOKEN,
                    })
                }
            }
        }
        self.parse_fn_def(assumes, ensures)
    }

    fn parse_fn_def(&mut self, assumes: Vec<Expr>, ensures: Vec<Expr>) -> ParseResult<Stmt> {
        let span = self.eat(TokenKind::Def)?.span;
        let (name, _) = self.ident()?;
        self.eat(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (pname, pspan) = self.ident()?;
                self.eat(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: pname,
                    ty,
                    span: pspan,
                });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat(TokenKind::RParen)?;
        self.eat(TokenKind::Arrow)?;
        let ret_type = self.parse_type()?;
        let body = self.parse_block()?;
        Ok(Stmt::FnDef(FnDef {
            name,
            params,
            ret_type,
            assumes,
            ensures,
            body,
            span,
        }))
    }

    // ---- expressions ----------------------------------------------------------

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_bin_expr(bp::MIN)
    }

    fn parse_bin_expr(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;

        loop {
            let (op, l_bp, r_bp) = match self.binop_binding_power() {
                Some(t) => t,
                None => break,
            };
            if l_bp < min_bp {
                break;
            }
            let span = self.advance().span;
            let rhs = self.parse_bin_expr(r_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        // Comparisons are parsed separately (not folded into `parse_bin_expr`)
        // so that a chain `a < b < c` can be captured faithfully instead of
        // associating left-to-right as ordinary binary operators would.
        if min_bp <= bp::COMPARISON {
            if let Some(first_op) = self.cmp_op() {
                let span = self.peek().span;
                let mut ops = vec![first_op];
                self.advance();
                let mut comparators = vec![self.parse_bin_expr(bp::COMPARISON + 1)?];
                while let Some(op) = self.cmp_op() {
                    self.advance();
                    ops.push(op);
                    comparators.push(self.parse_bin_expr(bp::COMPARISON + 1)?);
                }
                lhs = Expr::Compare {
                    left: Box::new(lhs),
                    ops,
                    comparators,
                    span,
                };
            }
        }

        Ok(lhs)
    }

    fn cmp_op(&self) -> Option<CmpOp> {
        Some(match self.peek_kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtEq => CmpOp::Lte,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtEq => CmpOp::Gte,
            _ => return None,
        })
    }

    fn binop_binding_power(&self) -> Option<(BinOp, u8, u8)> {
        use BinOp::*;
        let (op, bp) = match self.peek_kind() {
            TokenKind::OrOr => (Or, bp::OR),
            TokenKind::AndAnd => (And, bp::AND),
            TokenKind::Pipe => (BitOr, bp::BITWISE_OR),
            TokenKind::Caret => (BitXor, bp::BITWISE_XOR),
            TokenKind::Amp => (BitAnd, bp::BITWISE_AND),
            TokenKind::LShift => (LShift, bp::SHIFT),
            TokenKind::RShift => (RShift, bp::SHIFT),
            TokenKind::Plus => (Add, bp::ADDITIVE),
            TokenKind::Minus => (Sub, bp::ADDITIVE),
            TokenKind::Star => (Mul, bp::MULTIPLICATIVE),
            TokenKind::Slash => (Div, bp::MULTIPLICATIVE),
            TokenKind::SlashSlash => (FloorDiv, bp::MULTIPLICATIVE),
            TokenKind::Percent => (Mod, bp::MULTIPLICATIVE),
            TokenKind::StarStar => (Pow, bp::POWER),
            _ => return None,
        };
        // Power is right-associative; everything else is left-associative.
        let r_bp = if matches!(op, Pow) { bp } else { bp + 1 };
        Some((op, bp, r_bp))
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let (op, span) = match self.peek_kind() {
            TokenKind::Bang => (UnaryOp::Not, self.advance().span),
            TokenKind::Minus => (UnaryOp::Neg, self.advance().span),
            TokenKind::Plus => {
                // Unary `+x` desugars to `x` at HIR lowering (spec.md §4.1);
                // the parser discards the sign here directly since there is
                // no AST node that would survive the desugar anyway.
                self.advance();
                return self.parse_unary();
            }
            TokenKind::Tilde => (UnaryOp::Invert, self.advance().span),
            _ => return self.parse_power(),
        };
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_postfix()?;
        if self.check(&TokenKind::StarStar) {
            let span = self.advance().span;
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exp),
                span,
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(v), tok.span))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Real(v), tok.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true), tok.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false), tok.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.eat(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LoopInvariant => {
                self.advance();
                self.eat(TokenKind::LParen)?;
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.eat(TokenKind::RParen)?;
                Ok(Expr::Call {
                    func: Symbol::intern("loop_invariant"),
                    args,
                    span: tok.span,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                if name.as_str() == "param" && self.check(&TokenKind::Dot) {
                    self.advance();
                    let (attr, attr_span) = self.ident()?;
                    return Ok(Expr::ParamAttr {
                        name: attr,
                        span: attr_span,
                    });
                }
                if self.check(&TokenKind::ColonEq) {
                    self.advance();
                    let value = self.parse_expr()?;
                    return Ok(Expr::NamedExpr {
                        target: name,
                        value: Box::new(value),
                        span: tok.span,
                    });
                }
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.eat(TokenKind::RParen)?;
                    return Ok(Expr::Call {
                        func: name,
                        args,
                        span: tok.span,
                    });
                }
                Ok(Expr::Name(name, tok.span))
            }
            _ => Err(self.unexpected("an expression", tok)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr, Literal, Stmt};

    fn parse_ok(src: &str) -> crate::ast::Ast {
        parse(src).unwrap_or_else(|e| panic!("parse failed: {}", e.message))
    }

    #[test]
    fn parses_e1_simple_assert() {
        let ast = parse_ok("a = 1; assert a;");
        assert_eq!(ast.len(), 2);
        assert!(matches!(ast[0], Stmt::Assign { .. }));
        assert!(matches!(ast[1], Stmt::Assert { .. }));
    }

    #[test]
    fn parses_e3_if_else() {
        let ast = parse_ok(
            "a = 0; if a { b = 1; } else { b = 2; } assert b == 2;",
        );
        assert_eq!(ast.len(), 3);
        match &ast[1] {
            Stmt::If { body, orelse, .. } => {
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn parses_e4_function_with_decorators() {
        let ast = parse_ok(
            "@ensures(__return__ == param.a + param.b)\n\
             def plus(a: int, b: int) -> int {\n\
                 return a + b;\n\
             }\n\
             assert plus(1, 2) == 3;",
        );
        assert_eq!(ast.len(), 2);
        match &ast[0] {
            Stmt::FnDef(f) => {
                assert_eq!(f.name.as_str(), "plus");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.ensures.len(), 1);
                assert!(f.assumes.is_empty());
            }
            other => panic!("expected FnDef, got {other:?}"),
        }
        match &ast[1] {
            Stmt::Assert { test: Expr::Compare { .. }, .. } => {}
            other => panic!("expected an Assert with a Compare test, got {other:?}"),
        }
    }

    #[test]
    fn parses_e5_assumes_and_or_chain() {
        let ast = parse_ok(
            "@assumes(param.a < param.b)\n\
             @ensures(__return__ >= param.a, __return__ <= param.b)\n\
             def clamp(a: int, b: int, c: int) -> int {\n\
                 return c;\n\
             }",
        );
        match &ast[0] {
            Stmt::FnDef(f) => {
                assert_eq!(f.assumes.len(), 1);
                assert_eq!(f.ensures.len(), 2);
            }
            other => panic!("expected FnDef, got {other:?}"),
        }
    }

    #[test]
    fn parses_e6_while_with_loop_invariant() {
        let ast = parse_ok(
            "x = 5; y = 3; k = 0; r = 0;\n\
             while k < x {\n\
                 loop_invariant(k <= x and r == k * y);\n\
                 r = r + y;\n\
                 k = k + 1;\n\
             }\n\
             assert r == x * y;",
        );
        let while_stmt = ast
            .iter()
            .find(|s| matches!(s, Stmt::While { .. }))
            .expect("expected a While statement");
        match while_stmt {
            Stmt::While { body, .. } => {
                assert_eq!(body.len(), 3);
                match &body[0] {
                    Stmt::Expr(Expr::Call { func, args, .. }) => {
                        assert_eq!(func.as_str(), "loop_invariant");
                        assert_eq!(args.len(), 1);
                    }
                    other => panic!("expected loop_invariant call, got {other:?}"),
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_multi_target_assign() {
        let ast = parse_ok("a = b = 3;");
        match &ast[0] {
            Stmt::Assign { targets, value, .. } => {
                assert_eq!(targets.len(), 2);
                assert!(matches!(value, Expr::Literal(Literal::Int(3), _)));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn parses_aug_assign() {
        let ast = parse_ok("x += 1;");
        match &ast[0] {
            Stmt::AugAssign { op, .. } => assert_eq!(*op, BinOp::Add),
            other => panic!("expected AugAssign, got {other:?}"),
        }
    }

    #[test]
    fn parses_named_expr() {
        let ast = parse_ok("assert (y := 5) == 5;");
        match &ast[0] {
            Stmt::Assert { test: Expr::Compare { left, .. }, .. } => {
                assert!(matches!(**left, Expr::NamedExpr { .. }));
            }
            other => panic!("expected Assert with NamedExpr, got {other:?}"),
        }
    }

    #[test]
    fn parses_chained_comparison_as_single_node() {
        let ast = parse_ok("assert a < b < c;");
        match &ast[0] {
            Stmt::Assert { test: Expr::Compare { ops, comparators, .. }, .. } => {
                assert_eq!(ops.len(), 2);
                assert_eq!(comparators.len(), 2);
            }
            other => panic!("expected a chained Compare, got {other:?}"),
        }
    }

    #[test]
    fn respects_operator_precedence() {
        // `1 + 2 * 3` must parse as `1 + (2 * 3)`.
        let ast = parse_ok("assert 1 + 2 * 3 == 7;");
        match &ast[0] {
            Stmt::Assert { test: Expr::Compare { left, .. }, .. } => match &**left {
                Expr::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected top-level Add, got {other:?}"),
            },
            other => panic!("expected Assert, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_type_annotation() {
        let err = parse("def f(a: string) -> int { return a; }").unwrap_err();
        assert!(err.message.contains("unknown type annotation"));
    }

    #[test]
    fn rejects_missing_semicolon() {
        assert!(parse("a = 1").is_err());
    }
}
