//! Lexical analysis: transforms source text into a stream of [`Token`]s.
//!
//! Direct-coded (recursive-function) scanning rather than a table-driven
//! FSM, matching the teacher's approach — easier to extend with the
//! verifier's fixed operator vocabulary and easier to produce precise
//! diagnostics from.

use crate::cursor::Cursor;
use crate::token::{keyword, Token, TokenKind};
use verifier_util::diagnostic::{DiagnosticCode, E_LEXER_UNEXPECTED_CHAR, E_LEXER_UNTERMINATED_STRING};
use verifier_util::{Diagnostic, Span, Symbol};

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub span: Span,
    pub code: DiagnosticCode,
}

impl LexError {
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(self.message, self.span).with_code(self.code)
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// Tokenizes `source` in full, returning tokens terminated by a single
/// trailing [`TokenKind::Eof`].
pub fn lex(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.cursor.position();
            let (line, column) = (self.cursor.line(), self.cursor.column());
            if self.cursor.is_eof() {
                tokens.push(Token::new(
                    TokenKind::Eof,
                    Span::new(start, start, line, column),
                ));
                break;
            }
            let kind = self.next_token()?;
            let end = self.cursor.position();
            tokens.push(Token::new(kind, Span::new(start, end, line, column)));
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());
            if self.cursor.current_char() == '#' {
                self.cursor.eat_while(|c| c != '\n');
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> LexResult<TokenKind> {
        let c = self.cursor.current_char();
        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_ident());
        }
        if c.is_ascii_digit() {
            return self.lex_number();
        }
        self.lex_operator()
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.cursor.position();
        self.cursor
            .eat_while(|c| c.is_alphanumeric() || c == '_');
        let text = self.cursor.slice(start, self.cursor.position());
        keyword(text).unwrap_or_else(|| TokenKind::Ident(Symbol::intern(text)))
    }

    fn lex_number(&mut self) -> LexResult<TokenKind> {
        let start = self.cursor.position();
        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut is_real = false;
        if self.cursor.current_char() == '.' && self.cursor.char_at(1).is_ascii_digit() {
            is_real = true;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.cursor.current_char(), 'e' | 'E') {
            let save = self.cursor.position();
            let mut probe = 1;
            if matches!(self.cursor.char_at(1), '+' | '-') {
                probe += 1;
            }
            if self.cursor.char_at(probe).is_ascii_digit() {
                is_real = true;
                self.cursor.advance();
                if matches!(self.cursor.current_char(), '+' | '-') {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
            let _ = save;
        }
        let text = self.cursor.slice(start, self.cursor.position());
        if is_real {
            text.parse::<f64>()
                .map(TokenKind::Real)
                .map_err(|_| self.error(format!("invalid numeric literal '{text}'"), start))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(format!("invalid numeric literal '{text}'"), start))
        }
    }

    fn lex_operator(&mut self) -> LexResult<TokenKind> {
        let start = self.cursor.position();
        let c = self.cursor.advance();
        macro_rules! two_char {
            ($second:expr, $then:expr, $else_:expr) => {
                if self.cursor.current_char() == $second {
                    self.cursor.advance();
                    $then
                } else {
                    $else_
                }
            };
        }
        Ok(match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => two_char!('=', TokenKind::ColonEq, TokenKind::Colon),
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '@' => TokenKind::At,
            '~' => TokenKind::Tilde,
            '^' => TokenKind::Caret,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '+' => two_char!('=', TokenKind::PlusEq, TokenKind::Plus),
            '-' => {
                if self.cursor.current_char() == '>' {
                    self.cursor.advance();
                    TokenKind::Arrow
                } else {
                    two_char!('=', TokenKind::MinusEq, TokenKind::Minus)
                }
            }
            '%' => two_char!('=', TokenKind::PercentEq, TokenKind::Percent),
            '*' => {
                if self.cursor.current_char() == '*' {
                    self.cursor.advance();
                    TokenKind::StarStar
                } else {
                    two_char!('=', TokenKind::StarEq, TokenKind::Star)
                }
            }
            '/' => {
                if self.cursor.current_char() == '/' {
                    self.cursor.advance();
                    TokenKind::SlashSlash
                } else {
                    two_char!('=', TokenKind::SlashEq, TokenKind::Slash)
                }
            }
            '=' => two_char!('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => two_char!('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => {
                if self.cursor.current_char() == '<' {
                    self.cursor.advance();
                    TokenKind::LShift
                } else {
                    two_char!('=', TokenKind::LtEq, TokenKind::Lt)
                }
            }
            '>' => {
                if self.cursor.current_char() == '>' {
                    self.cursor.advance();
                    TokenKind::RShift
                } else {
                    two_char!('=', TokenKind::GtEq, TokenKind::Gt)
                }
            }
            other => return Err(self.error(format!("unexpected character '{other}'"), start)),
        })
    }

    fn error(&self, message: impl Into<String>, start: usize) -> LexError {
        LexError {
            message: message.into(),
            span: Span::new(start, self.cursor.position(), self.cursor.line(), self.cursor.column()),
            code: E_LEXER_UNEXPECTED_CHAR,
        }
    }
}

#[allow(dead_code)]
fn unterminated(span: Span) -> LexError {
    LexError {
        message: "unterminated token".into(),
        span,
        code: E_LEXER_UNTERMINATED_STRING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_function_header() {
        let k = kinds("def plus(a: int, b: int) -> int {");
        assert_eq!(
            k,
            vec![
                TokenKind::Def,
                TokenKind::Ident(Symbol::intern("plus")),
                TokenKind::LParen,
                TokenKind::Ident(Symbol::intern("a")),
                TokenKind::Colon,
                TokenKind::Ident(Symbol::intern("int")),
                TokenKind::Comma,
                TokenKind::Ident(Symbol::intern("b")),
                TokenKind::Colon,
                TokenKind::Ident(Symbol::intern("int")),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident(Symbol::intern("int")),
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(kinds("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(kinds("3.5"), vec![TokenKind::Real(3.5), TokenKind::Eof]);
        assert_eq!(kinds("1e3"), vec![TokenKind::Real(1000.0), TokenKind::Eof]);
    }

    #[test]
    fn lexes_compound_operators() {
        assert_eq!(
            kinds("x += 1; y != 2; a <= b"),
            vec![
                TokenKind::Ident(Symbol::intern("x")),
                TokenKind::PlusEq,
                TokenKind::Int(1),
                TokenKind::Semicolon,
                TokenKind::Ident(Symbol::intern("y")),
                TokenKind::NotEq,
                TokenKind::Int(2),
                TokenKind::Semicolon,
                TokenKind::Ident(Symbol::intern("a")),
                TokenKind::LtEq,
                TokenKind::Ident(Symbol::intern("b")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(kinds("# a comment\n42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(lex("$").is_err());
    }
}
