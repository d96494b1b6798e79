//! verifier-lex - Lexical analysis for the verifier's surface syntax.
//!
//! Transforms source text into a stream of [`Token`]s consumed by
//! `verifier-parse`. Whitespace and `#`-comments are discarded; every other
//! lexeme becomes a token carrying its source [`Span`](verifier_util::Span).

pub mod cursor;
pub mod lexer;
pub mod token;

pub use lexer::{lex, LexError, LexResult};
pub use token::{Token, TokenKind};
