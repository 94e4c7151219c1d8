mod cursor;
mod token;
mod tokenizer;

pub(crate) use cursor::TokenCursor;
pub use token::{Location, Span, Token, TokenKind};
pub(crate) use tokenizer::Lexer;
