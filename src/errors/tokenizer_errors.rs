use crate::tokenizer::Span;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq,)]
pub enum LexError {
  #[error("\x1b[93mUNRECOGNIZED TOKEN:\x1b[0m '{token}' is not a legal token.")]
  UnrecognizedToken { token:String, span:Span, },
  #[error("\x1b[93mUNTERMINATED COMMENT:\x1b[0m This block comment is never closed.")]
  UnterminatedComment { span:Span, },
}

impl LexError {
  pub fn span(&self,) -> Span {
    match self {
      LexError::UnrecognizedToken { span, .. } => *span,
      LexError::UnterminatedComment { span, } => *span,
    }
  }
}
