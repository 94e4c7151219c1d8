use super::LexError;
use crate::tokenizer::{Span, Token};
use thiserror::Error;

/// Errors raised while assembling a single line of instruction text. Spans are
/// relative to the line handed to the assembler.
#[derive(Debug, Error, Clone, PartialEq, Eq,)]
pub enum AsmError {
  #[error("{0}")]
  Lex(#[from] LexError,),
  #[error("\x1b[93mUNKNOWN MNEMONIC:\x1b[0m '{mnemonic}' is not a supported instruction.")]
  UnknownMnemonic { mnemonic:String, span:Span, },
  #[error("\x1b[93mUNEXPECTED TOKEN:\x1b[0m Expected {expected}, found {}.", found.kind)]
  UnexpectedToken { expected:&'static str, found:Token, },
  #[error("\x1b[93mINVALID REGISTER:\x1b[0m '{found}' is not a register.")]
  InvalidRegister { found:String, span:Span, },
  #[error("\x1b[93mUNENCODABLE IMMEDIATE:\x1b[0m {value:#x} cannot be encoded as {form}.")]
  UnencodableImmediate {
    value:i64,
    form:&'static str,
    span:Span,
  },
  #[error("\x1b[93mBRANCH OUT OF RANGE:\x1b[0m {target:#010x} is out of reach of a branch at {origin:#010x}.")]
  BranchOutOfRange { target:u32, origin:u32, span:Span, },
  #[error("\x1b[93mMISALIGNED TARGET:\x1b[0m {target:#010x} is not word aligned.")]
  Misaligned { target:u32, span:Span, },
  #[error("\x1b[93mUNRESOLVED SYMBOL:\x1b[0m '{name}' is not defined.")]
  UnresolvedSymbol { name:String, span:Span, },
  #[error("\x1b[93mUNSUPPORTED:\x1b[0m {what} is not supported by this assembler.")]
  Unsupported { what:String, span:Span, },
}

impl AsmError {
  pub fn span(&self,) -> Span {
    match self {
      AsmError::Lex(err,) => err.span(),
      AsmError::UnknownMnemonic { span, .. } => *span,
      AsmError::UnexpectedToken { found, .. } => found.span,
      AsmError::InvalidRegister { span, .. } => *span,
      AsmError::UnencodableImmediate { span, .. } => *span,
      AsmError::BranchOutOfRange { span, .. } => *span,
      AsmError::Misaligned { span, .. } => *span,
      AsmError::UnresolvedSymbol { span, .. } => *span,
      AsmError::Unsupported { span, .. } => *span,
    }
  }
}
