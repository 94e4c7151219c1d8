use super::{AsmError, LexError};
use crate::src_file::SourceLoc;
use thiserror::Error;

/// Every way a splice build can fail. Each variant carries the location the
/// failure is reported at; secondary locations appear in the message.
#[derive(Debug, Error,)]
pub enum PatchError {
  #[error("{err}")]
  Lex { err:LexError, loc:SourceLoc, },
  #[error("\x1b[93mUNKNOWN REGION:\x1b[0m '{region}' is not a region of the image.")]
  UnknownRegion { region:String, loc:SourceLoc, },
  #[error("\x1b[93mDUPLICATE SYMBOL:\x1b[0m '{name}' is already defined at {first}.")]
  DuplicateSymbol {
    name:String,
    first:SourceLoc,
    loc:SourceLoc,
  },
  #[error("\x1b[93mSYMBOL OUT OF REGION:\x1b[0m '{name}' ({address:#010x}) does not lie inside region '{region}'.")]
  SymbolOutOfRegion {
    name:String,
    address:u32,
    region:String,
    loc:SourceLoc,
  },
  #[error("\x1b[93mUNRESOLVED SYMBOL:\x1b[0m '{name}' is not defined.")]
  UnresolvedSymbol { name:String, loc:SourceLoc, },
  #[error("\x1b[93mMALFORMED DIRECTIVE:\x1b[0m {reason}")]
  MalformedDirective { reason:String, loc:SourceLoc, },
  #[error("\x1b[93mASSEMBLY ERROR:\x1b[0m in '{text}': {err}")]
  Assembly {
    err:AsmError,
    text:String,
    loc:SourceLoc,
  },
  #[error("\x1b[93mOVERLAP:\x1b[0m {second} overlaps {first}.")]
  Overlap {
    first:String,
    second:String,
    loc:SourceLoc,
  },
  #[error("\x1b[93mOUT OF BOUNDS:\x1b[0m {what} does not fit inside region '{region}'.")]
  OutOfBounds {
    what:String,
    region:String,
    loc:SourceLoc,
  },
  #[error("\x1b[93mBUDGET EXCEEDED:\x1b[0m {size:#x} bytes do not fit the {budget:#x} byte slot in region '{region}'.")]
  BudgetExceeded {
    size:usize,
    budget:u32,
    region:String,
    loc:SourceLoc,
  },
  #[error("\x1b[93mINVALID HOOK:\x1b[0m '{hook}': {reason}")]
  InvalidHook {
    hook:String,
    reason:String,
    loc:SourceLoc,
  },
  #[error(
    "\x1b[93mHOOK MISMATCH:\x1b[0m '{hook}' expects {expected} at {address:#010x} but the image holds {found}."
  )]
  HookMismatch {
    hook:String,
    address:u32,
    expected:String,
    found:String,
    loc:SourceLoc,
  },
}

impl PatchError {
  pub fn loc(&self,) -> &SourceLoc {
    match self {
      PatchError::Lex { loc, .. } => loc,
      PatchError::UnknownRegion { loc, .. } => loc,
      PatchError::DuplicateSymbol { loc, .. } => loc,
      PatchError::SymbolOutOfRegion { loc, .. } => loc,
      PatchError::UnresolvedSymbol { loc, .. } => loc,
      PatchError::MalformedDirective { loc, .. } => loc,
      PatchError::Assembly { loc, .. } => loc,
      PatchError::Overlap { loc, .. } => loc,
      PatchError::OutOfBounds { loc, .. } => loc,
      PatchError::BudgetExceeded { loc, .. } => loc,
      PatchError::InvalidHook { loc, .. } => loc,
      PatchError::HookMismatch { loc, .. } => loc,
    }
  }

  pub(crate) fn malformed<S:Into<String,>,>(reason:S, loc:SourceLoc,) -> Self {
    PatchError::MalformedDirective {
      reason:reason.into(),
      loc,
    }
  }

  /// Converts an assembler failure on `text` into a build error. Unresolved
  /// symbols keep their own kind.
  pub(crate) fn from_asm(err:AsmError, text:&str, loc:SourceLoc,) -> Self {
    match err {
      AsmError::UnresolvedSymbol { name, .. } => PatchError::UnresolvedSymbol { name, loc, },
      AsmError::Lex(err,) => PatchError::Lex { err, loc, },
      err => PatchError::Assembly {
        err,
        text:text.to_string(),
        loc,
      },
    }
  }
}
