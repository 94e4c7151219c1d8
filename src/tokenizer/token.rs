use std::fmt::{Debug, Display};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default,)]
pub struct Span {
  /// The line and col the span begins.
  pub start:Location,
  /// The line and col the span ends.
  pub end:Location,
}

impl Span {
  pub fn new(start:[u32; 3], end:[u32; 3],) -> Self {
    Span {
      start:Location {
        idx:start[0],
        ln:start[1],
        col:start[2],
      },
      end:Location {
        idx:end[0],
        ln:end[1],
        col:end[2],
      },
    }
  }

  pub fn from_single_char(loc:Location,) -> Self {
    Self { start:loc, end:loc, }
  }

  /// Joins two spans into one covering both.
  pub fn to(self, other:Span,) -> Span {
    Span {
      start:self.start,
      end:other.end,
    }
  }

  /// Re-bases a span lexed from a fragment whose first character sits at
  /// `ln`:`col` of the enclosing file.
  pub fn relative_to(self, ln:u32, col:u32,) -> Span {
    Span {
      start:self.start.relative_to(ln, col,),
      end:self.end.relative_to(ln, col,),
    }
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default,)]
pub struct Location {
  /// Index in the source string corresponding to this location
  pub idx:u32,
  pub ln:u32,
  pub col:u32,
}

impl Location {
  fn relative_to(self, ln:u32, col:u32,) -> Location {
    // Only the first line of a fragment is shifted horizontally
    let new_col = if self.ln <= 1 { self.col + col - 1 } else { self.col };
    Location {
      idx:self.idx,
      ln:self.ln + ln - 1,
      col:new_col,
    }
  }
}

impl Display for Location {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    write!(f, "{}:{}", self.ln, self.col)
  }
}

#[derive(PartialEq, Eq, Clone,)]
pub enum TokenKind {
  LCurlyBracket,
  RCurlyBracket,
  LBracket,
  RBracket,
  Comma,
  Colon,
  Semicolon,
  Plus,
  Minus,
  EqualSign,
  Hash,
  Bang,
  Num(i64,),
  Identifier(String,),
  /// A `/* !name arg */` or `// !name arg` comment.
  Pragma { name:String, arg:String, },
  Eof,
}

impl Debug for TokenKind {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    Display::fmt(&self, f,)
  }
}

impl Display for TokenKind {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    match self {
      Self::LCurlyBracket => write!(f, "'{{'"),
      Self::RCurlyBracket => write!(f, "'}}'"),
      Self::LBracket => write!(f, "'['"),
      Self::RBracket => write!(f, "']'"),
      Self::Comma => write!(f, "','"),
      Self::Colon => write!(f, "':'"),
      Self::Semicolon => write!(f, "';'"),
      Self::Plus => write!(f, "'+'"),
      Self::Minus => write!(f, "'-'"),
      Self::EqualSign => write!(f, "'='"),
      Self::Hash => write!(f, "'#'"),
      Self::Bang => write!(f, "'!'"),
      Self::Num(arg0,) => write!(f, "Num({arg0})"),
      Self::Identifier(arg0,) => write!(f, "Identifier({arg0})"),
      Self::Pragma { name, arg, } => write!(f, "Pragma(!{name} {arg})"),
      Self::Eof => write!(f, "end of input"),
    }
  }
}

#[derive(Debug, PartialEq, Eq, Clone,)]
pub struct Token {
  pub kind:TokenKind,
  pub span:Span,
}

impl Token {
  /// Returns the name of an [`TokenKind::Identifier`].
  pub fn ident(&self,) -> Option<&str,> {
    match &self.kind {
      TokenKind::Identifier(name,) => Some(name,),
      _ => None,
    }
  }

  /// Returns the value of a [`TokenKind::Num`].
  pub fn num(&self,) -> Option<i64,> {
    match self.kind {
      TokenKind::Num(val,) => Some(val,),
      _ => None,
    }
  }
}
