use crate::tokenizer::{Location, Span};
use eyre::{Result, WrapErr};
use std::{
  fmt::Display,
  fs,
  path::{Path, PathBuf},
};

#[derive(Debug, Clone,)]
// The path is optional because the input may not be a file (such as with
// tests).
pub struct SourceFile {
  src:String,
  // Needed so links to the file can print.
  path:Option<PathBuf,>,
}

impl SourceFile {
  /// Opens a new sourcefile from the given path.
  pub fn new_from_path<P:AsRef<Path,>,>(path:P,) -> Result<Self,> {
    let path = path.as_ref();
    let src = fs::read_to_string(path,).wrap_err_with(|| format!("failed to read {}", path.display()),)?;
    Ok(SourceFile {
      src,
      path:Some(path.to_path_buf(),),
    },)
  }

  /// Creates a new SourceFile from a string.
  pub fn new_from_raw<S:ToString,>(src:S,) -> Self {
    SourceFile {
      src:src.to_string(),
      path:None,
    }
  }

  /// Creates a new SourceFile from a string and the path it claims to come
  /// from.
  pub fn new_named<S:ToString, P:Into<PathBuf,>,>(src:S, path:P,) -> Self {
    SourceFile {
      src:src.to_string(),
      path:Some(path.into(),),
    }
  }

  /// Returns the source code as a string slice.
  pub fn source_str(&self,) -> &str {
    &self.src
  }

  pub fn path(&self,) -> &Option<PathBuf,> {
    &self.path
  }

  /// Returns line `ln` (1 based) without its line break.
  pub fn line(&self, ln:u32,) -> Option<&str,> {
    let idx = (ln as usize).checked_sub(1,)?;
    self.src.lines().nth(idx,)
  }

  /// Locates `span` inside this file.
  pub fn loc(&self, span:Span,) -> SourceLoc {
    SourceLoc {
      path:self.path.clone(),
      span,
    }
  }

  /// A location naming the file without pointing into it.
  pub fn file_loc(&self,) -> SourceLoc {
    self.loc(Span::default(),)
  }

  /// Finds the first line containing `needle` and returns a span covering the
  /// match. Used to point diagnostics at entries of structured files.
  pub fn find(&self, needle:&str,) -> Option<Span,> {
    let mut idx = 0;
    for (ln, line,) in self.src.split('\n',).enumerate() {
      if let Some(col,) = line.find(needle,) {
        let col = line[..col].chars().count() as u32 + 1;
        let len = needle.chars().count().max(1,) as u32;
        let ln = ln as u32 + 1;
        let start = Location {
          idx:idx + col - 1,
          ln,
          col,
        };
        let end = Location {
          idx:start.idx + len - 1,
          ln,
          col:col + len - 1,
        };
        return Some(Span { start, end, },);
      }
      idx += line.chars().count() as u32 + 1;
    }
    None
  }
}

/// A position inside a (possibly unnamed) source file.
#[derive(Debug, Clone, PartialEq, Eq, Default,)]
pub struct SourceLoc {
  pub path:Option<PathBuf,>,
  pub span:Span,
}

impl SourceLoc {
  /// Whether the location points at a line rather than only naming a file.
  pub fn has_position(&self,) -> bool {
    self.span.start.ln > 0
  }
}

impl Display for SourceLoc {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    match &self.path {
      Some(path,) => write!(f, "{}", path.display())?,
      None => write!(f, "<input>")?,
    }
    if self.has_position() {
      write!(f, ":{}", self.span.start)?;
    }
    Ok((),)
  }
}
