use crate::src_file::SourceLoc;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord,)]
/// A replacement for [`Range`](std::ops::Range) which implements [`Copy`].
/// Used for byte ranges of the image file.
pub struct ByteSpan {
  /// The lower bound of the range (inclusive).
  pub start:usize,
  /// The upper bound of the range (exclusive).
  pub end:usize,
}

impl ByteSpan {
  pub fn len(&self,) -> usize {
    self.end - self.start
  }

  pub fn is_empty(&self,) -> bool {
    self.end <= self.start
  }

  /// Whether the spans share at least one byte.
  pub fn intersects(&self, other:&ByteSpan,) -> bool {
    !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
  }
}

impl Display for ByteSpan {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    write!(f, "{:#x}..{:#x}", self.start, self.end)
  }
}

/// Assembled bytes destined for one address of the image.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PatchOperation {
  /// The target as written, e.g. `HasLowHealth+4`.
  pub target:String,
  pub region:String,
  pub address:u32,
  pub bytes:Vec<u8,>,
  pub loc:SourceLoc,
}

impl PatchOperation {
  pub fn len(&self,) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.bytes.is_empty()
  }

  /// A description naming the target, its address range and where it was
  /// written. Used in overlap reports.
  pub fn describe(&self,) -> String {
    format!(
      "'{}' ({:#010x}..{:#010x} in {}) at {}",
      self.target,
      self.address,
      self.address as u64 + self.len() as u64,
      self.region,
      self.loc
    )
  }
}
