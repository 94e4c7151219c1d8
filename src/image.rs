use crate::{errors::PatchError, patch::ByteSpan, src_file::SourceLoc};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// A named, contiguous part of the image that is loaded at a fixed address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct ImageRegion {
  pub name:String,
  /// Address the region is loaded to.
  pub load_base:u32,
  /// Offset of the region's first byte inside the image file.
  pub file_base:u32,
  pub length:u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub static_init_start:Option<u32,>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub static_init_end:Option<u32,>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bss_size:Option<u32,>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub loaded_size:Option<u32,>,
}

impl ImageRegion {
  pub fn new<S:Into<String,>,>(name:S, load_base:u32, file_base:u32, length:u32,) -> Self {
    ImageRegion {
      name:name.into(),
      load_base,
      file_base,
      length,
      static_init_start:None,
      static_init_end:None,
      bss_size:None,
      loaded_size:None,
    }
  }

  /// One past the last address of the region.
  pub fn end(&self,) -> u64 {
    self.load_base as u64 + self.length as u64
  }

  pub fn contains_address(&self, address:u32,) -> bool {
    address >= self.load_base && (address as u64) < self.end()
  }

  /// Whether `len` bytes starting at `address` all lie inside the region.
  pub fn contains_range(&self, address:u32, len:usize,) -> bool {
    address >= self.load_base && address as u64 + len as u64 <= self.end()
  }

  /// Translates a region address into a file offset. The address must lie
  /// inside the region.
  pub fn file_offset(&self, address:u32,) -> usize {
    self.file_base as usize + (address - self.load_base) as usize
  }

  /// File span covering `len` bytes at `address`.
  pub fn file_span(&self, address:u32, len:usize,) -> ByteSpan {
    let start = self.file_offset(address,);
    ByteSpan { start, end:start + len, }
  }
}

/// The regions of an image, in declaration order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize,)]
pub struct RegionTable {
  #[serde(rename = "region", default)]
  regions:Vec<ImageRegion,>,
}

impl RegionTable {
  /// Builds the table. A region name given twice or a region reaching past
  /// 4 GiB is reported at `loc`.
  pub fn new(regions:Vec<ImageRegion,>, loc:&SourceLoc,) -> Result<Self, PatchError,> {
    for (idx, region,) in regions.iter().enumerate() {
      // `{name}_end` must be an address too
      if region.end() > u32::MAX as u64 {
        return Err(PatchError::malformed(
          format!("region '{}' reaches past the end of the 32 bit address space", region.name),
          loc.clone(),
        ),);
      }
      if regions[..idx].iter().any(|other| other.name == region.name,) {
        return Err(PatchError::malformed(
          format!("region '{}' is declared more than once", region.name),
          loc.clone(),
        ),);
      }
    }
    Ok(RegionTable { regions, },)
  }

  pub fn get(&self, name:&str,) -> Option<&ImageRegion,> {
    self.regions.iter().find(|region| region.name == name,)
  }

  pub(crate) fn get_mut(&mut self, name:&str,) -> Option<&mut ImageRegion,> {
    self.regions.iter_mut().find(|region| region.name == name,)
  }

  /// Like [`RegionTable::get`] but reports a missing region at `loc`.
  pub fn require(&self, name:&str, loc:&SourceLoc,) -> Result<&ImageRegion, PatchError,> {
    self.get(name,).ok_or_else(|| PatchError::UnknownRegion {
      region:name.to_string(),
      loc:loc.clone(),
    },)
  }

  pub fn iter(&self,) -> impl Iterator<Item = &ImageRegion,> {
    self.regions.iter()
  }

  pub fn len(&self,) -> usize {
    self.regions.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.regions.is_empty()
  }

  /// Renders the table as the region manifest written next to the output.
  pub fn manifest(&self,) -> Result<String,> {
    toml::to_string(self,).wrap_err("failed to serialize the region manifest",)
  }
}

/// A binary image together with the regions that describe it.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Image {
  bytes:Vec<u8,>,
  regions:RegionTable,
}

impl Image {
  pub fn new(bytes:Vec<u8,>, regions:RegionTable,) -> Self {
    Image { bytes, regions, }
  }

  pub fn from_file<P:AsRef<Path,>,>(path:P, regions:RegionTable,) -> Result<Self,> {
    let path = path.as_ref();
    let bytes = fs::read(path,).wrap_err_with(|| format!("failed to read image {}", path.display()),)?;
    log::info!("Loaded {} byte image from {}", bytes.len(), path.display());
    Ok(Image::new(bytes, regions,),)
  }

  pub fn bytes(&self,) -> &[u8] {
    &self.bytes
  }

  pub fn regions(&self,) -> &RegionTable {
    &self.regions
  }

  pub fn len(&self,) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.bytes.is_empty()
  }

  /// Reads `len` bytes at `address` of `region`. Returns `None` when the range
  /// leaves the region or the file.
  pub fn read(&self, region:&str, address:u32, len:usize,) -> Option<&[u8],> {
    let region = self.regions.get(region,)?;
    if !region.contains_range(address, len,) {
      return None;
    }
    let span = region.file_span(address, len,);
    self.bytes.get(span.start..span.end,)
  }

  pub(crate) fn bytes_mut(&mut self,) -> &mut Vec<u8,> {
    &mut self.bytes
  }

  pub(crate) fn regions_mut(&mut self,) -> &mut RegionTable {
    &mut self.regions
  }
}
