use crate::{
  errors::PatchError,
  image::Image,
  patch::{ByteSpan, PatchOperation},
};

/// A file span written by a stage, with a description for overlap reports.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct WrittenSpan {
  pub span:ByteSpan,
  pub label:String,
}

/// An image together with every span written to it so far.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PatchedImage {
  image:Image,
  written:Vec<WrittenSpan,>,
}

impl PatchedImage {
  /// Wraps an image nothing has been written to.
  pub fn pristine(image:Image,) -> Self {
    PatchedImage {
      image,
      written:Vec::new(),
    }
  }

  pub fn image(&self,) -> &Image {
    &self.image
  }

  pub fn into_image(self,) -> Image {
    self.image
  }

  pub fn written(&self,) -> &[WrittenSpan] {
    &self.written
  }

  pub(crate) fn image_mut(&mut self,) -> &mut Image {
    &mut self.image
  }

  pub(crate) fn record(&mut self, span:ByteSpan, label:String,) {
    self.written.push(WrittenSpan { span, label, },);
  }
}

/// Where one operation lands in the file.
struct Placement {
  span:ByteSpan,
  op:usize,
}

/// Writes every operation into the image.
///
/// Every operation is validated first (region, bounds, overlap); if any check
/// fails nothing is written. Operations that do not overlap commute, so the
/// result does not depend on their order.
pub fn apply(image:Image, operations:&[PatchOperation],) -> Result<PatchedImage, PatchError,> {
  let mut placements = Vec::with_capacity(operations.len(),);

  for (idx, op,) in operations.iter().enumerate() {
    let region = image.regions().require(&op.region, &op.loc,)?;
    if !region.contains_range(op.address, op.len(),) {
      return Err(PatchError::OutOfBounds {
        what:op.describe(),
        region:op.region.clone(),
        loc:op.loc.clone(),
      },);
    }
    let span = region.file_span(op.address, op.len(),);
    if span.end > image.len() {
      return Err(PatchError::OutOfBounds {
        what:format!("{} (file bytes {span} past the end of the image)", op.describe()),
        region:op.region.clone(),
        loc:op.loc.clone(),
      },);
    }
    if !span.is_empty() {
      placements.push(Placement { span, op:idx, },);
    }
  }

  check_overlaps(&mut placements, operations,)?;

  let unchanged = placements
    .iter()
    .all(|placement| image.bytes()[placement.span.start..placement.span.end] == operations[placement.op].bytes[..],);
  if unchanged && !placements.is_empty() {
    // Either a rerun on patched output or patches that pin existing bytes.
    // Hooked images are caught earlier by their replay check.
    log::warn!("Every patch operation matches the image already; nothing changes");
  }

  let mut patched = PatchedImage::pristine(image,);
  for placement in &placements {
    let op = &operations[placement.op];
    patched.image_mut().bytes_mut()[placement.span.start..placement.span.end].copy_from_slice(&op.bytes,);
    log::debug!("Patched {} at file {}", op.describe(), placement.span);
    patched.record(placement.span, op.describe(),);
  }

  log::info!("Applied {} patch operations", placements.len());
  Ok(patched,)
}

/// Sorts by start offset and reports the first pair of intersecting spans.
fn check_overlaps(placements:&mut [Placement], operations:&[PatchOperation],) -> Result<(), PatchError,> {
  placements.sort_by_key(|placement| (placement.span.start, placement.op,),);

  // The placement reaching furthest so far
  let mut furthest:Option<&Placement,> = None;
  for placement in placements.iter() {
    if let Some(prev,) = furthest {
      if prev.span.intersects(&placement.span,) {
        let (first, second,) = if prev.op < placement.op {
          (&operations[prev.op], &operations[placement.op],)
        }
        else {
          (&operations[placement.op], &operations[prev.op],)
        };
        return Err(PatchError::Overlap {
          first:first.describe(),
          second:second.describe(),
          loc:second.loc.clone(),
        },);
      }
      if placement.span.end <= prev.span.end {
        continue;
      }
    }
    furthest = Some(placement,);
  }
  Ok((),)
}
