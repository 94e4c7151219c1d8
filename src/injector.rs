use crate::{
  errors::PatchError, image_patcher::PatchedImage, src_file::SourceLoc, symbol_table::SymbolTable,
};
use serde::Deserialize;

/// Reserved area of a region that receives the compiled blob.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize,)]
pub struct InjectionSlot {
  pub region:String,
  /// Load address of the first byte of the slot.
  pub address:u32,
  /// Maximum number of bytes the slot accepts.
  pub budget:u32,
}

const INIT_ARRAY_START:&str = "__init_array_start";
const INIT_ARRAY_END:&str = "__init_array_end";

/// Copies `blob` into the slot and updates the loader metadata of the slot's
/// region.
///
/// The blob may not exceed the budget or touch a span already written by the
/// image patcher. The image grows with zeroes when the slot reaches past its
/// end. `symbols` supplies `__init_array_start` / `__init_array_end`.
pub fn inject(
  mut patched:PatchedImage,
  blob:&[u8],
  slot:&InjectionSlot,
  symbols:&SymbolTable,
  loc:&SourceLoc,
) -> Result<PatchedImage, PatchError,> {
  let region = patched.image().regions().require(&slot.region, loc,)?.clone();

  if !region.contains_range(slot.address, slot.budget as usize,) {
    return Err(PatchError::OutOfBounds {
      what:format!(
        "the slot {:#010x}..{:#010x}",
        slot.address,
        slot.address as u64 + slot.budget as u64
      ),
      region:slot.region.clone(),
      loc:loc.clone(),
    },);
  }

  if blob.len() > slot.budget as usize {
    return Err(PatchError::BudgetExceeded {
      size:blob.len(),
      budget:slot.budget,
      region:slot.region.clone(),
      loc:loc.clone(),
    },);
  }

  let span = region.file_span(slot.address, blob.len(),);
  if let Some(clash,) = patched.written().iter().find(|written| written.span.intersects(&span,),) {
    return Err(PatchError::Overlap {
      first:clash.label.clone(),
      second:format!("the injected blob (file bytes {span})"),
      loc:loc.clone(),
    },);
  }

  let bytes = patched.image_mut().bytes_mut();
  if bytes.len() < span.end {
    log::debug!("Growing the image from {:#x} to {:#x} bytes", bytes.len(), span.end);
    bytes.resize(span.end, 0,);
  }
  bytes[span.start..span.end].copy_from_slice(blob,);

  update_metadata(&mut patched, slot, blob.len(), symbols,);
  patched.record(span, format!("the injected blob (file bytes {span})"),);

  log::info!(
    "Injected {:#x} of {:#x} bytes into '{}' at {:#010x}",
    blob.len(),
    slot.budget,
    slot.region,
    slot.address
  );
  Ok(patched,)
}

fn update_metadata(patched:&mut PatchedImage, slot:&InjectionSlot, len:usize, symbols:&SymbolTable,) {
  let Some(region,) = patched.image_mut().regions_mut().get_mut(&slot.region,)
  else {
    return;
  };

  match (symbols.address(INIT_ARRAY_START,), symbols.address(INIT_ARRAY_END,),) {
    (Some(start,), Some(end,),) => {
      region.static_init_start = Some(start,);
      region.static_init_end = Some(end,);
    }
    _ => log::debug!("No static initializers in the blob"),
  }
  // .bss is part of the blob
  region.bss_size = Some(0,);
  region.loaded_size = Some(slot.address - region.load_base + len as u32,);
}
