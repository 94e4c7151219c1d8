//! Stubs generated from [`HookContract`]s.

mod contract;
mod synth;

pub use contract::{ArgSource, Divert, Filter, HookContract, MAX_ARGS};
pub use synth::{StubLine, Trampoline};

use crate::{
  assembler::Assembler,
  errors::PatchError,
  expression::{to_u32, Expr},
  image::Image,
  patch::PatchOperation,
  src_file::{SourceFile, SourceLoc},
  symbol_table::{Origin, Symbol, SymbolTable},
};
use std::collections::BTreeSet;

/// A stub placed in the injection slot.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PlacedStub {
  pub trampoline:Trampoline,
  pub address:u32,
  pub size:usize,
}

/// Every stub of a build, assembled back to back.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct StubLayout {
  pub stubs:Vec<PlacedStub,>,
  /// Machine code of all stubs, starting at the layout's base address.
  pub bytes:Vec<u8,>,
  /// The `b <stub>` written over each hook point.
  pub install:Vec<PatchOperation,>,
}

impl StubLayout {
  /// Assembly text of every stub.
  pub fn source(&self,) -> String {
    self
      .stubs
      .iter()
      .map(|stub| format!("// placed at {:#010x}\n{}", stub.address, stub.trampoline.source()),)
      .collect::<Vec<_,>>()
      .join("\n",)
  }
}

/// Where the stubs go.
#[derive(Debug, Clone, Copy,)]
pub struct StubPlacement<'a,> {
  /// Region of the injection slot.
  pub region:&'a str,
  /// Address of the first stub.
  pub base:u32,
}

/// Builds the stubs of every enabled contract.
///
/// A contract with a `feature` is built when the feature is one of `defines`
/// or a symbol. Each hook point is checked against the pristine `image`, stub
/// names are added to `symbols` and an install operation is produced per hook.
pub fn build_stubs(
  contracts:&[HookContract],
  image:&Image,
  symbols:&mut SymbolTable,
  placement:StubPlacement,
  defines:&BTreeSet<String,>,
  assembler:&dyn Assembler,
  config:&SourceFile,
) -> Result<StubLayout, PatchError,> {
  let mut layout = StubLayout::default();
  let mut cursor = align4(placement.base,);

  for contract in contracts {
    let loc = contract_loc(contract, config,);
    if !contract.enabled(|name| defines.contains(name,) || symbols.contains(name,),) {
      log::info!("Skipping hook '{}': feature is not defined", contract.name);
      continue;
    }
    contract.validate(&loc,)?;

    let hook_address = hook_address(contract, image, symbols, &loc,)?;
    check_replay(contract, hook_address, image, symbols, assembler, &loc,)?;
    if symbols.address(&contract.dispatch,).is_none() {
      return Err(PatchError::UnresolvedSymbol {
        name:contract.dispatch.clone(),
        loc,
      },);
    }

    let trampoline = Trampoline::synthesize(contract, hook_address, &loc,);
    let code = trampoline.assemble(cursor, assembler, symbols,)?;
    symbols.insert_generated(Symbol::new(
      &contract.name,
      placement.region,
      cursor,
      Origin::Generated,
      loc.clone(),
    ),)?;

    let install = assembler
      .assemble(&format!("b {cursor:#x}"), hook_address, symbols,)
      .map_err(|err| PatchError::from_asm(err, &contract.hook, loc.clone(),),)?;
    layout.install.push(PatchOperation {
      target:contract.hook.clone(),
      region:contract.region.clone(),
      address:hook_address,
      bytes:install,
      loc:loc.clone(),
    },);

    log::debug!(
      "Stub '{}' for {:#010x} placed at {cursor:#010x} ({} bytes)",
      contract.name,
      hook_address,
      code.len()
    );

    // Stubs are laid out back to back from the slot's base
    let offset = (cursor - align4(placement.base,)) as usize;
    layout.bytes.resize(offset, 0,);
    layout.bytes.extend_from_slice(&code,);
    layout.stubs.push(PlacedStub {
      trampoline,
      address:cursor,
      size:code.len(),
    },);
    cursor = align4(cursor + code.len() as u32,);
  }

  log::info!("Generated {} trampolines", layout.stubs.len());
  Ok(layout,)
}

fn align4(address:u32,) -> u32 {
  (address + 3) & !3
}

/// Points at the contract's `name = "..."` line of the configuration.
fn contract_loc(contract:&HookContract, config:&SourceFile,) -> SourceLoc {
  config
    .find(&format!("\"{}\"", contract.name),)
    .map(|span| config.loc(span,),)
    .unwrap_or_else(|| config.file_loc(),)
}

fn hook_address(contract:&HookContract, image:&Image, symbols:&SymbolTable, loc:&SourceLoc,) -> Result<u32, PatchError,> {
  let invalid = |reason:String| PatchError::InvalidHook {
    hook:contract.name.clone(),
    reason,
    loc:loc.clone(),
  };

  let expr = Expr::parse_str(&contract.hook,)
    .ok_or_else(|| invalid(format!("'{}' is not an address expression", contract.hook),),)?;
  let value = expr.evaluate(symbols,).map_err(|(name, _,)| PatchError::UnresolvedSymbol {
    name,
    loc:loc.clone(),
  },)?;
  let address = to_u32(value,).ok_or_else(|| invalid(format!("'{}' is not a 32 bit address", contract.hook),),)?;

  let region = image.regions().require(&contract.region, loc,)?;
  if !region.contains_range(address, 4,) {
    return Err(PatchError::OutOfBounds {
      what:format!("hook point {address:#010x}"),
      region:contract.region.clone(),
      loc:loc.clone(),
    },);
  }
  if let Some(sym,) = expr.base_symbol().and_then(|name| symbols.get(name,),) {
    if sym.region != contract.region {
      return Err(invalid(format!("'{}' belongs to region '{}'", sym.name, sym.region),),);
    }
  }
  if let Divert::Branch(target,) = &contract.divert {
    let divert = Expr::parse_str(target,).ok_or_else(|| invalid(format!("'{target}' is not an address expression"),),)?;
    divert.evaluate(symbols,).map_err(|(name, _,)| PatchError::UnresolvedSymbol {
      name,
      loc:loc.clone(),
    },)?;
  }
  Ok(address,)
}

/// The replay must be exactly the four bytes the install branch displaces.
fn check_replay(
  contract:&HookContract,
  hook_address:u32,
  image:&Image,
  symbols:&SymbolTable,
  assembler:&dyn Assembler,
  loc:&SourceLoc,
) -> Result<(), PatchError,> {
  let mut expected = Vec::new();
  for line in &contract.replay {
    let address = hook_address.wrapping_add(expected.len() as u32,);
    let code = assembler
      .assemble(line.trim(), address, symbols,)
      .map_err(|err| PatchError::from_asm(err, line, loc.clone(),),)?;
    // `ldr rX, label` is re-assembled against the stub's own address
    let label_form = !line.contains('[',);
    let mut words = code.chunks_exact(4,).map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]],),);
    if words.any(|word| reads_pc(word, label_form,),) {
      return Err(PatchError::InvalidHook {
        hook:contract.name.clone(),
        reason:format!("'{}' reads the pc and would see a different value in the stub", line.trim()),
        loc:loc.clone(),
      },);
    }
    expected.extend_from_slice(&code,);
  }

  if expected.len() != 4 {
    return Err(PatchError::InvalidHook {
      hook:contract.name.clone(),
      reason:format!("the replay assembles to {} bytes instead of 4", expected.len()),
      loc:loc.clone(),
    },);
  }

  let found = image.read(&contract.region, hook_address, 4,).unwrap_or_default();
  if found != expected.as_slice() {
    return Err(PatchError::HookMismatch {
      hook:contract.name.clone(),
      address:hook_address,
      expected:hex(&expected,),
      found:hex(found,),
      loc:loc.clone(),
    },);
  }
  Ok((),)
}

/// Whether `word` uses the pc as a source operand, base or stored value.
/// Branches and writes to the pc are position independent once re-assembled.
fn reads_pc(word:u32, label_form:bool,) -> bool {
  let is_pc = |shift:u32| (word >> shift) & 0xF == 15;
  let load = word & (1 << 20) != 0;

  // bx, blx
  if word & 0x0FFF_FFD0 == 0x012F_FF10 {
    return is_pc(0,);
  }
  match (word >> 25) & 0x7 {
    0b100 => is_pc(16,) || (!load && word & 0x8000 != 0),
    0b010 | 0b011 => {
      let register_offset = word & (1 << 25) != 0;
      (is_pc(16,) && !label_form) || (register_offset && is_pc(0,)) || (!load && is_pc(12,))
    }
    0b000 | 0b001 => {
      if word & 0x0FC0_00F0 == 0x0000_0090 {
        return is_pc(0,) || is_pc(8,) || is_pc(12,) || is_pc(16,);
      }
      if word & 0x0E00_0090 == 0x0000_0090 && word & 0x60 != 0 {
        let register_offset = word & (1 << 22) == 0;
        return (is_pc(16,) && !label_form) || (register_offset && is_pc(0,)) || (!load && is_pc(12,));
      }
      let op = (word >> 21) & 0xF;
      let immediate = word & (1 << 25) != 0;
      // mov and mvn have no first operand
      let uses_rn = op != 0xD && op != 0xF;
      (uses_rn && is_pc(16,)) || (!immediate && (is_pc(0,) || (word & 0x10 != 0 && is_pc(8,))))
    }
    _ => false,
  }
}

fn hex(bytes:&[u8],) -> String {
  if bytes.is_empty() {
    return "nothing".to_string();
  }
  bytes.iter().map(|byte| format!("{byte:02x}"),).collect::<Vec<_,>>().join(" ",)
}
