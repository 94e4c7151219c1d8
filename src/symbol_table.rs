use crate::{errors::PatchError, image::RegionTable, src_file::SourceLoc};
use std::collections::{BTreeMap, HashMap};

/// Anything the assembler and expression evaluator can resolve names
/// against.
pub trait SymbolLookup {
  fn lookup(&self, name:&str,) -> Option<u32,>;
}

impl SymbolLookup for HashMap<String, u32,> {
  fn lookup(&self, name:&str,) -> Option<u32,> {
    self.get(name,).copied()
  }
}

/// Layers local names (such as the labels of one stub) over another lookup.
pub struct ScopedLookup<'a,> {
  pub locals:&'a HashMap<String, u32,>,
  pub parent:&'a dyn SymbolLookup,
}

impl SymbolLookup for ScopedLookup<'_,> {
  fn lookup(&self, name:&str,) -> Option<u32,> {
    self.locals.get(name,).copied().or_else(|| self.parent.lookup(name,),)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Origin {
  /// `R_start` / `R_end` of every region.
  Builtin,
  /// Generated symbol tables, such as the ones a disassembly project emits.
  Auto,
  /// Hand written symbol tables.
  User,
  /// Trampoline stubs.
  Generated,
}

#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Symbol {
  pub name:String,
  pub region:String,
  pub address:u32,
  pub origin:Origin,
  pub loc:SourceLoc,
}

impl Symbol {
  pub fn new<N:Into<String,>, R:Into<String,>,>(name:N, region:R, address:u32, origin:Origin, loc:SourceLoc,) -> Self {
    Symbol {
      name:name.into(),
      region:region.into(),
      address,
      origin,
      loc,
    }
  }
}

/// Resolved name to address table. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct SymbolTable {
  symbols:BTreeMap<String, Symbol,>,
}

impl SymbolTable {
  pub fn new() -> Self {
    SymbolTable::default()
  }

  /// Merges the auto and user tables on top of the builtin region symbols.
  ///
  /// A user definition replaces an auto or builtin one of the same name. Two
  /// auto or two user definitions of one name are a [`PatchError::DuplicateSymbol`].
  pub fn resolve(auto:Vec<Symbol,>, user:Vec<Symbol,>, regions:&RegionTable,) -> Result<Self, PatchError,> {
    let mut table = SymbolTable::new();

    for region in regions.iter() {
      for (suffix, address,) in [("start", region.load_base,), ("end", region.end() as u32,),] {
        let name = format!("{}_{suffix}", region.name);
        let sym = Symbol::new(name.clone(), &region.name, address, Origin::Builtin, SourceLoc::default(),);
        table.symbols.insert(name, sym,);
      }
    }

    for sym in auto.into_iter().chain(user,) {
      table.check_region(&sym, regions,)?;
      match table.symbols.get(&sym.name,) {
        Some(existing,) if existing.origin == sym.origin => {
          return Err(PatchError::DuplicateSymbol {
            name:sym.name,
            first:existing.loc.clone(),
            loc:sym.loc,
          },);
        }
        Some(existing,) if existing.origin != Origin::Builtin => {
          log::debug!(
            "{} overrides '{}' ({:#010x} -> {:#010x}) from {}",
            sym.loc,
            sym.name,
            existing.address,
            sym.address,
            existing.loc
          );
        }
        _ => {}
      }
      table.symbols.insert(sym.name.clone(), sym,);
    }

    log::info!("Resolved {} symbols", table.len());
    Ok(table,)
  }

  fn check_region(&self, sym:&Symbol, regions:&RegionTable,) -> Result<(), PatchError,> {
    let region = regions.require(&sym.region, &sym.loc,)?;
    if !region.contains_address(sym.address,) {
      return Err(PatchError::SymbolOutOfRegion {
        name:sym.name.clone(),
        address:sym.address,
        region:sym.region.clone(),
        loc:sym.loc.clone(),
      },);
    }
    Ok((),)
  }

  /// Adds a generated symbol. Generated symbols never replace an existing
  /// name.
  pub fn insert_generated(&mut self, sym:Symbol,) -> Result<(), PatchError,> {
    if let Some(existing,) = self.symbols.get(&sym.name,) {
      return Err(PatchError::DuplicateSymbol {
        name:sym.name,
        first:existing.loc.clone(),
        loc:sym.loc,
      },);
    }
    log::debug!("Generated symbol '{}' at {:#010x}", sym.name, sym.address);
    self.symbols.insert(sym.name.clone(), sym,);
    Ok((),)
  }

  pub fn get(&self, name:&str,) -> Option<&Symbol,> {
    self.symbols.get(name,)
  }

  pub fn address(&self, name:&str,) -> Option<u32,> {
    self.get(name,).map(|sym| sym.address,)
  }

  pub fn contains(&self, name:&str,) -> bool {
    self.symbols.contains_key(name,)
  }

  /// Iterates in name order.
  pub fn iter(&self,) -> impl Iterator<Item = &Symbol,> {
    self.symbols.values()
  }

  pub fn len(&self,) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.symbols.is_empty()
  }

  /// Renders every non builtin symbol in symbol file format, grouped by region
  /// and sorted by address.
  pub fn listing(&self,) -> String {
    let mut by_region:BTreeMap<&str, Vec<&Symbol,>,> = BTreeMap::new();
    for sym in self.iter().filter(|sym| sym.origin != Origin::Builtin,) {
      by_region.entry(&sym.region,).or_default().push(sym,);
    }

    let mut out = String::new();
    for (region, mut syms,) in by_region {
      syms.sort_by(|a, b| a.address.cmp(&b.address,).then_with(|| a.name.cmp(&b.name,),),);
      if !out.is_empty() {
        out.push('\n',);
      }
      out.push_str(&format!("/* !region {region} */\n"),);
      for sym in syms {
        out.push_str(&format!("{} = {:#010x};\n", sym.name, sym.address),);
      }
    }
    out
  }
}

impl SymbolLookup for SymbolTable {
  fn lookup(&self, name:&str,) -> Option<u32,> {
    self.address(name,)
  }
}
