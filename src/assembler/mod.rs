mod arm;
mod encoding;
mod registers;

pub use arm::ArmAssembler;
pub use registers::{register_list, Register};

use crate::{errors::AsmError, symbol_table::SymbolLookup};

/// Turns one line of instruction text into machine code.
pub trait Assembler {
  /// Assembles `text` as if it were placed at `origin`. Names resolve through
  /// `symbols`. Error spans are relative to `text`.
  fn assemble(&self, text:&str, origin:u32, symbols:&dyn SymbolLookup,) -> Result<Vec<u8,>, AsmError,>;
}
