use super::{
  encoding::{rotated_immediate, BlockMode, Condition, DpOp, MemSize, Mnemonic, ShiftKind},
  Assembler, Register,
};
use crate::{
  errors::AsmError,
  expression::{to_u32, Expr},
  symbol_table::SymbolLookup,
  tokenizer::{Lexer, Span, Token, TokenCursor, TokenKind},
};

/// Built-in backend for the ARMv5TE A32 instructions hook patches and
/// trampolines use: data processing, multiplies, branches, single and multiple
/// loads/stores, `swi`, `nop` and the `.word`/`.hword`/`.byte` directives.
///
/// Literal pools (`ldr rX, =value`) are not supported.
#[derive(Debug, Clone, Copy, Default,)]
pub struct ArmAssembler;

impl Assembler for ArmAssembler {
  fn assemble(&self, text:&str, origin:u32, symbols:&dyn SymbolLookup,) -> Result<Vec<u8,>, AsmError,> {
    let tokens = Lexer::new(text,).tokenize()?;
    let mut line = Line {
      cursor:TokenCursor::new(tokens,),
      origin,
      symbols,
    };
    line.assemble()
  }
}

/// Operand parser for one line of instruction text.
struct Line<'a,> {
  cursor:TokenCursor,
  origin:u32,
  symbols:&'a dyn SymbolLookup,
}

enum Operand2 {
  Immediate { value:u32, span:Span, },
  Register(u32,),
}

enum Offset {
  Immediate(u32,),
  Register { rm:Register, shift:u32, },
}

struct Address {
  rn:Register,
  pre_indexed:bool,
  writeback:bool,
  up:bool,
  offset:Offset,
  span:Span,
}

impl<'a,> Line<'a,> {
  fn assemble(&mut self,) -> Result<Vec<u8,>, AsmError,> {
    let token = self.cursor.next_token();
    let Some(name,) = token.ident()
    else {
      return Err(AsmError::UnexpectedToken {
        expected:"a mnemonic",
        found:token,
      },);
    };
    let Some(mnemonic,) = Mnemonic::parse(name,)
    else {
      return Err(AsmError::UnknownMnemonic {
        mnemonic:name.to_string(),
        span:token.span,
      },);
    };

    let word = match mnemonic {
      Mnemonic::Data { width, } => {
        let bytes = self.data(width,)?;
        self.finish()?;
        return Ok(bytes,);
      }
      Mnemonic::DataProcessing { op, cond, set_flags, } => self.data_processing(op, cond, set_flags,)?,
      Mnemonic::Shift { kind, cond, set_flags, } => self.shift(kind, cond, set_flags,)?,
      Mnemonic::Multiply {
        accumulate,
        cond,
        set_flags,
      } => self.multiply(accumulate, cond, set_flags,)?,
      Mnemonic::Branch { link, cond, } => self.branch(link, cond,)?,
      Mnemonic::BranchExchange { link, cond, } => self.branch_exchange(link, cond,)?,
      Mnemonic::Memory { load, size, cond, } => self.memory(load, size, cond,)?,
      Mnemonic::Block { load, mode, cond, } => self.block(load, mode, cond,)?,
      Mnemonic::Push { cond, } => {
        let list = self.register_list()?;
        cond.bits() | 0x092D_0000 | list
      }
      Mnemonic::Pop { cond, } => {
        let list = self.register_list()?;
        cond.bits() | 0x08BD_0000 | list
      }
      Mnemonic::Swi { cond, } => {
        self.cursor.eat(&TokenKind::Hash,);
        let (value, span,) = self.expr()?;
        if !(0..=0xFF_FFFF).contains(&value,) {
          return Err(AsmError::UnencodableImmediate {
            value,
            form:"a 24 bit comment field",
            span,
          },);
        }
        cond.bits() | 0x0F00_0000 | value as u32
      }
      // mov r0, r0
      Mnemonic::Nop { cond, } => cond.bits() | 0x01A0_0000,
    };

    self.finish()?;
    Ok(word.to_le_bytes().to_vec(),)
  }

  fn finish(&mut self,) -> Result<(), AsmError,> {
    if self.cursor.at_end() {
      Ok((),)
    }
    else {
      Err(AsmError::UnexpectedToken {
        expected:"the end of the instruction",
        found:self.cursor.peek().clone(),
      },)
    }
  }

  fn expect(&mut self, kind:TokenKind, expected:&'static str,) -> Result<Token, AsmError,> {
    self
      .cursor
      .expect(&kind,)
      .map_err(|found| AsmError::UnexpectedToken { expected, found, },)
  }

  fn comma(&mut self,) -> Result<(), AsmError,> {
    self.expect(TokenKind::Comma, "','",).map(|_| (),)
  }

  fn register(&mut self,) -> Result<Register, AsmError,> {
    let token = self.cursor.next_token();
    match token.ident() {
      Some(name,) => Register::parse(name,).ok_or_else(|| AsmError::InvalidRegister {
        found:name.to_string(),
        span:token.span,
      },),
      None => Err(AsmError::UnexpectedToken {
        expected:"a register",
        found:token,
      },),
    }
  }

  /// Whether the next token names a register.
  fn at_register(&self,) -> bool {
    self.cursor.peek().ident().and_then(Register::parse,).is_some()
  }

  /// Parses and evaluates an expression.
  fn expr(&mut self,) -> Result<(i64, Span,), AsmError,> {
    let expr = Expr::parse(&mut self.cursor,).map_err(|found| AsmError::UnexpectedToken {
      expected:"an expression",
      found,
    },)?;
    let value = expr
      .evaluate(self.symbols,)
      .map_err(|(name, span,)| AsmError::UnresolvedSymbol { name, span, },)?;
    Ok((value, expr.span,),)
  }

  /// Parses `#expr`.
  fn immediate(&mut self,) -> Result<(i64, Span,), AsmError,> {
    self.expect(TokenKind::Hash, "'#'",)?;
    self.expr()
  }

  fn address_operand(&mut self,) -> Result<(u32, Span,), AsmError,> {
    let (value, span,) = self.expr()?;
    match to_u32(value,) {
      Some(address,) => Ok((address, span,),),
      None => Err(AsmError::UnencodableImmediate {
        value,
        form:"a 32 bit address",
        span,
      },),
    }
  }

  fn data_processing(&mut self, op:DpOp, cond:Condition, set_flags:bool,) -> Result<u32, AsmError,> {
    let first = self.register()?;
    self.comma()?;

    let (rd, rn,) = if op.is_comparison() {
      (0, first.idx() as u32,)
    }
    else if op.is_move() {
      (first.idx() as u32, 0,)
    }
    else {
      // `add r0, #1` is `add r0, r0, #1`
      let rn = if self.at_register() && self.cursor.peek_second().kind == TokenKind::Comma {
        let rn = self.register()?;
        self.comma()?;
        rn
      }
      else {
        first
      };
      (first.idx() as u32, rn.idx() as u32,)
    };

    let operand = self.operand2()?;
    encode_data_processing(op, cond, set_flags, rd, rn, operand,)
  }

  fn operand2(&mut self,) -> Result<Operand2, AsmError,> {
    if self.cursor.peek().kind == TokenKind::Hash {
      let (value, span,) = self.immediate()?;
      let value = to_u32(value,).ok_or(AsmError::UnencodableImmediate {
        value,
        form:"a 32 bit constant",
        span,
      },)?;
      return Ok(Operand2::Immediate { value, span, },);
    }

    let rm = self.register()?;
    let mut bits = rm.idx() as u32;
    if self.cursor.eat(&TokenKind::Comma,) {
      bits |= self.shift_operand(true,)?;
    }
    Ok(Operand2::Register(bits,),)
  }

  /// Parses the shift after a register operand: `lsl #n`, `lsl rs` (when
  /// `allow_register`) or `rrx`. Returns bits 11..4.
  fn shift_operand(&mut self, allow_register:bool,) -> Result<u32, AsmError,> {
    let token = self.cursor.next_token();
    let name = token.ident().unwrap_or_default().to_ascii_lowercase();
    if name == "rrx" {
      return Ok((ShiftKind::Ror as u32) << 5,);
    }
    let Some(kind,) = ShiftKind::parse(&name,)
    else {
      return Err(AsmError::UnexpectedToken {
        expected:"a shift",
        found:token,
      },);
    };

    if allow_register && self.at_register() {
      let rs = self.register()?;
      return Ok((rs.idx() as u32) << 8 | (kind as u32) << 5 | 1 << 4,);
    }

    let (amount, span,) = self.immediate()?;
    u32::try_from(amount,)
      .ok()
      .and_then(|amount| kind.encode_amount(amount,),)
      .ok_or(AsmError::UnencodableImmediate {
        value:amount,
        form:"a shift amount",
        span,
      },)
  }

  /// `lsl rd, rm, #n` and friends, encoded as `mov rd, rm, lsl #n`.
  fn shift(&mut self, kind:ShiftKind, cond:Condition, set_flags:bool,) -> Result<u32, AsmError,> {
    let rd = self.register()?;
    self.comma()?;
    let rm = if self.at_register() && self.cursor.peek_second().kind == TokenKind::Comma {
      let rm = self.register()?;
      self.comma()?;
      rm
    }
    else {
      rd
    };

    let shift = if self.at_register() {
      let rs = self.register()?;
      (rs.idx() as u32) << 8 | (kind as u32) << 5 | 1 << 4
    }
    else {
      let (amount, span,) = self.immediate()?;
      // A shift by zero is a plain move
      if amount == 0 {
        0
      }
      else {
        u32::try_from(amount,)
          .ok()
          .and_then(|amount| kind.encode_amount(amount,),)
          .ok_or(AsmError::UnencodableImmediate {
            value:amount,
            form:"a shift amount",
            span,
          },)?
      }
    };

    let operand = Operand2::Register(rm.idx() as u32 | shift,);
    encode_data_processing(DpOp::Mov, cond, set_flags, rd.idx() as u32, 0, operand,)
  }

  fn multiply(&mut self, accumulate:bool, cond:Condition, set_flags:bool,) -> Result<u32, AsmError,> {
    let rd = self.register()?;
    self.comma()?;
    let rm = self.register()?;
    // `mul rd, rm` is `mul rd, rm, rd`
    let rs = if self.cursor.eat(&TokenKind::Comma,) { self.register()? } else { rd };
    let mut word = cond.bits()
      | (set_flags as u32) << 20
      | (rd.idx() as u32) << 16
      | (rs.idx() as u32) << 8
      | 0x90
      | rm.idx() as u32;
    if accumulate {
      self.comma()?;
      let rn = self.register()?;
      word |= 1 << 21 | (rn.idx() as u32) << 12;
    }
    Ok(word,)
  }

  fn branch(&mut self, link:bool, cond:Condition,) -> Result<u32, AsmError,> {
    let (target, span,) = self.address_operand()?;
    let imm = branch_offset(self.origin, target, span,)?;
    Ok(cond.bits() | 0x0A00_0000 | (link as u32) << 24 | imm,)
  }

  fn branch_exchange(&mut self, link:bool, cond:Condition,) -> Result<u32, AsmError,> {
    if !self.at_register() {
      let span = self.cursor.peek().span;
      return Err(AsmError::Unsupported {
        what:"branching to a label with an exchange".to_string(),
        span,
      },);
    }
    let rm = self.register()?;
    let base = if link { 0x012F_FF30 } else { 0x012F_FF10 };
    Ok(cond.bits() | base | rm.idx() as u32,)
  }

  fn memory(&mut self, load:bool, size:MemSize, cond:Condition,) -> Result<u32, AsmError,> {
    let rd = self.register()?;
    self.comma()?;

    if self.cursor.peek().kind == TokenKind::EqualSign {
      let span = self.cursor.peek().span;
      return Err(AsmError::Unsupported {
        what:"loading through a literal pool".to_string(),
        span,
      },);
    }

    let address = if self.cursor.peek().kind == TokenKind::LBracket {
      self.address(size.is_extended(),)?
    }
    else {
      // A label, addressed relative to the pc
      let (target, span,) = self.address_operand()?;
      let offset = target as i64 - (self.origin as i64 + 8);
      Address {
        rn:Register::PC,
        pre_indexed:true,
        writeback:false,
        up:offset >= 0,
        offset:Offset::Immediate(offset.unsigned_abs() as u32,),
        span,
      }
    };

    let rd = (rd.idx() as u32) << 12;
    let rn = (address.rn.idx() as u32) << 16;
    let flags = (address.pre_indexed as u32) << 24
      | (address.up as u32) << 23
      | (address.writeback as u32) << 21
      | (load as u32) << 20;

    if size.is_extended() {
      let sh = match size {
        MemSize::Half => 0xB0,
        MemSize::SignedByte => 0xD0,
        _ => 0xF0,
      };
      let offset = match address.offset {
        Offset::Immediate(imm,) if imm <= 0xFF => 1 << 22 | (imm & 0xF0) << 4 | imm & 0xF,
        Offset::Immediate(imm,) => {
          return Err(AsmError::UnencodableImmediate {
            value:imm as i64,
            form:"an 8 bit offset",
            span:address.span,
          },)
        }
        Offset::Register { rm, .. } => rm.idx() as u32,
      };
      Ok(cond.bits() | flags | rn | rd | sh | offset,)
    }
    else {
      let byte = (size == MemSize::Byte) as u32;
      let offset = match address.offset {
        Offset::Immediate(imm,) if imm <= 0xFFF => imm,
        Offset::Immediate(imm,) => {
          return Err(AsmError::UnencodableImmediate {
            value:imm as i64,
            form:"a 12 bit offset",
            span:address.span,
          },)
        }
        Offset::Register { rm, shift, } => 1 << 25 | shift | rm.idx() as u32,
      };
      Ok(cond.bits() | 0x0400_0000 | flags | byte << 22 | rn | rd | offset,)
    }
  }

  /// Parses `[rn]`, `[rn, #imm]`, `[rn, #imm]!`, `[rn], #imm` and the register
  /// offset forms.
  fn address(&mut self, extended:bool,) -> Result<Address, AsmError,> {
    let open = self.expect(TokenKind::LBracket, "'['",)?;
    let rn = self.register()?;

    let mut address = Address {
      rn,
      pre_indexed:true,
      writeback:false,
      up:true,
      offset:Offset::Immediate(0,),
      span:open.span,
    };

    if self.cursor.eat(&TokenKind::RBracket,) {
      if self.cursor.eat(&TokenKind::Comma,) {
        address.pre_indexed = false;
        self.offset(&mut address, extended,)?;
      }
      else if self.cursor.eat(&TokenKind::Bang,) {
        address.writeback = true;
      }
      return Ok(address,);
    }

    self.comma()?;
    self.offset(&mut address, extended,)?;
    self.expect(TokenKind::RBracket, "']'",)?;
    address.writeback = self.cursor.eat(&TokenKind::Bang,);
    Ok(address,)
  }

  fn offset(&mut self, address:&mut Address, extended:bool,) -> Result<(), AsmError,> {
    if self.cursor.peek().kind == TokenKind::Hash {
      let (value, span,) = self.immediate()?;
      address.up = value >= 0;
      address.span = span;
      address.offset = Offset::Immediate(value.unsigned_abs().min(u32::MAX as u64,) as u32,);
      return Ok((),);
    }

    if self.cursor.eat(&TokenKind::Minus,) {
      address.up = false;
    }
    else {
      self.cursor.eat(&TokenKind::Plus,);
    }
    let rm = self.register()?;
    let shift = if !extended && self.cursor.eat(&TokenKind::Comma,) {
      self.shift_operand(false,)?
    }
    else {
      0
    };
    address.offset = Offset::Register { rm, shift, };
    Ok((),)
  }

  fn block(&mut self, load:bool, mode:BlockMode, cond:Condition,) -> Result<u32, AsmError,> {
    let rn = self.register()?;
    let writeback = self.cursor.eat(&TokenKind::Bang,);
    self.comma()?;
    let list = self.register_list()?;
    Ok(
      cond.bits()
        | 0x0800_0000
        | mode.bits()
        | (writeback as u32) << 21
        | (load as u32) << 20
        | (rn.idx() as u32) << 16
        | list,
    )
  }

  /// Parses `{r0, r4-r7, lr}` into a register mask.
  fn register_list(&mut self,) -> Result<u32, AsmError,> {
    let open = self.expect(TokenKind::LCurlyBracket, "'{'",)?;
    let mut list = 0u32;
    loop {
      let first = self.register()?;
      let last = if self.cursor.eat(&TokenKind::Minus,) { self.register()? } else { first };
      for idx in first.idx()..=last.idx() {
        list |= 1 << idx;
      }
      if !self.cursor.eat(&TokenKind::Comma,) {
        break;
      }
    }
    self.expect(TokenKind::RCurlyBracket, "'}'",)?;
    if list == 0 {
      return Err(AsmError::Unsupported {
        what:"an empty register list".to_string(),
        span:open.span,
      },);
    }
    Ok(list,)
  }

  fn data(&mut self, width:usize,) -> Result<Vec<u8,>, AsmError,> {
    let mut bytes = Vec::new();
    loop {
      let (value, span,) = self.expr()?;
      let bits = width as u32 * 8;
      let min = -(1i64 << (bits - 1));
      let max = (1i64 << bits) - 1;
      if value < min || value > max {
        return Err(AsmError::UnencodableImmediate {
          value,
          form:match width {
            1 => "a byte",
            2 => "a halfword",
            _ => "a word",
          },
          span,
        },);
      }
      bytes.extend_from_slice(&(value as u32).to_le_bytes()[..width],);
      if !self.cursor.eat(&TokenKind::Comma,) {
        break;
      }
    }
    Ok(bytes,)
  }
}

fn encode_data_processing(
  op:DpOp,
  cond:Condition,
  set_flags:bool,
  rd:u32,
  rn:u32,
  operand:Operand2,
) -> Result<u32, AsmError,> {
  let (op, operand,) = match operand {
    Operand2::Register(bits,) => (op, bits,),
    Operand2::Immediate { value, span, } => match rotated_immediate(value,) {
      Some(imm,) => (op, 1 << 25 | imm,),
      None => {
        let alternative = op
          .complement(value,)
          .and_then(|(alt, value,)| rotated_immediate(value,).map(|imm| (alt, 1 << 25 | imm,),),);
        alternative.ok_or(AsmError::UnencodableImmediate {
          value:value as i64,
          form:"a rotated 8 bit constant",
          span,
        },)?
      }
    },
  };
  Ok(cond.bits() | (op as u32) << 21 | (set_flags as u32) << 20 | rn << 16 | rd << 12 | operand,)
}

/// Computes the 24 bit word offset of a branch at `origin` to `target`.
fn branch_offset(origin:u32, target:u32, span:Span,) -> Result<u32, AsmError,> {
  if target % 4 != 0 {
    return Err(AsmError::Misaligned { target, span, },);
  }
  let offset = (target as i64 - (origin as i64 + 8)) >> 2;
  if !(-(1 << 23)..(1 << 23)).contains(&offset,) {
    return Err(AsmError::BranchOutOfRange { target, origin, span, },);
  }
  Ok(offset as u32 & 0x00FF_FFFF,)
}
