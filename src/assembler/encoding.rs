//! Mnemonic decoding and the bit level pieces of A32 encodings.

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) struct Condition(u32,);

impl Condition {
  pub(crate) const AL:Condition = Condition(0xE,);

  const NAMES:[(&'static str, u32,); 17] = [
    ("eq", 0x0,),
    ("ne", 0x1,),
    ("cs", 0x2,),
    ("hs", 0x2,),
    ("cc", 0x3,),
    ("lo", 0x3,),
    ("mi", 0x4,),
    ("pl", 0x5,),
    ("vs", 0x6,),
    ("vc", 0x7,),
    ("hi", 0x8,),
    ("ls", 0x9,),
    ("ge", 0xA,),
    ("lt", 0xB,),
    ("gt", 0xC,),
    ("le", 0xD,),
    ("al", 0xE,),
  ];

  /// Parses a condition suffix. The empty string is `al`.
  pub(crate) fn parse(suffix:&str,) -> Option<Condition,> {
    if suffix.is_empty() {
      return Some(Condition::AL,);
    }
    Self::NAMES
      .iter()
      .find(|(name, _,)| *name == suffix,)
      .map(|(_, bits,)| Condition(*bits,),)
  }

  /// Condition field already shifted into bits 31..28.
  pub(crate) fn bits(self,) -> u32 {
    self.0 << 28
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) enum DpOp {
  And = 0x0,
  Eor = 0x1,
  Sub = 0x2,
  Rsb = 0x3,
  Add = 0x4,
  Adc = 0x5,
  Sbc = 0x6,
  Rsc = 0x7,
  Tst = 0x8,
  Teq = 0x9,
  Cmp = 0xA,
  Cmn = 0xB,
  Orr = 0xC,
  Mov = 0xD,
  Bic = 0xE,
  Mvn = 0xF,
}

impl DpOp {
  /// Comparisons only set flags and have no destination.
  pub(crate) fn is_comparison(self,) -> bool {
    matches!(self, DpOp::Tst | DpOp::Teq | DpOp::Cmp | DpOp::Cmn)
  }

  /// Moves have no first operand.
  pub(crate) fn is_move(self,) -> bool {
    matches!(self, DpOp::Mov | DpOp::Mvn)
  }

  /// The operation that gives the same result with the immediate transformed,
  /// used when an immediate cannot be encoded directly.
  pub(crate) fn complement(self, imm:u32,) -> Option<(DpOp, u32,),> {
    match self {
      DpOp::Mov => Some((DpOp::Mvn, !imm,),),
      DpOp::Mvn => Some((DpOp::Mov, !imm,),),
      DpOp::And => Some((DpOp::Bic, !imm,),),
      DpOp::Bic => Some((DpOp::And, !imm,),),
      DpOp::Add => Some((DpOp::Sub, imm.wrapping_neg(),),),
      DpOp::Sub => Some((DpOp::Add, imm.wrapping_neg(),),),
      DpOp::Cmp => Some((DpOp::Cmn, imm.wrapping_neg(),),),
      DpOp::Cmn => Some((DpOp::Cmp, imm.wrapping_neg(),),),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) enum ShiftKind {
  Lsl = 0,
  Lsr = 1,
  Asr = 2,
  Ror = 3,
}

impl ShiftKind {
  pub(crate) fn parse(name:&str,) -> Option<ShiftKind,> {
    match name.to_ascii_lowercase().as_str() {
      "lsl" | "asl" => Some(ShiftKind::Lsl,),
      "lsr" => Some(ShiftKind::Lsr,),
      "asr" => Some(ShiftKind::Asr,),
      "ror" => Some(ShiftKind::Ror,),
      _ => None,
    }
  }

  /// Encodes a shift by a constant as bits 11..5. Returns `None` for amounts
  /// the shift cannot express.
  pub(crate) fn encode_amount(self, amount:u32,) -> Option<u32,> {
    let field = match self {
      ShiftKind::Lsl if amount <= 31 => amount,
      ShiftKind::Lsr | ShiftKind::Asr if (1..=32).contains(&amount,) => amount % 32,
      ShiftKind::Ror if (1..=31).contains(&amount,) => amount,
      _ => return None,
    };
    Some(field << 7 | (self as u32) << 5,)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) enum MemSize {
  Word,
  Byte,
  Half,
  SignedByte,
  SignedHalf,
}

impl MemSize {
  /// Whether the size uses the halfword/signed transfer encoding.
  pub(crate) fn is_extended(self,) -> bool {
    matches!(self, MemSize::Half | MemSize::SignedByte | MemSize::SignedHalf)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) enum BlockMode {
  IncrementAfter,
  IncrementBefore,
  DecrementAfter,
  DecrementBefore,
}

impl BlockMode {
  /// The P and U bits.
  pub(crate) fn bits(self,) -> u32 {
    match self {
      BlockMode::DecrementAfter => 0,
      BlockMode::IncrementAfter => 1 << 23,
      BlockMode::DecrementBefore => 1 << 24,
      BlockMode::IncrementBefore => 1 << 24 | 1 << 23,
    }
  }

  fn parse(suffix:&str, load:bool,) -> Option<BlockMode,> {
    // The stack aliases mean different modes for loads and stores
    let mode = match (suffix, load,) {
      ("", _,) | ("ia", _,) => BlockMode::IncrementAfter,
      ("ib", _,) => BlockMode::IncrementBefore,
      ("da", _,) => BlockMode::DecrementAfter,
      ("db", _,) => BlockMode::DecrementBefore,
      ("fd", true,) | ("ea", false,) => BlockMode::IncrementAfter,
      ("ed", true,) | ("fa", false,) => BlockMode::IncrementBefore,
      ("fa", true,) | ("ed", false,) => BlockMode::DecrementAfter,
      ("ea", true,) | ("fd", false,) => BlockMode::DecrementBefore,
      _ => return None,
    };
    Some(mode,)
  }
}

/// A decoded mnemonic with its suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub(crate) enum Mnemonic {
  DataProcessing { op:DpOp, cond:Condition, set_flags:bool, },
  Shift { kind:ShiftKind, cond:Condition, set_flags:bool, },
  Multiply { accumulate:bool, cond:Condition, set_flags:bool, },
  Branch { link:bool, cond:Condition, },
  BranchExchange { link:bool, cond:Condition, },
  Memory { load:bool, size:MemSize, cond:Condition, },
  Block { load:bool, mode:BlockMode, cond:Condition, },
  Push { cond:Condition, },
  Pop { cond:Condition, },
  Swi { cond:Condition, },
  Nop { cond:Condition, },
  Data { width:usize, },
}

#[derive(Clone, Copy,)]
enum Family {
  Dp(DpOp,),
  Shift(ShiftKind,),
  Mul(bool,),
  Branch(bool,),
  Bx(bool,),
  Mem(bool,),
  Block(bool,),
  Push,
  Pop,
  Swi,
  Nop,
}

/// Tried in order; the first base whose suffix parses wins. `blx` and `bl`
/// come before `b` so that `bl` is not read as `b` plus a suffix.
const BASES:&[(&str, Family,)] = &[
  ("push", Family::Push,),
  ("pop", Family::Pop,),
  ("nop", Family::Nop,),
  ("swi", Family::Swi,),
  ("svc", Family::Swi,),
  ("blx", Family::Bx(true,),),
  ("bx", Family::Bx(false,),),
  ("bl", Family::Branch(true,),),
  ("b", Family::Branch(false,),),
  ("ldm", Family::Block(true,),),
  ("stm", Family::Block(false,),),
  ("ldr", Family::Mem(true,),),
  ("str", Family::Mem(false,),),
  ("mul", Family::Mul(false,),),
  ("mla", Family::Mul(true,),),
  ("lsl", Family::Shift(ShiftKind::Lsl,),),
  ("asl", Family::Shift(ShiftKind::Lsl,),),
  ("lsr", Family::Shift(ShiftKind::Lsr,),),
  ("asr", Family::Shift(ShiftKind::Asr,),),
  ("ror", Family::Shift(ShiftKind::Ror,),),
  ("and", Family::Dp(DpOp::And,),),
  ("eor", Family::Dp(DpOp::Eor,),),
  ("sub", Family::Dp(DpOp::Sub,),),
  ("rsb", Family::Dp(DpOp::Rsb,),),
  ("add", Family::Dp(DpOp::Add,),),
  ("adc", Family::Dp(DpOp::Adc,),),
  ("sbc", Family::Dp(DpOp::Sbc,),),
  ("rsc", Family::Dp(DpOp::Rsc,),),
  ("tst", Family::Dp(DpOp::Tst,),),
  ("teq", Family::Dp(DpOp::Teq,),),
  ("cmp", Family::Dp(DpOp::Cmp,),),
  ("cmn", Family::Dp(DpOp::Cmn,),),
  ("orr", Family::Dp(DpOp::Orr,),),
  ("mov", Family::Dp(DpOp::Mov,),),
  ("bic", Family::Dp(DpOp::Bic,),),
  ("mvn", Family::Dp(DpOp::Mvn,),),
];

impl Mnemonic {
  /// Decodes a mnemonic such as `addeqs`, `ldrplh`, `bls` or `.word`. Case
  /// insensitive.
  pub(crate) fn parse(name:&str,) -> Option<Mnemonic,> {
    let name = name.to_ascii_lowercase();

    match name.as_str() {
      ".word" | ".long" | ".int" => return Some(Mnemonic::Data { width:4, },),
      ".hword" | ".short" | ".half" => return Some(Mnemonic::Data { width:2, },),
      ".byte" => return Some(Mnemonic::Data { width:1, },),
      _ => {}
    }

    BASES.iter().find_map(|(base, family,)| {
      let rest = name.strip_prefix(base,)?;
      decode(*family, rest,)
    },)
  }
}

fn decode(family:Family, rest:&str,) -> Option<Mnemonic,> {
  let mnemonic = match family {
    Family::Dp(op,) => {
      let (cond, set_flags,) = cond_and_s(rest,)?;
      // Comparisons always set flags; an explicit `s` is tolerated
      let set_flags = set_flags || op.is_comparison();
      Mnemonic::DataProcessing { op, cond, set_flags, }
    }
    Family::Shift(kind,) => {
      let (cond, set_flags,) = cond_and_s(rest,)?;
      Mnemonic::Shift { kind, cond, set_flags, }
    }
    Family::Mul(accumulate,) => {
      let (cond, set_flags,) = cond_and_s(rest,)?;
      Mnemonic::Multiply {
        accumulate,
        cond,
        set_flags,
      }
    }
    Family::Branch(link,) => Mnemonic::Branch {
      link,
      cond:Condition::parse(rest,)?,
    },
    Family::Bx(link,) => Mnemonic::BranchExchange {
      link,
      cond:Condition::parse(rest,)?,
    },
    Family::Mem(load,) => {
      let (size, cond,) = mem_suffix(rest, load,)?;
      Mnemonic::Memory { load, size, cond, }
    }
    Family::Block(load,) => {
      let (mode, cond,) = split_either(rest, |part| BlockMode::parse(part, load,),)?;
      Mnemonic::Block { load, mode, cond, }
    }
    Family::Push => Mnemonic::Push {
      cond:Condition::parse(rest,)?,
    },
    Family::Pop => Mnemonic::Pop {
      cond:Condition::parse(rest,)?,
    },
    Family::Swi => Mnemonic::Swi {
      cond:Condition::parse(rest,)?,
    },
    Family::Nop => Mnemonic::Nop {
      cond:Condition::parse(rest,)?,
    },
  };
  Some(mnemonic,)
}

/// Accepts `{cond}{s}` in either order, e.g. `eqs` and `seq`.
fn cond_and_s(rest:&str,) -> Option<(Condition, bool,),> {
  split_either(rest, |part| match part {
    "" => Some(false,),
    "s" => Some(true,),
    _ => None,
  },)
  .map(|(set_flags, cond,)| (cond, set_flags,),)
}

fn mem_suffix(rest:&str, load:bool,) -> Option<(MemSize, Condition,),> {
  split_either(rest, |part| match (part, load,) {
    ("", _,) => Some(MemSize::Word,),
    ("b", _,) => Some(MemSize::Byte,),
    ("h", _,) => Some(MemSize::Half,),
    ("sb", true,) => Some(MemSize::SignedByte,),
    ("sh", true,) => Some(MemSize::SignedHalf,),
    _ => None,
  },)
}

/// Splits `rest` into a condition and another suffix accepted by `other`, with
/// the condition either first (pre-UAL, `ldreqb`) or last (UAL, `ldrbeq`).
/// A leading condition is preferred.
fn split_either<T, F,>(rest:&str, other:F,) -> Option<(T, Condition,),>
where F: Fn(&str,) -> Option<T,> {
  if rest.len() >= 2 {
    if let Some(cond,) = rest.get(..2,).and_then(Condition::parse,) {
      if let Some(val,) = other(&rest[2..],) {
        return Some((val, cond,),);
      }
    }
  }
  if let Some(val,) = other(rest,) {
    return Some((val, Condition::AL,),);
  }
  let split = rest.len().checked_sub(2,)?;
  let cond = rest.get(split..,).and_then(Condition::parse,)?;
  let val = other(&rest[..split],)?;
  Some((val, cond,),)
}

/// Encodes `value` as an 8 bit constant rotated right by an even amount.
/// Returns bits 11..0 of the instruction.
pub(crate) fn rotated_immediate(value:u32,) -> Option<u32,> {
  (0..16).find_map(|rot| {
    let imm = value.rotate_left(rot * 2,);
    (imm <= 0xFF).then_some(rot << 8 | imm,)
  },)
}
