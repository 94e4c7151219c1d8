use serde::Deserialize;
use std::fmt::Display;

/// One of the sixteen A32 core registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize,)]
#[serde(try_from = "String")]
pub struct Register(u8,);

impl Register {
  pub const SP:Register = Register(13,);
  pub const LR:Register = Register(14,);
  pub const PC:Register = Register(15,);

  /// `r0` through `r15`.
  pub fn new(idx:u8,) -> Option<Register,> {
    (idx < 16).then_some(Register(idx,),)
  }

  pub fn idx(self,) -> u8 {
    self.0
  }

  /// Bit of this register in a load/store multiple register list.
  pub fn mask(self,) -> u16 {
    1 << self.0
  }

  /// Parses a register name, including the `sp`, `lr`, `pc`, `ip`, `fp`, `sl`
  /// and `sb` aliases. Case insensitive.
  pub fn parse(name:&str,) -> Option<Register,> {
    let lower = name.to_ascii_lowercase();
    let idx = match lower.as_str() {
      "sb" => 9,
      "sl" => 10,
      "fp" => 11,
      "ip" => 12,
      "sp" => 13,
      "lr" => 14,
      "pc" => 15,
      _ => {
        let num = lower.strip_prefix('r',)?;
        // Reject forms such as `r01`
        if num.len() > 1 && num.starts_with('0',) {
          return None;
        }
        num.parse::<u8>().ok()?
      }
    };
    Register::new(idx,)
  }
}

impl TryFrom<String,> for Register {
  type Error = String;

  fn try_from(value:String,) -> Result<Self, Self::Error,> {
    Register::parse(&value,).ok_or_else(|| format!("'{value}' is not a register"),)
  }
}

impl Display for Register {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    match self.0 {
      13 => write!(f, "sp"),
      14 => write!(f, "lr"),
      15 => write!(f, "pc"),
      idx => write!(f, "r{idx}"),
    }
  }
}

/// Renders a register list such as `{r3, r4, lr}`.
pub fn register_list(regs:&[Register],) -> String {
  let names = regs.iter().map(Register::to_string,).collect::<Vec<_,>>();
  format!("{{{}}}", names.join(", "))
}
