use crate::{assembler::Register, dispatch::HookCategory, errors::PatchError, src_file::SourceLoc};
use serde::Deserialize;
use std::fmt::Display;

/// The most arguments a dispatch function receives; they travel in `r0..r3`.
pub const MAX_ARGS:usize = 4;

/// Where one normalized dispatch argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize,)]
#[serde(try_from = "String")]
pub enum ArgSource {
  /// The value a register held at the hook point.
  Register(Register,),
  /// A word at this byte offset from the stack pointer at the hook point.
  Stack(u32,),
  /// A constant.
  Immediate(u32,),
}

impl TryFrom<String,> for ArgSource {
  type Error = String;

  fn try_from(value:String,) -> Result<Self, Self::Error,> {
    let parse_num = |num:&str| {
      let num = num.trim();
      let parsed = match num.strip_prefix("0x",) {
        Some(hex,) => u32::from_str_radix(hex, 16,),
        None => num.parse::<u32>(),
      };
      parsed.map_err(|_| format!("'{value}' has an invalid number"),)
    };

    if let Some(offset,) = value.strip_prefix("stack:",) {
      let offset = parse_num(offset,)?;
      if offset % 4 != 0 {
        return Err(format!("'{value}' is not a word aligned stack offset"),);
      }
      Ok(ArgSource::Stack(offset,),)
    }
    else if let Some(imm,) = value.strip_prefix("imm:",) {
      Ok(ArgSource::Immediate(parse_num(imm,)?,),)
    }
    else {
      Register::parse(&value,)
        .map(ArgSource::Register,)
        .ok_or_else(|| format!("'{value}' is not a register, 'stack:N' or 'imm:N'"),)
    }
  }
}

impl Display for ArgSource {
  fn fmt(&self, f:&mut std::fmt::Formatter<'_,>,) -> std::fmt::Result {
    match self {
      ArgSource::Register(reg,) => write!(f, "{reg}"),
      ArgSource::Stack(offset,) => write!(f, "stack:{offset}"),
      ArgSource::Immediate(imm,) => write!(f, "imm:{imm}"),
    }
  }
}

/// What a stub does when the dispatch function handled the event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize,)]
#[serde(from = "String")]
pub enum Divert {
  /// Return to the hooked function's caller.
  #[default]
  Return,
  /// Branch to this address expression.
  Branch(String,),
}

impl From<String,> for Divert {
  fn from(value:String,) -> Self {
    if value == "return" {
      Divert::Return
    }
    else {
      Divert::Branch(value,)
    }
  }
}

/// Skip dispatching while `register` is below `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct Filter {
  pub register:Register,
  pub min:u32,
}

/// Declarative description of one hook point and the stub that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct HookContract {
  /// Symbol name of the generated stub.
  pub name:String,
  /// Region containing the hook point.
  pub region:String,
  /// Address expression of the hook point.
  pub hook:String,
  /// The original instruction(s) at the hook point. Must assemble to the four
  /// bytes the branch to the stub replaces.
  pub replay:Vec<String,>,
  /// Registers live at the hook point.
  #[serde(default)]
  pub live:Vec<Register,>,
  /// Symbol of the dispatch function.
  pub dispatch:String,
  #[serde(default)]
  pub args:Vec<ArgSource,>,
  /// Register that receives the payload when the event was handled.
  #[serde(default)]
  pub result:Option<Register,>,
  #[serde(default)]
  pub divert:Divert,
  #[serde(default)]
  pub filter:Option<Filter,>,
  #[serde(default)]
  pub category:Option<HookCategory,>,
  /// Define that must be set for the hook to be built.
  #[serde(default)]
  pub feature:Option<String,>,
}

impl HookContract {
  /// Checks the contract for stubs that could not preserve state.
  pub fn validate(&self, loc:&SourceLoc,) -> Result<(), PatchError,> {
    let invalid = |reason:String| PatchError::InvalidHook {
      hook:self.name.clone(),
      reason,
      loc:loc.clone(),
    };

    if self.replay.iter().all(|line| line.trim().is_empty(),) {
      return Err(invalid("the replay is empty".to_string(),),);
    }
    if self.args.len() > MAX_ARGS {
      return Err(invalid(format!(
        "{} arguments are given but at most {MAX_ARGS} fit in registers",
        self.args.len()
      ),),);
    }
    if let Some(category,) = self.category {
      if category.arity() != self.args.len() {
        return Err(invalid(format!(
          "{category:?} dispatch takes {} arguments but {} are given",
          category.arity(),
          self.args.len()
        ),),);
      }
    }

    let arg_regs = self.args.iter().filter_map(|arg| match arg {
      ArgSource::Register(reg,) => Some(*reg,),
      _ => None,
    },);
    let filter_reg = self.filter.map(|filter| filter.register,);
    for reg in self.live.iter().copied().chain(arg_regs,).chain(self.result,).chain(filter_reg,) {
      if reg == Register::SP || reg == Register::PC {
        return Err(invalid(format!("{reg} cannot be saved or passed by a stub"),),);
      }
    }
    Ok((),)
  }

  /// Registers the stub pushes on entry and pops before leaving: live, argument
  /// and result registers plus `lr`, ascending.
  pub fn saved_registers(&self,) -> Vec<Register,> {
    let mut saved = self.live.clone();
    saved.extend(self.args.iter().filter_map(|arg| match arg {
      ArgSource::Register(reg,) => Some(*reg,),
      _ => None,
    },),);
    saved.extend(self.result,);
    saved.push(Register::LR,);
    saved.sort();
    saved.dedup();
    saved
  }

  /// Whether the hook is built with the given defines.
  pub fn enabled<F:Fn(&str,) -> bool,>(&self, is_defined:F,) -> bool {
    self.feature.as_deref().map_or(true, is_defined,)
  }
}
