use super::{HandlerChain, FIRST_CUSTOM_OPCODE};
use serde::Deserialize;

/// Families of hook points. Each has a fixed number of normalized arguments
/// and its own log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum HookCategory {
  ItemEffect,
  MoveEffect,
  SpecialProcess,
  CustomInstruction,
  ScriptMenu,
}

impl HookCategory {
  /// Number of arguments the dispatch function of this category takes.
  pub fn arity(self,) -> usize {
    match self {
      HookCategory::ItemEffect | HookCategory::MoveEffect | HookCategory::SpecialProcess => 4,
      HookCategory::CustomInstruction => 3,
      HookCategory::ScriptMenu => 1,
    }
  }

  pub fn log_target(self,) -> &'static str {
    match self {
      HookCategory::ItemEffect | HookCategory::MoveEffect => "splice.effects",
      HookCategory::SpecialProcess => "splice.special_process",
      HookCategory::CustomInstruction => "splice.ground_instructions",
      HookCategory::ScriptMenu => "splice.script_menus",
    }
  }
}

/// Address of an object owned by the patched program. Never dereferenced on
/// this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default,)]
pub struct ObjectRef(pub u32,);

/// Arguments of one category, rebuilt from the registers a trampoline loads.
pub trait HookArgs: Sized {
  const CATEGORY:HookCategory;

  /// Builds the arguments from `r0..r3` as loaded by the trampoline.
  fn from_registers(regs:[u32; 4],) -> Self;

  /// Called when no handler took the event.
  fn unhandled(&self,) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct ItemEffectArgs {
  pub user:ObjectRef,
  pub target:ObjectRef,
  pub item_id:u32,
  pub is_thrown:bool,
}

impl HookArgs for ItemEffectArgs {
  const CATEGORY:HookCategory = HookCategory::ItemEffect;

  fn from_registers(regs:[u32; 4],) -> Self {
    ItemEffectArgs {
      user:ObjectRef(regs[0],),
      target:ObjectRef(regs[1],),
      item_id:regs[2],
      is_thrown:regs[3] != 0,
    }
  }
}

/// The payload of a handled move effect is whether damage was dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct MoveEffectArgs {
  pub move_id:u32,
  pub item_id:u32,
  pub user:ObjectRef,
  pub target:ObjectRef,
}

impl HookArgs for MoveEffectArgs {
  const CATEGORY:HookCategory = HookCategory::MoveEffect;

  fn from_registers(regs:[u32; 4],) -> Self {
    MoveEffectArgs {
      move_id:regs[0],
      item_id:regs[1],
      user:ObjectRef(regs[2],),
      target:ObjectRef(regs[3],),
    }
  }
}

/// The payload of a handled special process is its return value. `arg2` is
/// passed through as the caller supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct SpecialProcessArgs {
  pub unknown:ObjectRef,
  pub id:u32,
  pub arg1:i32,
  pub arg2:i32,
}

impl HookArgs for SpecialProcessArgs {
  const CATEGORY:HookCategory = HookCategory::SpecialProcess;

  fn from_registers(regs:[u32; 4],) -> Self {
    SpecialProcessArgs {
      unknown:ObjectRef(regs[0],),
      id:regs[1],
      arg1:regs[2] as i32,
      arg2:regs[3] as i32,
    }
  }

  fn unhandled(&self,) {
    log::warn!(target: Self::CATEGORY.log_target(), "Unhandled special process ID {}", self.id);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct CustomInstructionArgs {
  /// Opcode minus the first custom opcode. The registers carry the opcode
  /// itself; opcodes below the first custom one wrap to an index past the end.
  pub index:u32,
  pub routine:ObjectRef,
  pub args:ObjectRef,
}

impl HookArgs for CustomInstructionArgs {
  const CATEGORY:HookCategory = HookCategory::CustomInstruction;

  fn from_registers(regs:[u32; 4],) -> Self {
    CustomInstructionArgs {
      index:regs[0].wrapping_sub(FIRST_CUSTOM_OPCODE,),
      routine:ObjectRef(regs[1],),
      args:ObjectRef(regs[2],),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct ScriptMenuArgs {
  pub menu_id:u32,
}

impl HookArgs for ScriptMenuArgs {
  const CATEGORY:HookCategory = HookCategory::ScriptMenu;

  fn from_registers(regs:[u32; 4],) -> Self {
    ScriptMenuArgs { menu_id:regs[0], }
  }
}

/// The body of a dispatch function: normalizes the registers, runs the chain
/// and encodes the outcome for `r0:r1`.
pub fn dispatch_registers<A:HookArgs + std::fmt::Debug,>(chain:&HandlerChain<A,>, regs:[u32; 4],) -> u64 {
  let mut args = A::from_registers(regs,);
  log::debug!(target: A::CATEGORY.log_target(), "Running {:?}", args);
  let outcome = chain.dispatch(&mut args,);
  if !outcome.is_handled() {
    args.unhandled();
  }
  outcome.into_abi()
}
