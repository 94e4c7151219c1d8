use super::{CustomInstructionArgs, HookCategory, Outcome, Registry};

/// Opcode of the first custom script instruction.
pub const FIRST_CUSTOM_OPCODE:u32 = 0x1000;

/// Id of the first custom script menu.
pub const FIRST_CUSTOM_MENU:u32 = 80;

/// A script engine instruction implemented outside the original program.
#[derive(Debug, Clone, Copy,)]
pub struct CustomInstruction {
  pub name:&'static str,
  /// Number of parameters, or -1 for a variable count.
  pub parameter_count:i8,
  pub run:fn(&CustomInstructionArgs,),
}

impl Registry<CustomInstruction,> {
  /// Registry of instructions starting at [`FIRST_CUSTOM_OPCODE`].
  pub fn instructions(entries:&[CustomInstruction],) -> Self {
    Registry::from_static(HookCategory::CustomInstruction.log_target(), FIRST_CUSTOM_OPCODE, entries,)
  }

  /// Parameter count the script engine should use for `opcode`.
  pub fn parameter_count(&self, opcode:u32,) -> Option<i8,> {
    self.get(opcode,).ok().map(|instruction| instruction.parameter_count,)
  }

  /// Runs the instruction `args.index` points at. The index is relative to the
  /// first custom opcode.
  pub fn run_instruction(&self, args:&CustomInstructionArgs,) -> Outcome {
    let opcode = self.first_id().wrapping_add(args.index,);
    self.dispatch(opcode, |instruction| {
      log::info!(
        target: HookCategory::CustomInstruction.log_target(),
        "Running custom instruction '{}' with {} arguments (opcode {opcode}, index {})",
        instruction.name,
        instruction.parameter_count,
        args.index
      );
      (instruction.run)(args,);
      Outcome::Handled(None,)
    },)
  }
}

/// A script menu implemented outside the original program.
#[derive(Debug, Clone, Copy,)]
pub struct CustomMenu {
  pub prompt_string_id:u16,
  pub confirm_string_id:u16,
  /// Called once when the menu opens.
  pub create:fn(),
  /// Called every frame. Returns the menu's result once it is finished.
  pub update:fn() -> Option<i32,>,
  /// Called once after `update` reports a result.
  pub close:fn(),
}

impl Registry<CustomMenu,> {
  /// Registry of menus starting at [`FIRST_CUSTOM_MENU`].
  pub fn menus(entries:&[CustomMenu],) -> Self {
    Registry::from_static(HookCategory::ScriptMenu.log_target(), FIRST_CUSTOM_MENU, entries,)
  }

  pub fn open_menu(&self, menu_id:u32,) -> Outcome {
    self.dispatch(menu_id, |menu| {
      log::info!(target: HookCategory::ScriptMenu.log_target(), "Running custom script menu {menu_id}");
      (menu.create)();
      Outcome::Handled(None,)
    },)
  }

  /// Advances the menu by one frame. Handled with the result once the menu is
  /// finished. An unknown menu finishes at once with `-1` so the script does
  /// not wait forever.
  pub fn update_menu(&self, menu_id:u32,) -> Outcome {
    match self.get(menu_id,) {
      Ok(menu,) => match (menu.update)() {
        Some(result,) => {
          (menu.close)();
          Outcome::Handled(Some(result,),)
        }
        None => Outcome::NotHandled,
      },
      Err(err,) => {
        log::error!(target: HookCategory::ScriptMenu.log_target(), "{err}");
        Outcome::Handled(Some(-1,),)
      }
    }
  }
}
