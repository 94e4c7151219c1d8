use crate::{
  dispatch::{
    dispatch_registers, CustomInstruction, CustomInstructionArgs, CustomMenu, HandlerChain, HookArgs, HookCategory,
    ItemEffectArgs, MoveEffectArgs, ObjectRef, Outcome, Registry, ScriptMenuArgs, SpecialProcessArgs,
    FIRST_CUSTOM_MENU, FIRST_CUSTOM_OPCODE,
  },
  errors::DispatchError,
};
use std::{
  cell::Cell,
  rc::Rc,
  sync::atomic::{AtomicU32, Ordering},
};

#[test]
fn outcomes_cross_the_register_boundary() {
  assert_eq!(Outcome::NotHandled.into_abi(), 0);
  assert_eq!(Outcome::Handled(None,).into_abi(), 1);
  assert_eq!(Outcome::Handled(Some(7,),).into_abi(), 0x0000_0007_0000_0001);
  assert_eq!(Outcome::Handled(Some(-1,),).into_abi(), 0xFFFF_FFFF_0000_0001);

  assert_eq!(Outcome::from_abi(0), Outcome::NotHandled);
  // A payload without the handled flag is ignored
  assert_eq!(Outcome::from_abi(0x0000_0005_0000_0000), Outcome::NotHandled);
  assert_eq!(Outcome::from_abi(0xFFFF_FFFF_0000_0001), Outcome::Handled(Some(-1)));
  assert_eq!(Outcome::from_abi(Outcome::Handled(None).into_abi()), Outcome::Handled(Some(0)));

  assert!(Outcome::Handled(None,).is_handled());
  assert_eq!(Outcome::Handled(Some(3,),).payload(), Some(3));
  assert_eq!(Outcome::NotHandled.payload(), None);
}

#[test]
fn first_handler_wins() {
  let asked = Rc::new(Cell::new(0,),);
  let counter = asked.clone();

  let chain = HandlerChain::<SpecialProcessArgs,>::new(HookCategory::SpecialProcess.log_target(),)
    .with("count", move |_:&mut SpecialProcessArgs| {
      counter.set(counter.get() + 1,);
      Outcome::NotHandled
    },)
    .with("custom ids", |args:&mut SpecialProcessArgs| {
      if args.id == 100 {
        Outcome::Handled(Some(args.arg1 * 2,),)
      }
      else {
        Outcome::NotHandled
      }
    },)
    .with("never reached for 100", |_:&mut SpecialProcessArgs| Outcome::Handled(Some(-5,),),);
  assert_eq!(chain.len(), 3);

  let mut args = SpecialProcessArgs::from_registers([0x0210_0000, 100, 21, 0],);
  assert_eq!(chain.dispatch(&mut args), Outcome::Handled(Some(42)));

  let mut args = SpecialProcessArgs::from_registers([0x0210_0000, 101, 21, 0],);
  assert_eq!(chain.dispatch(&mut args), Outcome::Handled(Some(-5)));
  assert_eq!(asked.get(), 2);

  let empty = HandlerChain::<SpecialProcessArgs,>::new("test",);
  assert!(empty.is_empty());
  assert_eq!(empty.dispatch(&mut args), Outcome::NotHandled);
}

#[test]
fn handlers_may_update_their_arguments() {
  let chain = HandlerChain::<MoveEffectArgs,>::new(HookCategory::MoveEffect.log_target(),)
    .with("retarget", |args:&mut MoveEffectArgs| {
      args.target = args.user;
      Outcome::NotHandled
    },)
    .with("self hit", |args:&mut MoveEffectArgs| Outcome::Handled(Some((args.target == args.user) as i32,),),);

  let mut args = MoveEffectArgs::from_registers([0x1A3, 0, 0x0220_0000, 0x0220_1000],);
  assert_eq!(chain.dispatch(&mut args), Outcome::Handled(Some(1)));
  assert_eq!(args.target, ObjectRef(0x0220_0000));
}

#[test]
fn arguments_come_from_registers() {
  let item = ItemEffectArgs::from_registers([0x10, 0x20, 55, 1],);
  assert_eq!(item.user, ObjectRef(0x10));
  assert_eq!(item.item_id, 55);
  assert!(item.is_thrown);

  let special = SpecialProcessArgs::from_registers([0, 7, 0xFFFF_FFFF, 3],);
  assert_eq!((special.id, special.arg1, special.arg2), (7, -1, 3));

  let instruction = CustomInstructionArgs::from_registers([0x1002, 0x0230_0000, 0x0230_0010, 0xDEAD],);
  assert_eq!(instruction.index, 2);
  assert_eq!(instruction.args, ObjectRef(0x0230_0010));

  assert_eq!(ScriptMenuArgs::from_registers([81, 0, 0, 0]).menu_id, 81);
}

#[test]
fn categories_declare_their_arity() {
  assert_eq!(HookCategory::SpecialProcess.arity(), 4);
  assert_eq!(HookCategory::ItemEffect.arity(), 4);
  assert_eq!(HookCategory::CustomInstruction.arity(), 3);
  assert_eq!(HookCategory::ScriptMenu.arity(), 1);
  assert_eq!(HookCategory::MoveEffect.log_target(), HookCategory::ItemEffect.log_target());
  assert_eq!(HookCategory::ScriptMenu.log_target(), "splice.script_menus");
}

#[test]
fn dispatch_functions_encode_the_outcome() {
  let chain = HandlerChain::<SpecialProcessArgs,>::new(HookCategory::SpecialProcess.log_target(),).with(
    "echo",
    |args:&mut SpecialProcessArgs| {
      if args.id >= 100 {
        Outcome::Handled(Some(args.arg2,),)
      }
      else {
        Outcome::NotHandled
      }
    },
  );

  assert_eq!(dispatch_registers(&chain, [0, 100, 0, 9]), 0x0000_0009_0000_0001);
  assert_eq!(dispatch_registers(&chain, [0, 99, 0, 9]), 0);
}

#[test]
fn registries_check_their_bounds() {
  let registry = Registry::new("test", 80, vec!["eighty", "eighty one"],);
  assert_eq!(registry.get(80), Ok(&"eighty"));
  assert_eq!(registry.get(81), Ok(&"eighty one"));
  assert_eq!(registry.index_of(81), Ok(1));
  assert_eq!(
    registry.get(82),
    Err(DispatchError::IndexOutOfRange {
      category:"test",
      id:82,
      first:80,
      len:2,
    })
  );
  assert!(registry.get(79).is_err());

  // Unknown ids are not handled
  assert_eq!(registry.dispatch(3, |_| Outcome::Handled(None)), Outcome::NotHandled);
  assert_eq!(registry.dispatch(80, |_| Outcome::Handled(None)), Outcome::Handled(None));

  let empty = Registry::<u8,>::new("test", 0, Vec::new(),);
  assert!(empty.is_empty());
  assert!(empty.get(0).is_err());
}

static RAN:AtomicU32 = AtomicU32::new(0,);

fn mark_ran(args:&CustomInstructionArgs,) {
  RAN.store(FIRST_CUSTOM_OPCODE + args.index, Ordering::SeqCst,);
}

#[test]
fn custom_instructions_run_by_index() {
  let instructions = Registry::instructions(&[
    CustomInstruction {
      name:"set_flag_ex",
      parameter_count:2,
      run:mark_ran,
    },
    CustomInstruction {
      name:"print_all",
      parameter_count:-1,
      run:mark_ran,
    },
  ],);

  assert_eq!(instructions.first_id(), 0x1000);
  assert_eq!(instructions.parameter_count(0x1001), Some(-1));
  assert_eq!(instructions.parameter_count(0x1002), None);

  let args = CustomInstructionArgs::from_registers([0x1001, 0, 0, 0],);
  assert_eq!(instructions.run_instruction(&args), Outcome::Handled(None));
  assert_eq!(RAN.load(Ordering::SeqCst), 0x1001);

  let out_of_range = CustomInstructionArgs::from_registers([0x1002, 0, 0, 0],);
  assert_eq!(instructions.run_instruction(&out_of_range), Outcome::NotHandled);
}

static DISPATCHED:AtomicU32 = AtomicU32::new(0,);

fn mark_dispatched(args:&CustomInstructionArgs,) {
  DISPATCHED.store(args.args.0, Ordering::SeqCst,);
}

#[test]
fn custom_instructions_dispatch_from_raw_opcodes() {
  let instructions = Registry::instructions(&[
    CustomInstruction {
      name:"set_flag_ex",
      parameter_count:2,
      run:mark_dispatched,
    },
    CustomInstruction {
      name:"print_all",
      parameter_count:-1,
      run:mark_dispatched,
    },
  ],);
  let chain = HandlerChain::<CustomInstructionArgs,>::new(HookCategory::CustomInstruction.log_target(),)
    .with("custom instructions", move |args:&mut CustomInstructionArgs| instructions.run_instruction(args,),);

  // The script engine hands over the opcode it read
  assert_eq!(dispatch_registers(&chain, [0x1001, 0x0220_0000, 0x0230_0040, 0]), 1);
  assert_eq!(DISPATCHED.load(Ordering::SeqCst), 0x0230_0040);

  // Built-in opcodes and ones past the table fall through
  assert_eq!(dispatch_registers(&chain, [0x0FFF, 0, 0x0230_0080, 0]), 0);
  assert_eq!(dispatch_registers(&chain, [0x1002, 0, 0x0230_0080, 0]), 0);
  assert_eq!(DISPATCHED.load(Ordering::SeqCst), 0x0230_0040);
}

static MENU_FRAMES:AtomicU32 = AtomicU32::new(0,);
static MENU_CLOSED:AtomicU32 = AtomicU32::new(0,);

fn menu_create() {
  MENU_FRAMES.store(0, Ordering::SeqCst,);
}

fn menu_update() -> Option<i32,> {
  // Finishes on the third frame
  let frame = MENU_FRAMES.fetch_add(1, Ordering::SeqCst,) + 1;
  (frame >= 3).then_some(4,)
}

fn menu_close() {
  MENU_CLOSED.fetch_add(1, Ordering::SeqCst,);
}

#[test]
fn custom_menus_update_until_finished() {
  let menus = Registry::menus(&[CustomMenu {
    prompt_string_id:0x3A10,
    confirm_string_id:0x3A11,
    create:menu_create,
    update:menu_update,
    close:menu_close,
  }],);
  assert_eq!(menus.first_id(), FIRST_CUSTOM_MENU);

  assert_eq!(menus.open_menu(80), Outcome::Handled(None));
  assert_eq!(menus.update_menu(80), Outcome::NotHandled);
  assert_eq!(menus.update_menu(80), Outcome::NotHandled);
  assert_eq!(menus.update_menu(80), Outcome::Handled(Some(4)));
  assert_eq!(MENU_CLOSED.load(Ordering::SeqCst), 1);

  // Unknown menus finish at once
  assert_eq!(menus.open_menu(81), Outcome::NotHandled);
  assert_eq!(menus.update_menu(81), Outcome::Handled(Some(-1)));
  assert_eq!(menus.update_menu(12), Outcome::Handled(Some(-1)));
}
