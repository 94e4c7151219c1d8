use crate::{
  assembler::{register_list, ArmAssembler, Assembler, Register},
  errors::AsmError,
};
use std::collections::HashMap;

fn symbols() -> HashMap<String, u32,> {
  let mut symbols = HashMap::new();
  symbols.insert("HasLowHealth".to_string(), 0x0200_0100,);
  symbols.insert("Data".to_string(), 0x0200_0010,);
  symbols
}

fn asm_at(text:&str, origin:u32,) -> u32 {
  let bytes = ArmAssembler.assemble(text, origin, &symbols(),).unwrap();
  u32::from_le_bytes(bytes.try_into().unwrap(),)
}

fn asm(text:&str,) -> u32 {
  asm_at(text, 0x0200_0000,)
}

fn asm_err(text:&str,) -> AsmError {
  ArmAssembler.assemble(text, 0x0200_0000, &symbols(),).unwrap_err()
}

#[test]
#[rustfmt::skip]
fn data_processing() {
  assert_eq!(asm("mov r0, #1"), 0xE3A0_0001);
  assert_eq!(asm("movs r0, r1"), 0xE1B0_0001);
  assert_eq!(asm("add r0, r0, r1"), 0xE080_0001);
  assert_eq!(asm("add r0, #1"), 0xE280_0001);
  assert_eq!(asm("sub sp, sp, #4"), 0xE24D_D004);
  assert_eq!(asm("cmp r1, #0x64"), 0xE351_0064);
  assert_eq!(asm("cmp r0, #0"), 0xE350_0000);
  assert_eq!(asm("orr r2, r2, #0x1000"), 0xE382_2A01);
  assert_eq!(asm("add r0, r1, r2, lsl #2"), 0xE081_0102);
  assert_eq!(asm("moveq r0, #0"), 0x03A0_0000);
}

#[test]
fn unencodable_immediates_use_the_complement() {
  // mvn r0, #0
  assert_eq!(asm("mov r0, #-1"), 0xE3E0_0000);
  // sub r0, r0, #4
  assert_eq!(asm("add r0, r0, #-4"), 0xE240_0004);
  // cmn r1, #1
  assert_eq!(asm("cmp r1, #-1"), 0xE371_0001);
}

#[test]
fn shifts_and_multiplies() {
  assert_eq!(asm("lsl r0, r1, #2"), 0xE1A0_0101);
  assert_eq!(asm("lsr r0, #4"), 0xE1A0_0220);
  assert_eq!(asm("mul r0, r1, r2"), 0xE000_0291);
  assert_eq!(asm("mla r0, r1, r2, r3"), 0xE020_3291);
}

#[test]
fn branches() {
  assert_eq!(asm("b 0x02000100"), 0xEA00_003E);
  assert_eq!(asm("b HasLowHealth"), 0xEA00_003E);
  assert_eq!(asm("bl HasLowHealth+4"), 0xEB00_003F);
  assert_eq!(asm_at("bl 0x02000000", 0x0200_0100), 0xEBFF_FFBE);
  assert_eq!(asm("blt HasLowHealth"), 0xBA00_003E);
  assert_eq!(asm("bne HasLowHealth"), 0x1A00_003E);
  assert_eq!(asm("bx lr"), 0xE12F_FF1E);
  assert_eq!(asm("blx r3"), 0xE12F_FF33);
}

#[test]
fn loads_and_stores() {
  assert_eq!(asm("ldr r0, [sp, #0x8]"), 0xE59D_0008);
  assert_eq!(asm("str r1, [sp, #4]"), 0xE58D_1004);
  assert_eq!(asm("ldr r0, [r1]"), 0xE591_0000);
  assert_eq!(asm("ldr r0, [r1, #-4]"), 0xE511_0004);
  assert_eq!(asm("str r0, [r1, #4]!"), 0xE5A1_0004);
  assert_eq!(asm("strb r2, [r0], #1"), 0xE4C0_2001);
  assert_eq!(asm("ldr r0, [r1, r2]"), 0xE791_0002);
  assert_eq!(asm("ldrh r0, [r1, #2]"), 0xE1D1_00B2);
  assert_eq!(asm("ldrsh r0, [r1, #0x12]"), 0xE1D1_01F2);
  assert_eq!(asm("strh r0, [r1]"), 0xE1C1_00B0);
  // pc relative
  assert_eq!(asm("ldr r0, Data"), 0xE59F_0008);
}

#[test]
fn block_transfers() {
  assert_eq!(asm("push {r3, r4, lr}"), 0xE92D_4018);
  assert_eq!(asm("pop {r4, pc}"), 0xE8BD_8010);
  assert_eq!(asm("stmfd sp!, {r4, lr}"), 0xE92D_4010);
  assert_eq!(asm("ldmfd sp!, {r4, pc}"), 0xE8BD_8010);
  assert_eq!(asm("push {r0-r3}"), 0xE92D_000F);
  assert_eq!(asm("ldmia r0, {r1, r2}"), 0xE890_0006);
}

#[test]
fn misc_instructions() {
  assert_eq!(asm("swi 0x10"), 0xEF00_0010);
  assert_eq!(asm("svc #0"), 0xEF00_0000);
  assert_eq!(asm("nop"), 0xE1A0_0000);
  assert_eq!(asm("MOV R0, #1"), 0xE3A0_0001);
}

#[test]
fn data_directives() {
  let syms = symbols();
  assert_eq!(
    ArmAssembler.assemble(".word 0x12345678", 0, &syms,).unwrap(),
    [0x78, 0x56, 0x34, 0x12]
  );
  assert_eq!(
    ArmAssembler.assemble(".word HasLowHealth", 0, &syms,).unwrap(),
    [0x00, 0x01, 0x00, 0x02]
  );
  assert_eq!(
    ArmAssembler.assemble(".hword 0x1234, 5", 0, &syms,).unwrap(),
    [0x34, 0x12, 0x05, 0x00]
  );
  assert_eq!(ArmAssembler.assemble(".byte 1, 2, 0xFF", 0, &syms,).unwrap(), [1, 2, 0xFF]);
  assert!(matches!(
    asm_err(".byte 0x100"),
    AsmError::UnencodableImmediate { value:0x100, .. }
  ));
}

#[test]
fn branch_errors() {
  assert!(matches!(
    asm_err("b 0x02000002"),
    AsmError::Misaligned { target:0x0200_0002, .. }
  ));
  assert!(matches!(
    asm_err("b 0x0A000000"),
    AsmError::BranchOutOfRange {
      target:0x0A00_0000,
      origin:0x0200_0000,
      ..
    }
  ));
  match asm_err("b Missing") {
    AsmError::UnresolvedSymbol { name, span, } => {
      assert_eq!(name, "Missing");
      assert_eq!(span.start.col, 3);
      assert_eq!(span.end.col, 9);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn operand_errors() {
  match asm_err("frob r0") {
    AsmError::UnknownMnemonic { mnemonic, span, } => {
      assert_eq!(mnemonic, "frob");
      assert_eq!((span.start.col, span.end.col), (1, 4));
    }
    other => panic!("unexpected error {other:?}"),
  }
  assert!(matches!(asm_err("mov r16, #1"), AsmError::InvalidRegister { .. }));
  assert!(matches!(asm_err("mov r0, #0x101"), AsmError::UnencodableImmediate { .. }));
  assert!(matches!(asm_err("mov r0 #1"), AsmError::UnexpectedToken { expected:"','", .. }));
  assert!(matches!(asm_err("mov r0, #1 extra"), AsmError::UnexpectedToken { .. }));
  assert!(matches!(asm_err("ldr r0, =0x1234"), AsmError::Unsupported { .. }));
  assert!(matches!(asm_err("blx HasLowHealth"), AsmError::Unsupported { .. }));
  assert!(matches!(asm_err("ldr r0, [r1, #0x1000]"), AsmError::UnencodableImmediate { .. }));
  assert!(matches!(asm_err("ldrh r0, [r1, #0x100]"), AsmError::UnencodableImmediate { .. }));
  assert!(matches!(asm_err("mov r0, @"), AsmError::Lex(_)));
}

#[test]
fn registers() {
  assert_eq!(Register::parse("sp"), Some(Register::SP));
  assert_eq!(Register::parse("R14"), Some(Register::LR));
  assert_eq!(Register::parse("ip").map(Register::idx), Some(12));
  assert_eq!(Register::parse("r01"), None);
  assert_eq!(Register::parse("r16"), None);
  assert_eq!(Register::LR.mask(), 0x4000);

  let list = [Register::new(3,).unwrap(), Register::new(4,).unwrap(), Register::LR,];
  assert_eq!(register_list(&list), "{r3, r4, lr}");
}
