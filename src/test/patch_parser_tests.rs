use super::symbol_table_tests::regions;
use crate::{
  assembler::ArmAssembler,
  errors::PatchError,
  patch::PatchOperation,
  patch_parser::parse_patches,
  src_file::SourceFile,
  symbol_file::symbols_in,
  symbol_table::{Origin, SymbolTable},
};
use std::collections::BTreeSet;

fn table() -> SymbolTable {
  let mut auto = symbols_in(
    "arm9",
    Origin::Auto,
    [
      ("HasLowHealth", 0x0200_0100,),
      ("OpcodeCheck", 0x0200_0300,),
      ("HookOpcodeCheck", 0x0200_0800,),
    ],
  );
  auto.extend(symbols_in("overlay11", Origin::Auto, [("ScriptCall", 0x022D_C300,),],),);
  SymbolTable::resolve(auto, Vec::new(), &regions(),).unwrap()
}

fn parse_with(src:&str, defines:&[&str],) -> Result<Vec<PatchOperation,>, PatchError,> {
  let defines = defines.iter().map(|name| name.to_string(),).collect::<BTreeSet<_,>>();
  let src = SourceFile::new_named(src, "glue.patch",);
  parse_patches(&src, &table(), &regions(), &defines, &ArmAssembler,)
}

fn parse(src:&str,) -> Result<Vec<PatchOperation,>, PatchError,> {
  parse_with(src, &[],)
}

fn words(op:&PatchOperation,) -> Vec<u32,> {
  op.bytes
    .chunks(4,)
    .map(|word| u32::from_le_bytes(word.try_into().unwrap(),),)
    .collect()
}

#[test]
fn parses_targets_in_source_order() {
  let src = "\
// Low health always reports true
arm9 {
  HasLowHealth+4:
    mov r0, #1
    bx lr
  0x02000200: nop; nop
}
";
  let ops = parse(src,).unwrap();

  assert_eq!(ops.len(), 2);
  assert_eq!(ops[0].target, "HasLowHealth+4");
  assert_eq!(ops[0].region, "arm9");
  assert_eq!(ops[0].address, 0x0200_0104);
  assert_eq!(words(&ops[0]), [0xE3A0_0001, 0xE12F_FF1E]);
  assert_eq!(ops[0].loc.span.start.ln, 3);
  assert_eq!(ops[0].loc.span.start.col, 3);

  assert_eq!(ops[1].address, 0x0200_0200);
  assert_eq!(words(&ops[1]), [0xE1A0_0000, 0xE1A0_0000]);
}

#[test]
fn instructions_use_the_running_address() {
  let src = "arm9 {\n  OpcodeCheck: nop\n    b HookOpcodeCheck\n}\n";
  let ops = parse(src,).unwrap();

  // The branch sits at OpcodeCheck+4
  let offset = (0x0200_0800u32 - (0x0200_0304 + 8)) >> 2;
  assert_eq!(words(&ops[0]), [0xE1A0_0000, 0xEA00_0000 | offset]);
}

#[test]
fn inactive_guards_are_not_assembled() {
  let src = "\
arm9 {
  ifdef CUSTOM_FEATURE {
    HasLowHealth: b Undefined
  }
  ifndef CUSTOM_FEATURE {
    HasLowHealth: bx lr
  }
}
";
  let ops = parse(src,).unwrap();
  assert_eq!(ops.len(), 1);
  assert_eq!(words(&ops[0]), [0xE12F_FF1E]);

  let err = parse_with(src, &["CUSTOM_FEATURE"],).unwrap_err();
  match err {
    PatchError::UnresolvedSymbol { name, loc, } => {
      assert_eq!(name, "Undefined");
      assert_eq!(loc.span.start.ln, 3);
      assert_eq!(loc.span.start.col, 21);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn symbols_count_as_defined() {
  let src = "arm9 {\n  ifdef OpcodeCheck {\n    OpcodeCheck: nop\n  }\n}\n";
  assert_eq!(parse(src).unwrap().len(), 1);
}

#[test]
fn guards_may_enclose_unknown_regions() {
  let src = "\
ifdef OVERLAY_36 {
  overlay36 {
    0x023D0000: nop
  }
}
arm9 {
  HasLowHealth: nop
}
";
  let ops = parse(src,).unwrap();
  assert_eq!(ops.len(), 1);
  assert_eq!(ops[0].address, 0x0200_0100);

  let err = parse_with(src, &["OVERLAY_36"],).unwrap_err();
  assert!(matches!(err, PatchError::UnknownRegion { region, .. } if region == "overlay36"));
}

#[test]
fn empty_targets_are_skipped() {
  let src = "arm9 {\n  HasLowHealth:\n  HasLowHealth+8: bx lr\n}\n";
  let ops = parse(src,).unwrap();
  assert_eq!(ops.len(), 1);
  assert_eq!(ops[0].address, 0x0200_0108);
}

#[test]
fn unknown_region_block() {
  let err = parse("overlay99 {\n}\n",).unwrap_err();
  match err {
    PatchError::UnknownRegion { region, loc, } => {
      assert_eq!(region, "overlay99");
      assert_eq!(loc.span.start.ln, 1);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn structural_errors() {
  let malformed = |src:&str| matches!(parse(src), Err(PatchError::MalformedDirective { .. }));

  // Target outside of a region
  assert!(malformed("HasLowHealth: nop\n"));
  // Instruction outside of a target
  assert!(malformed("arm9 {\n  nop\n}\n"));
  // Stray brace
  assert!(malformed("arm9 {\n}\n}\n"));
  // Nested regions
  assert!(malformed("arm9 {\n  overlay11 {\n  }\n}\n"));
  // Not a header
  assert!(malformed("arm9 overlay11 extra {\n}\n"));
  // Target in another region than its block
  assert!(malformed("overlay11 {\n  HasLowHealth: nop\n}\n"));
}

#[test]
fn unclosed_block_points_at_its_header() {
  let err = parse("arm9 {\n  HasLowHealth: nop\n",).unwrap_err();
  assert!(matches!(err, PatchError::MalformedDirective { .. }));
  assert_eq!(err.loc().span.start.ln, 1);
}

#[test]
fn assembler_errors_point_into_the_file() {
  let err = parse("arm9 {\n  HasLowHealth:\n    mov r0, #0x101\n}\n",).unwrap_err();
  match &err {
    PatchError::Assembly { text, loc, .. } => {
      assert_eq!(text, "mov r0, #0x101");
      assert_eq!(loc.span.start.ln, 3);
      assert_eq!(loc.span.start.col, 14);
      assert_eq!(loc.path.as_deref(), Some(std::path::Path::new("glue.patch")));
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn unresolved_target() {
  let err = parse("arm9 {\n  Missing+4: nop\n}\n",).unwrap_err();
  match err {
    PatchError::UnresolvedSymbol { name, loc, } => {
      assert_eq!(name, "Missing");
      assert_eq!((loc.span.start.ln, loc.span.start.col), (2, 3));
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn builtin_symbols_are_targets() {
  let ops = parse("arm9 {\n  arm9_end-4: bx lr\n}\n",).unwrap();
  assert_eq!(ops[0].address, 0x0200_0FFC);
}
