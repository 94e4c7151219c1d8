use crate::{
  errors::PatchError,
  image::{ImageRegion, RegionTable},
  src_file::{SourceFile, SourceLoc},
  symbol_file::{parse_symbol_file, symbols_in},
  symbol_table::{Origin, Symbol, SymbolLookup, SymbolTable},
};

pub(crate) fn regions() -> RegionTable {
  RegionTable::new(
    vec![
      ImageRegion::new("arm9", 0x0200_0000, 0x0, 0x1000,),
      ImageRegion::new("overlay11", 0x022D_C240, 0x1000, 0x800,),
    ],
    &SourceLoc::default(),
  )
  .unwrap()
}

fn read(src:&str, origin:Origin,) -> Result<Vec<Symbol,>, PatchError,> {
  parse_symbol_file(&SourceFile::new_named(src, "symbols.sym",), origin, &regions(),)
}

#[test]
fn reads_definitions_under_markers() {
  let src = "\
/* !region arm9 */
HasLowHealth = 0x02000100;
// plain comments are skipped
IsMonsterAlive = 0x02000200;

/* !region overlay11 */
ScriptSpecialProcessCall = 0x022DC300;
";
  let symbols = read(src, Origin::Auto,).unwrap();

  assert_eq!(symbols.len(), 3);
  assert_eq!(symbols[0].name, "HasLowHealth");
  assert_eq!(symbols[0].region, "arm9");
  assert_eq!(symbols[0].address, 0x0200_0100);
  assert_eq!(symbols[0].origin, Origin::Auto);
  assert_eq!(symbols[0].loc.span.start.ln, 2);
  assert_eq!(symbols[2].region, "overlay11");
  assert_eq!(symbols[2].address, 0x022D_C300);
}

#[test]
fn definition_before_marker_is_malformed() {
  let err = read("HasLowHealth = 0x02000100;\n", Origin::Auto,).unwrap_err();
  assert!(matches!(err, PatchError::MalformedDirective { .. }));
  assert_eq!(err.loc().span.start.ln, 1);
  assert_eq!(err.loc().span.start.col, 1);
}

#[test]
fn unknown_region_marker() {
  let src = "/* !region arm9 */\nA = 0x02000000;\n/* !region overlay36 */\nB = 0x023D0000;\n";
  let err = read(src, Origin::Auto,).unwrap_err();
  match &err {
    PatchError::UnknownRegion { region, loc, } => {
      assert_eq!(region, "overlay36");
      assert_eq!(loc.span.start.ln, 3);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn missing_semicolon_is_malformed() {
  let err = read("/* !region arm9 */\nA = 0x02000000\nB = 0x02000004;\n", Origin::Auto,).unwrap_err();
  assert!(matches!(err, PatchError::MalformedDirective { .. }));
  assert_eq!(err.loc().span.start.ln, 3);
}

#[test]
fn symbol_outside_its_region() {
  let auto = read("/* !region overlay11 */\nHasLowHealth = 0x02000100;\n", Origin::Auto,).unwrap();
  let err = SymbolTable::resolve(auto, Vec::new(), &regions(),).unwrap_err();
  match err {
    PatchError::SymbolOutOfRegion { name, address, region, .. } => {
      assert_eq!(name, "HasLowHealth");
      assert_eq!(address, 0x0200_0100);
      assert_eq!(region, "overlay11");
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn user_overrides_auto() {
  let auto = symbols_in("arm9", Origin::Auto, [("HasLowHealth", 0x0200_0100,), ("Other", 0x0200_0300,),],);
  let user = symbols_in("arm9", Origin::User, [("HasLowHealth", 0x0200_0200,),],);
  let table = SymbolTable::resolve(auto, user, &regions(),).unwrap();

  assert_eq!(table.address("HasLowHealth"), Some(0x0200_0200));
  assert_eq!(table.get("HasLowHealth").unwrap().origin, Origin::User);
  assert_eq!(table.address("Other"), Some(0x0200_0300));
  assert_eq!(table.lookup("Other"), Some(0x0200_0300));
}

#[test]
fn duplicate_auto_symbols() {
  let src = "/* !region arm9 */\nA = 0x02000000;\nA = 0x02000004;\n";
  let auto = read(src, Origin::Auto,).unwrap();
  let err = SymbolTable::resolve(auto, Vec::new(), &regions(),).unwrap_err();
  match err {
    PatchError::DuplicateSymbol { name, first, loc, } => {
      assert_eq!(name, "A");
      assert_eq!(first.span.start.ln, 2);
      assert_eq!(loc.span.start.ln, 3);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn duplicate_user_symbols() {
  let user = symbols_in("arm9", Origin::User, [("A", 0x0200_0000,), ("A", 0x0200_0000,),],);
  let err = SymbolTable::resolve(Vec::new(), user, &regions(),).unwrap_err();
  assert!(matches!(err, PatchError::DuplicateSymbol { .. }));
}

#[test]
fn builtin_region_symbols() {
  let table = SymbolTable::resolve(Vec::new(), Vec::new(), &regions(),).unwrap();
  assert_eq!(table.address("arm9_start"), Some(0x0200_0000));
  assert_eq!(table.address("arm9_end"), Some(0x0200_1000));
  assert_eq!(table.address("overlay11_end"), Some(0x022D_CA40));
  assert_eq!(table.len(), 4);

  // Any definition takes precedence over a builtin
  let auto = symbols_in("arm9", Origin::Auto, [("arm9_end", 0x0200_0F00,),],);
  let table = SymbolTable::resolve(auto, Vec::new(), &regions(),).unwrap();
  assert_eq!(table.address("arm9_end"), Some(0x0200_0F00));
}

#[test]
fn generated_symbols_never_replace() {
  let auto = symbols_in("arm9", Origin::Auto, [("Hook", 0x0200_0100,),],);
  let mut table = SymbolTable::resolve(auto, Vec::new(), &regions(),).unwrap();

  let stub = Symbol::new("TrampolineHook", "arm9", 0x0200_0800, Origin::Generated, SourceLoc::default(),);
  table.insert_generated(stub.clone(),).unwrap();
  assert!(table.contains("TrampolineHook"));

  let err = table.insert_generated(stub,).unwrap_err();
  assert!(matches!(err, PatchError::DuplicateSymbol { .. }));
  let clash = Symbol::new("Hook", "arm9", 0x0200_0900, Origin::Generated, SourceLoc::default(),);
  assert!(table.insert_generated(clash).is_err());
  assert_eq!(table.address("Hook"), Some(0x0200_0100));
}

#[test]
fn listing_round_trips_through_the_reader() {
  let auto = symbols_in("arm9", Origin::Auto, [("B", 0x0200_0200,), ("A", 0x0200_0100,),],);
  let user = symbols_in("overlay11", Origin::User, [("C", 0x022D_C300,),],);
  let table = SymbolTable::resolve(auto, user, &regions(),).unwrap();

  let listing = table.listing();
  assert_eq!(
    listing,
    "/* !region arm9 */\nA = 0x02000100;\nB = 0x02000200;\n\n/* !region overlay11 */\nC = 0x022dc300;\n"
  );

  let reread = read(&listing, Origin::Auto,).unwrap();
  let names = reread.iter().map(|sym| sym.name.as_str(),).collect::<Vec<_,>>();
  assert_eq!(names, ["A", "B", "C"]);
}

#[test]
fn region_table_rejects_duplicate_names() {
  let err = RegionTable::new(
    vec![ImageRegion::new("arm9", 0, 0, 4,), ImageRegion::new("arm9", 8, 8, 4,),],
    &SourceLoc::default(),
  )
  .unwrap_err();
  assert!(matches!(err, PatchError::MalformedDirective { .. }));
}

#[test]
fn regions_must_end_inside_the_address_space() {
  let loc = SourceLoc::default();
  let err = RegionTable::new(vec![ImageRegion::new("high", 0xFFFF_F000, 0, 0x1000,)], &loc,).unwrap_err();
  assert!(matches!(err, PatchError::MalformedDirective { reason, .. } if reason.contains("'high'")));

  let table = RegionTable::new(vec![ImageRegion::new("high", 0xFFFF_F000, 0, 0xFFF,)], &loc,).unwrap();
  let symbols = SymbolTable::resolve(Vec::new(), Vec::new(), &table,).unwrap();
  assert_eq!(symbols.address("high_end"), Some(0xFFFF_FFFF));
}
