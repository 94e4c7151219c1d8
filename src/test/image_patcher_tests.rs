use super::symbol_table_tests::regions;
use crate::{
  errors::PatchError,
  image::Image,
  image_patcher::apply,
  patch::{ByteSpan, PatchOperation},
  src_file::SourceFile,
  tokenizer::Span,
};

fn image() -> Image {
  Image::new(vec![0; 0x1800], regions(),)
}

fn op(target:&str, region:&str, address:u32, bytes:&[u8],) -> PatchOperation {
  let src = SourceFile::new_named("", "glue.patch",);
  PatchOperation {
    target:target.to_string(),
    region:region.to_string(),
    address,
    bytes:bytes.to_vec(),
    loc:src.loc(Span::new([0, 1, 1], [0, 1, 1],),),
  }
}

#[test]
fn writes_each_operation_at_its_file_offset() {
  let ops = [
    op("HasLowHealth", "arm9", 0x0200_0100, &[1, 2, 3, 4],),
    op("ScriptCall", "overlay11", 0x022D_C300, &[5, 6],),
  ];
  let patched = apply(image(), &ops,).unwrap();

  assert_eq!(&patched.image().bytes()[0x100..0x104], &[1, 2, 3, 4]);
  // overlay11 starts at file offset 0x1000
  assert_eq!(&patched.image().bytes()[0x10C0..0x10C2], &[5, 6]);
  assert_eq!(patched.written().len(), 2);
  assert_eq!(patched.written()[0].span, ByteSpan { start:0x100, end:0x104 });
}

#[test]
fn result_does_not_depend_on_order() {
  let a = op("A", "arm9", 0x0200_0100, &[0xAA; 8],);
  let b = op("B", "arm9", 0x0200_0200, &[0xBB; 4],);

  let forward = apply(image(), &[a.clone(), b.clone()],).unwrap();
  let backward = apply(image(), &[b, a],).unwrap();
  assert_eq!(forward.image(), backward.image());
}

#[test]
fn overlap_names_both_operations() {
  let a = op("A", "arm9", 0x0200_0100, &[0; 8],);
  let b = op("B", "arm9", 0x0200_0104, &[0; 4],);

  let err = apply(image(), &[b.clone(), a.clone()],).unwrap_err();
  match err {
    PatchError::Overlap { first, second, .. } => {
      // The operation given first is reported as the one overlapped
      assert!(first.starts_with("'B'"), "{first}");
      assert!(second.starts_with("'A'"), "{second}");
      assert!(first.contains("glue.patch:1:1"), "{first}");
    }
    other => panic!("unexpected error {other:?}"),
  }

  // Adjacent operations do not overlap
  let c = op("C", "arm9", 0x0200_0108, &[0; 4],);
  assert!(apply(image(), &[a, c],).is_ok());
}

#[test]
fn overlap_behind_a_long_operation() {
  let long = op("Long", "arm9", 0x0200_0100, &[0; 0x20],);
  let short = op("Short", "arm9", 0x0200_0104, &[0; 4],);
  let late = op("Late", "arm9", 0x0200_0110, &[0; 4],);

  let err = apply(image(), &[long, short, late],).unwrap_err();
  assert!(matches!(err, PatchError::Overlap { second, .. } if second.starts_with("'Short'")));
}

#[test]
fn operations_must_stay_inside_their_region() {
  let err = apply(image(), &[op("arm9_end-2", "arm9", 0x0200_0FFE, &[0; 4],)],).unwrap_err();
  assert!(matches!(err, PatchError::OutOfBounds { region, .. } if region == "arm9"));

  let err = apply(image(), &[op("Low", "arm9", 0x01FF_FFFC, &[0; 4],)],).unwrap_err();
  assert!(matches!(err, PatchError::OutOfBounds { .. }));

  let err = apply(image(), &[op("X", "overlay36", 0x023D_0000, &[0; 4],)],).unwrap_err();
  assert!(matches!(err, PatchError::UnknownRegion { .. }));
}

#[test]
fn operations_must_stay_inside_the_file() {
  // The file ends where overlay11 begins
  let short = Image::new(vec![0; 0x1000], regions(),);
  let err = apply(short, &[op("ScriptCall", "overlay11", 0x022D_C300, &[0; 4],)],).unwrap_err();
  match err {
    PatchError::OutOfBounds { what, .. } => assert!(what.contains("past the end"), "{what}"),
    other => panic!("unexpected error {other:?}"),
  }
}

#[test]
fn patches_matching_the_image_still_apply() {
  // The pristine image already holds the pinned instruction
  let mut bytes = vec![0; 0x1800];
  bytes[0x100..0x104].copy_from_slice(&[1, 2, 3, 4],);
  let pristine = Image::new(bytes, regions(),);

  let ops = [op("PinnedCheck", "arm9", 0x0200_0100, &[1, 2, 3, 4],)];
  let first = apply(pristine.clone(), &ops,).unwrap();
  let second = apply(pristine, &ops,).unwrap();
  assert_eq!(first, second);
  assert_eq!(&first.image().bytes()[0x100..0x104], &[1, 2, 3, 4]);
  assert_eq!(first.written().len(), 1);
}

#[test]
fn reapplying_rewrites_the_same_bytes() {
  let ops = [
    op("A", "arm9", 0x0200_0100, &[1, 2, 3, 4],),
    op("B", "arm9", 0x0200_0200, &[5, 6, 7, 8],),
  ];
  let once = apply(image(), &ops,).unwrap().into_image();
  let again = apply(once.clone(), &ops,).unwrap();
  assert_eq!(again.image().bytes(), once.bytes());

  let mut changed = ops.to_vec();
  changed[1].bytes = vec![9, 9, 9, 9];
  let twice = apply(once, &changed,).unwrap();
  assert_eq!(&twice.image().bytes()[0x200..0x204], &[9, 9, 9, 9]);
}

#[test]
fn empty_operations_write_nothing() {
  let patched = apply(image(), &[op("A", "arm9", 0x0200_0100, &[],)],).unwrap();
  assert!(patched.written().is_empty());
  assert_eq!(patched.image(), &image());

  let untouched = apply(image(), &[],).unwrap();
  assert_eq!(untouched.written().len(), 0);
}
