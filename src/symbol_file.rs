use crate::{
  errors::PatchError,
  expression::to_u32,
  image::RegionTable,
  src_file::{SourceFile, SourceLoc},
  symbol_table::{Origin, Symbol},
  tokenizer::{Lexer, TokenCursor, TokenKind},
};

/// Reads a symbol file: `name = address;` definitions grouped under
/// `/* !region NAME */` markers.
///
/// ```text
/// /* !region arm9 */
/// HasLowHealth = 0x02001000;
/// ```
pub fn parse_symbol_file(src:&SourceFile, origin:Origin, regions:&RegionTable,) -> Result<Vec<Symbol,>, PatchError,> {
  let tokens = Lexer::new(src.source_str(),)
    .tokenize()
    .map_err(|err| PatchError::Lex {
      loc:src.loc(err.span(),),
      err,
    },)?;
  let mut cursor = TokenCursor::new(tokens,);
  let mut region:Option<String,> = None;
  let mut symbols = Vec::new();

  while !cursor.at_end() {
    let token = cursor.next_token();
    match token.kind {
      TokenKind::Pragma { name, arg, } if name == "region" => {
        let loc = src.loc(token.span,);
        regions.require(&arg, &loc,)?;
        region = Some(arg,);
      }
      TokenKind::Pragma { name, .. } => {
        log::warn!("{}: ignoring unknown marker '!{name}'", src.loc(token.span));
      }
      TokenKind::Identifier(name,) => {
        let loc = src.loc(token.span,);
        let Some(region,) = &region
        else {
          return Err(PatchError::malformed(
            format!("'{name}' is defined before any region marker"),
            loc,
          ),);
        };
        if let Err(found,) = cursor.expect(&TokenKind::EqualSign,) {
          return Err(unexpected(src, "'='", &found.kind, found.span,),);
        }
        let value = cursor.next_token();
        let address = match value.kind {
          TokenKind::Num(num,) => to_u32(num,),
          _ => None,
        };
        let Some(address,) = address
        else {
          return Err(unexpected(src, "an address", &value.kind, value.span,),);
        };
        if let Err(found,) = cursor.expect(&TokenKind::Semicolon,) {
          return Err(unexpected(src, "';'", &found.kind, found.span,),);
        }
        symbols.push(Symbol::new(name, region.as_str(), address, origin, loc,),);
      }
      other => return Err(unexpected(src, "a symbol definition", &other, token.span,),),
    }
  }

  log::debug!("Read {} symbols from {}", symbols.len(), src.file_loc());
  Ok(symbols,)
}

fn unexpected(src:&SourceFile, expected:&str, found:&TokenKind, span:crate::tokenizer::Span,) -> PatchError {
  PatchError::malformed(format!("expected {expected}, found {found}"), src.loc(span,),)
}

/// Symbols of a single region given as plain pairs, as produced by tests and
/// generated stubs.
pub fn symbols_in<'a, I,>(region:&str, origin:Origin, pairs:I,) -> Vec<Symbol,>
where I: IntoIterator<Item = (&'a str, u32,),> {
  pairs
    .into_iter()
    .map(|(name, address,)| Symbol::new(name, region, address, origin, SourceLoc::default(),),)
    .collect()
}
