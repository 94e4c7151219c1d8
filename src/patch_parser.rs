use crate::{
  assembler::Assembler,
  errors::PatchError,
  expression::{to_u32, Expr},
  image::RegionTable,
  patch::PatchOperation,
  src_file::{SourceFile, SourceLoc},
  symbol_table::SymbolTable,
  tokenizer::{Lexer, Span, TokenKind},
};
use std::collections::BTreeSet;

/// An open `{` block.
enum Frame {
  Region { name:String, },
  Guard { active:bool, },
}

struct OpenFrame {
  frame:Frame,
  loc:SourceLoc,
}

/// The target currently collecting instructions.
struct Target {
  text:String,
  region:String,
  address:u32,
  cursor:u32,
  bytes:Vec<u8,>,
  loc:SourceLoc,
}

/// Parses one patch file into operations, in source order.
///
/// ```text
/// arm9 {
///   HasLowHealth+4:
///     mov r0, #1
///     bx lr
///   ifdef CUSTOM_FEATURE {
///     OpcodeCheck: b HookOpcodeCheck
///   }
/// }
/// ```
pub struct PatchParser<'a,> {
  src:&'a SourceFile,
  symbols:&'a SymbolTable,
  regions:&'a RegionTable,
  defines:&'a BTreeSet<String,>,
  assembler:&'a dyn Assembler,
  frames:Vec<OpenFrame,>,
  target:Option<Target,>,
  operations:Vec<PatchOperation,>,
}

impl<'a,> PatchParser<'a,> {
  pub fn new(
    src:&'a SourceFile,
    symbols:&'a SymbolTable,
    regions:&'a RegionTable,
    defines:&'a BTreeSet<String,>,
    assembler:&'a dyn Assembler,
  ) -> Self {
    PatchParser {
      src,
      symbols,
      regions,
      defines,
      assembler,
      frames:Vec::new(),
      target:None,
      operations:Vec::new(),
    }
  }

  pub fn parse(mut self,) -> Result<Vec<PatchOperation,>, PatchError,> {
    let src = self.src;
    for (idx, raw,) in src.source_str().lines().enumerate() {
      let ln = idx as u32 + 1;
      let line = match raw.find("//",) {
        Some(comment,) => &raw[..comment],
        None => raw,
      };
      let trimmed = line.trim();
      if trimmed.is_empty() {
        continue;
      }
      let col = indent(line,) + 1;

      if trimmed == "}" {
        self.close_block(ln, col,)?;
      }
      else if let Some(header,) = trimmed.strip_suffix('{',) {
        self.open_block(header, ln, col,)?;
      }
      else if self.active() {
        self.body_line(trimmed, ln, col,)?;
      }
    }

    self.flush_target();
    if let Some(open,) = self.frames.pop() {
      return Err(PatchError::malformed("this block is never closed", open.loc,),);
    }

    log::debug!("{}: {} patch operations", self.src.file_loc(), self.operations.len());
    Ok(self.operations,)
  }

  /// Whether every enclosing guard is satisfied.
  fn active(&self,) -> bool {
    self.frames.iter().all(|open| !matches!(open.frame, Frame::Guard { active:false }),)
  }

  fn region(&self,) -> Option<&str,> {
    self.frames.iter().rev().find_map(|open| match &open.frame {
      Frame::Region { name, } => Some(name.as_str(),),
      Frame::Guard { .. } => None,
    },)
  }

  fn loc(&self, span:Span,) -> SourceLoc {
    self.src.loc(span,)
  }

  fn line_loc(&self, ln:u32, col:u32, len:usize,) -> SourceLoc {
    let len = len.max(1,) as u32;
    self.loc(Span::new([0, ln, col], [0, ln, col + len - 1],),)
  }

  fn close_block(&mut self, ln:u32, col:u32,) -> Result<(), PatchError,> {
    self.flush_target();
    match self.frames.pop() {
      Some(_,) => Ok((),),
      None => Err(PatchError::malformed("'}' does not close any block", self.line_loc(ln, col, 1,),),),
    }
  }

  fn open_block(&mut self, header:&str, ln:u32, col:u32,) -> Result<(), PatchError,> {
    self.flush_target();
    let tokens = Lexer::starting_at(header, ln, col,).tokenize().map_err(|err| PatchError::Lex {
      loc:self.loc(err.span(),),
      err,
    },)?;
    let header_loc = self.line_loc(ln, col, header.trim_end().len() + 1,);
    let words = tokens
      .iter()
      .filter(|tok| tok.kind != TokenKind::Eof,)
      .map(|tok| tok.ident().map(|name| (name, tok.span,),),)
      .collect::<Option<Vec<_,>,>>();

    let frame = match words.as_deref() {
      Some([(kwd, _,), (name, _,),],) if *kwd == "ifdef" || *kwd == "ifndef" => {
        let defined = self.symbols.contains(name,) || self.defines.contains(*name,);
        let active = self.active() && defined == (*kwd == "ifdef");
        log::trace!("{header_loc}: guard {kwd} {name} is {}", if active { "active" } else { "inactive" });
        Frame::Guard { active, }
      }
      Some([(name, span,),],) => {
        if self.region().is_some() {
          return Err(PatchError::malformed("region blocks cannot be nested", self.loc(*span,),),);
        }
        if self.active() {
          self.regions.require(name, &self.loc(*span,),)?;
        }
        Frame::Region { name:name.to_string(), }
      }
      _ => {
        return Err(PatchError::malformed(
          format!("'{}{{' is not a region or guard header", header.trim_end()),
          header_loc,
        ),)
      }
    };

    self.frames.push(OpenFrame { frame, loc:header_loc, },);
    Ok((),)
  }

  fn body_line(&mut self, trimmed:&str, ln:u32, col:u32,) -> Result<(), PatchError,> {
    let mut rest = trimmed;
    let mut rest_col = col;

    if let Some(colon,) = trimmed.find(':',) {
      if let Some(expr,) = Expr::parse_str(&trimmed[..colon],) {
        let expr_col = col + indent(&trimmed[..colon],);
        self.start_target(trimmed[..colon].trim(), expr, ln, expr_col,)?;
        rest = &trimmed[colon + 1..];
        rest_col = col + trimmed[..=colon].chars().count() as u32;
      }
    }

    let mut offset = 0;
    for piece in rest.split(';',) {
      let piece_col = rest_col + rest[..offset].chars().count() as u32;
      offset += piece.len() + 1;
      let text = piece.trim();
      if text.is_empty() {
        continue;
      }
      let text_col = piece_col + indent(piece,);
      self.instruction(text, ln, text_col,)?;
    }
    Ok((),)
  }

  fn start_target(&mut self, text:&str, expr:Expr, ln:u32, col:u32,) -> Result<(), PatchError,> {
    self.flush_target();
    let span = expr.span.relative_to(ln, col,);
    let loc = self.loc(span,);

    let Some(region,) = self.region().map(str::to_string,)
    else {
      return Err(PatchError::malformed(format!("target '{text}' is outside of a region block"), loc,),);
    };

    let value = expr.evaluate(self.symbols,).map_err(|(name, span,)| PatchError::UnresolvedSymbol {
      name,
      loc:self.loc(span.relative_to(ln, col,),),
    },)?;

    if let Some(sym,) = expr.base_symbol().and_then(|name| self.symbols.get(name,),) {
      if sym.region != region {
        return Err(PatchError::malformed(
          format!("'{}' belongs to region '{}', not '{region}'", sym.name, sym.region),
          loc,
        ),);
      }
    }

    let Some(address,) = to_u32(value,)
    else {
      return Err(PatchError::malformed(format!("target '{text}' is not a 32 bit address"), loc,),);
    };

    log::trace!("{loc}: target '{text}' at {address:#010x}");
    self.target = Some(Target {
      text:text.to_string(),
      region,
      address,
      cursor:address,
      bytes:Vec::new(),
      loc,
    },);
    Ok((),)
  }

  fn instruction(&mut self, text:&str, ln:u32, col:u32,) -> Result<(), PatchError,> {
    let text_loc = self.line_loc(ln, col, text.chars().count(),);
    let Some(target,) = self.target.as_mut()
    else {
      return Err(PatchError::malformed(format!("'{text}' is not inside a target"), text_loc,),);
    };

    match self.assembler.assemble(text, target.cursor, self.symbols,) {
      Ok(bytes,) => {
        target.cursor = target.cursor.wrapping_add(bytes.len() as u32,);
        target.bytes.extend_from_slice(&bytes,);
        Ok((),)
      }
      Err(err,) => {
        let loc = self.src.loc(err.span().relative_to(ln, col,),);
        Err(PatchError::from_asm(err, text, loc,),)
      }
    }
  }

  fn flush_target(&mut self,) {
    let Some(target,) = self.target.take()
    else {
      return;
    };
    if target.bytes.is_empty() {
      log::warn!("{}: target '{}' has no instructions and is skipped", target.loc, target.text);
      return;
    }
    self.operations.push(PatchOperation {
      target:target.text,
      region:target.region,
      address:target.address,
      bytes:target.bytes,
      loc:target.loc,
    },);
  }
}

/// Number of leading whitespace characters.
fn indent(text:&str,) -> u32 {
  text.chars().take_while(|ch| ch.is_whitespace(),).count() as u32
}

/// Parses `src` with the given symbols and defines.
pub fn parse_patches(
  src:&SourceFile,
  symbols:&SymbolTable,
  regions:&RegionTable,
  defines:&BTreeSet<String,>,
  assembler:&dyn Assembler,
) -> Result<Vec<PatchOperation,>, PatchError,> {
  PatchParser::new(src, symbols, regions, defines, assembler,).parse()
}
