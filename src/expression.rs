use crate::{
  symbol_table::SymbolLookup,
  tokenizer::{Lexer, Span, Token, TokenCursor, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Term {
  Number(i64,),
  Symbol(String, Span,),
}

/// A sum of numbers and symbols, such as `HasLowHealth+4` or `arm9_end - 0x10`.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Expr {
  /// Each term with whether it is subtracted.
  terms:Vec<(bool, Term,),>,
  pub span:Span,
}

impl Expr {
  /// Parses an expression starting at the cursor. Stops at the first token that
  /// cannot continue the sum.
  pub(crate) fn parse(cursor:&mut TokenCursor,) -> Result<Expr, Token,> {
    let start = cursor.peek().span;
    let mut terms = Vec::new();
    let mut negative = cursor.eat(&TokenKind::Minus,);

    loop {
      let token = cursor.next_token();
      let term = match token.kind {
        TokenKind::Num(num,) => Term::Number(num,),
        TokenKind::Identifier(name,) => Term::Symbol(name, token.span,),
        _ => return Err(token,),
      };
      terms.push((negative, term,),);

      negative = match cursor.peek().kind {
        TokenKind::Plus => false,
        TokenKind::Minus => true,
        _ => break,
      };
      cursor.next_token();
    }

    Ok(Expr {
      terms,
      span:start.to(cursor.prev_span(),),
    },)
  }

  /// Parses `text` as a complete expression. Returns `None` if lexing fails or
  /// anything besides one expression is present.
  pub fn parse_str(text:&str,) -> Option<Expr,> {
    let tokens = Lexer::new(text,).tokenize().ok()?;
    let mut cursor = TokenCursor::new(tokens,);
    let expr = Expr::parse(&mut cursor,).ok()?;
    cursor.at_end().then_some(expr,)
  }

  /// Sums the terms. Returns the name and span of the first symbol the lookup
  /// does not know.
  pub fn evaluate(&self, symbols:&dyn SymbolLookup,) -> Result<i64, (String, Span,),> {
    let mut total:i64 = 0;
    for (negative, term,) in &self.terms {
      let val = match term {
        Term::Number(num,) => *num,
        Term::Symbol(name, span,) => match symbols.lookup(name,) {
          Some(addr,) => addr as i64,
          None => return Err((name.clone(), *span,),),
        },
      };
      total = if *negative { total.wrapping_sub(val,) } else { total.wrapping_add(val,) };
    }
    Ok(total,)
  }

  /// The first added symbol, which decides the region a target belongs to.
  pub fn base_symbol(&self,) -> Option<&str,> {
    self.terms.iter().find_map(|(negative, term,)| match term {
      Term::Symbol(name, _,) if !negative => Some(name.as_str(),),
      _ => None,
    },)
  }
}

/// Narrows an evaluated expression to a 32 bit address. Negative values wrap
/// the way the CPU would see them.
pub fn to_u32(val:i64,) -> Option<u32,> {
  if (i32::MIN as i64..=u32::MAX as i64).contains(&val,) {
    Some(val as u32,)
  }
  else {
    None
  }
}
