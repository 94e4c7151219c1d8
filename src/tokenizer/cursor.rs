use super::{Span, Token, TokenKind};

/// Walks a lexed token stream. The last token is always [`TokenKind::Eof`] and
/// the cursor never moves past it.
#[derive(Debug, Clone,)]
pub(crate) struct TokenCursor {
  tokens:Vec<Token,>,
  pos:usize,
}

impl TokenCursor {
  pub(crate) fn new(mut tokens:Vec<Token,>,) -> Self {
    if tokens.last().map_or(true, |tok| tok.kind != TokenKind::Eof,) {
      let span = tokens.last().map(|tok| tok.span,).unwrap_or_default();
      tokens.push(Token {
        kind:TokenKind::Eof,
        span,
      },);
    }
    TokenCursor { tokens, pos:0, }
  }

  pub(crate) fn peek(&self,) -> &Token {
    &self.tokens[self.pos]
  }

  /// Returns the token after the current one without consuming anything.
  pub(crate) fn peek_second(&self,) -> &Token {
    let idx = (self.pos + 1).min(self.tokens.len() - 1,);
    &self.tokens[idx]
  }

  pub(crate) fn next_token(&mut self,) -> Token {
    let token = self.tokens[self.pos].clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    token
  }

  /// Consumes the current token if it is `kind`.
  pub(crate) fn eat(&mut self, kind:&TokenKind,) -> bool {
    if &self.peek().kind == kind {
      self.next_token();
      true
    }
    else {
      false
    }
  }

  /// Consumes the current token if it is `kind`, otherwise returns the token
  /// that was found instead.
  pub(crate) fn expect(&mut self, kind:&TokenKind,) -> Result<Token, Token,> {
    if &self.peek().kind == kind {
      Ok(self.next_token(),)
    }
    else {
      Err(self.peek().clone(),)
    }
  }

  pub(crate) fn at_end(&self,) -> bool {
    self.peek().kind == TokenKind::Eof
  }

  /// Span of the token most recently consumed.
  pub(crate) fn prev_span(&self,) -> Span {
    self.tokens[self.pos.saturating_sub(1,)].span
  }
}
