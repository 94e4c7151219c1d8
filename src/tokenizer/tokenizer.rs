use super::{Location, Span, Token, TokenKind};
use crate::errors::LexError;

/// String terminator
const NULL_CHAR:char = '\0';

pub(crate) struct Lexer {
  pub(crate) src:Vec<char,>,
  /// The current char the Lexer is reading.
  pub(crate) current_char:char,
  /// The current index in `src` the Lexer is reading.
  pub(crate) current:usize,
  /// The ln of the current character.
  pub(crate) ln:u32,
  /// The col of the current character.
  pub(crate) col:u32,
}

impl Lexer {
  pub(crate) fn new(src:&str,) -> Self {
    Self::starting_at(src, 1, 1,)
  }

  /// Creates a lexer over a fragment of a larger file. The fragment's first
  /// character is reported at `ln`:`col`.
  pub(crate) fn starting_at(src:&str, ln:u32, col:u32,) -> Self {
    let mut src = src.chars().collect::<Vec<char,>>();
    // Add a terminator to the end of the input
    src.push(NULL_CHAR,);
    let current_char = src[0];

    Lexer {
      src,
      current_char,
      current:0,
      ln,
      col,
    }
  }

  /// Returns the char after the current one.
  #[inline(always)]
  fn peek_next_char(&self,) -> char {
    self.src.get(self.current + 1,).copied().unwrap_or(NULL_CHAR,)
  }

  /// Eat the current [`char`].
  fn eat_current(&mut self,) {
    if self.current_char == NULL_CHAR {
      return;
    }

    if self.current_char == '\n' {
      self.ln += 1;
      self.col = 1;
    }
    else {
      self.col += 1;
    }

    self.current += 1;
    self.current_char = self.src[self.current];
  }

  /// Use the current char as the basis of the next token. Comments are skipped
  /// except for pragma comments which become [`TokenKind::Pragma`].
  pub(crate) fn next_token(&mut self,) -> Result<Token, LexError,> {
    loop {
      self.skip_whitespace();
      if !self.is_comment() {
        break;
      }
      if let Some(pragma,) = self.lex_comment()? {
        return Ok(pragma,);
      }
    }

    if self.current_char == NULL_CHAR {
      return Ok(Token {
        kind:TokenKind::Eof,
        span:Span::from_single_char(self.loc(),),
      },);
    }

    let tokenkind = match self.current_char {
      '{' => Some(TokenKind::LCurlyBracket,),
      '}' => Some(TokenKind::RCurlyBracket,),
      '[' => Some(TokenKind::LBracket,),
      ']' => Some(TokenKind::RBracket,),
      ',' => Some(TokenKind::Comma,),
      ':' => Some(TokenKind::Colon,),
      ';' => Some(TokenKind::Semicolon,),
      '+' => Some(TokenKind::Plus,),
      '-' => Some(TokenKind::Minus,),
      '=' => Some(TokenKind::EqualSign,),
      '#' => Some(TokenKind::Hash,),
      '!' => Some(TokenKind::Bang,),
      _ => None,
    };

    if let Some(kind,) = tokenkind {
      let token = Token {
        kind,
        span:Span::from_single_char(self.loc(),),
      };
      self.eat_current();
      return Ok(token,);
    }

    if is_ident_start(self.current_char,) {
      let (wrd, span,) = self.eat_while(is_ident_char,);
      return Ok(Token {
        kind:TokenKind::Identifier(wrd,),
        span,
      },);
    }

    if self.current_char.is_ascii_digit() {
      let (wrd, span,) = self.eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '_',);
      return match parse_number(&wrd,) {
        Some(num,) => Ok(Token {
          kind:TokenKind::Num(num,),
          span,
        },),
        None => Err(LexError::UnrecognizedToken { token:wrd, span, },),
      };
    }

    // Eat until whitespace is encountered. This is the error token.
    let (token, span,) = self.eat_while(|ch| !ch.is_whitespace(),);
    Err(LexError::UnrecognizedToken { token, span, },)
  }

  /// Eats characters as long as the current character satisfies the predicate.
  ///
  /// Returns a string and the [`Span`] of the string's underlying characters.
  pub(crate) fn eat_while<P,>(&mut self, mut predicate:P,) -> (String, Span,)
  where P: FnMut(char,) -> bool {
    let start = self.loc();
    // Location of the last character in the string created by this function
    let mut end = self.loc();
    let mut wrd = String::new();

    while self.current_char != NULL_CHAR && predicate(self.current_char,) {
      end = self.loc();
      wrd.push(self.current_char,);
      self.eat_current();
    }

    (wrd, Span { start, end, },)
  }

  /// Returns the `Lexer`'s current location.
  fn loc(&self,) -> Location {
    Location {
      idx:self.current as u32,
      ln:self.ln,
      col:self.col,
    }
  }

  /// Checks whether the `current_char` is the beginning of a comment.
  fn is_comment(&self,) -> bool {
    self.current_char == '/' && matches!(self.peek_next_char(), '/' | '*')
  }

  /// Consumes a comment. Returns a [`TokenKind::Pragma`] if the comment body
  /// starts with `!`.
  fn lex_comment(&mut self,) -> Result<Option<Token,>, LexError,> {
    let start = self.loc();
    let block = self.peek_next_char() == '*';
    // Eat the opening `//` or `/*`
    self.eat_current();
    self.eat_current();

    let (body, end,) = if block {
      let mut body = String::new();
      loop {
        if self.current_char == NULL_CHAR {
          return Err(LexError::UnterminatedComment {
            span:Span::from_single_char(start,),
          },);
        }
        if self.current_char == '*' && self.peek_next_char() == '/' {
          self.eat_current();
          let end = self.loc();
          self.eat_current();
          break (body, end,);
        }
        body.push(self.current_char,);
        self.eat_current();
      }
    }
    else {
      let (body, span,) = self.eat_while(|ch| ch != '\n',);
      (body, span.end,)
    };

    let body = body.trim();
    match body.strip_prefix('!',) {
      Some(pragma,) => {
        let pragma = pragma.trim();
        let (name, arg,) = pragma
          .split_once(char::is_whitespace,)
          .map(|(name, arg,)| (name, arg.trim(),),)
          .unwrap_or((pragma, "",),);
        Ok(Some(Token {
          kind:TokenKind::Pragma {
            name:name.to_string(),
            arg:arg.to_string(),
          },
          span:Span { start, end, },
        },),)
      }
      None => Ok(None,),
    }
  }

  /// Consume characters until the current character does not have the
  /// [`White_Space`](https://www.unicode.org/reports/tr31/) property.
  pub(crate) fn skip_whitespace(&mut self,) {
    self.eat_while(|ch| ch.is_whitespace(),);
  }

  /// Lexes the whole input. The returned vector always ends with
  /// [`TokenKind::Eof`].
  pub fn tokenize(&mut self,) -> Result<Vec<Token,>, LexError,> {
    let mut tokens = Vec::new();

    loop {
      let token = self.next_token()?;
      if token.kind == TokenKind::Eof {
        tokens.push(token,);
        break;
      }
      tokens.push(token,);
    }

    Ok(tokens,)
  }
}

fn is_ident_start(ch:char,) -> bool {
  ch.is_ascii_alphabetic() || "_.$".contains(ch,)
}

fn is_ident_char(ch:char,) -> bool {
  ch.is_ascii_alphanumeric() || "_.$".contains(ch,)
}

/// Parses decimal, `0x` hexadecimal and `0b` binary literals. Underscores are
/// allowed as digit separators.
fn parse_number(wrd:&str,) -> Option<i64,> {
  let digits = wrd.replace('_', "",);
  let lower = digits.to_ascii_lowercase();
  let (radix, body,) = if let Some(hex,) = lower.strip_prefix("0x",) {
    (16, hex,)
  }
  else if let Some(bin,) = lower.strip_prefix("0b",) {
    (2, bin,)
  }
  else {
    (10, lower.as_str(),)
  };

  if body.is_empty() {
    return None;
  }
  let val = u64::from_str_radix(body, radix,).ok()?;
  i64::try_from(val,).ok()
}
