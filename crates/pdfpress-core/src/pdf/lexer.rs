//! Span-preserving content stream lexer.
//!
//! Unlike a full tokenizer this does not build operand values. It only
//! classifies byte ranges so that a caller can splice new bytes into a
//! stream while copying everything else through untouched. Whitespace and
//! comments fall between tokens and are never reported.

/// Classification of a lexed byte range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Integer or real number.
    Number(f64),
    /// Any other operand: name, string, boolean, null, or an array or
    /// dictionary delimiter.
    Operand,
    /// Operator keyword such as `rg`, `Tf` or `q`.
    Operator,
    /// A whole `BI ... ID ... EI` inline image, binary data included.
    InlineImage,
}

/// A lexed token and its byte range in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// The raw bytes of this token.
    pub fn bytes<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start..self.end]
    }
}

/// Returns `true` if `b` is a PDF whitespace character.
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Iterator over the tokens of a content stream.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.pos < self.input.len()
                    && self.input[self.pos] != b'\n'
                    && self.input[self.pos] != b'\r'
                {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn skip_regular(&mut self) {
        while self.pos < self.input.len() && is_regular(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Skip a literal string with balanced parentheses and escapes.
    /// An unterminated string runs to the end of input.
    fn skip_literal_string(&mut self) {
        self.pos += 1;
        let mut depth = 1u32;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'\\' => self.pos += 2,
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.input.len());
    }

    fn skip_hex_string(&mut self) {
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            self.pos += 1;
            if b == b'>' {
                return;
            }
        }
    }

    /// Consume an inline image whose `BI` keyword has just been read.
    ///
    /// The dictionary runs up to the `ID` keyword; the data runs up to an
    /// `EI` that is preceded by whitespace and followed by whitespace, a
    /// delimiter, or the end of input.
    fn skip_inline_image(&mut self) {
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.input.len() {
                return;
            }
            let start = self.pos;
            match self.next_raw() {
                Some(token) if token.kind == TokenKind::Operator => {
                    if &self.input[start..self.pos] == b"ID" {
                        break;
                    }
                }
                Some(_) => {}
                None => return,
            }
        }

        // One whitespace byte separates ID from the data.
        self.pos += 1;
        let input = self.input;
        let mut i = self.pos;
        while i + 1 < input.len() {
            if input[i] == b'E'
                && input[i + 1] == b'I'
                && i > 0
                && is_whitespace(input[i - 1])
                && (i + 2 == input.len() || !is_regular(input[i + 2]))
            {
                self.pos = i + 2;
                return;
            }
            i += 1;
        }
        self.pos = input.len();
    }

    /// Lex the next token without inline image handling.
    fn next_raw(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.input.len() {
            return None;
        }

        let start = self.pos;
        let b = self.input[self.pos];
        let kind = match b {
            b'(' => {
                self.skip_literal_string();
                TokenKind::Operand
            }
            b'<' if self.input.get(self.pos + 1) == Some(&b'<') => {
                self.pos += 2;
                TokenKind::Operand
            }
            b'>' if self.input.get(self.pos + 1) == Some(&b'>') => {
                self.pos += 2;
                TokenKind::Operand
            }
            b'<' => {
                self.skip_hex_string();
                TokenKind::Operand
            }
            b'/' => {
                self.pos += 1;
                self.skip_regular();
                TokenKind::Operand
            }
            b'[' | b']' | b'{' | b'}' | b')' | b'>' => {
                self.pos += 1;
                TokenKind::Operand
            }
            b'0'..=b'9' | b'+' | b'-' | b'.' => {
                self.skip_regular();
                parse_number(&self.input[start..self.pos])
                    .map(TokenKind::Number)
                    .unwrap_or(TokenKind::Operand)
            }
            _ => {
                self.skip_regular();
                match &self.input[start..self.pos] {
                    b"true" | b"false" | b"null" => TokenKind::Operand,
                    _ => TokenKind::Operator,
                }
            }
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let mut token = self.next_raw()?;
        if token.kind == TokenKind::Operator && token.bytes(self.input) == b"BI" {
            self.skip_inline_image();
            token.kind = TokenKind::InlineImage;
            token.end = self.pos;
        }
        Some(token)
    }
}

/// Parse a PDF number (`42`, `-7`, `3.14`, `.5`, `4.`). Exponents are not
/// part of the content stream grammar and are rejected.
fn parse_number(bytes: &[u8]) -> Option<f64> {
    let body = match bytes.first() {
        Some(b'+') | Some(b'-') => &bytes[1..],
        _ => bytes,
    };
    if body.is_empty()
        || !body.iter().all(|b| b.is_ascii_digit() || *b == b'.')
        || body.iter().filter(|&&b| b == b'.').count() > 1
        || body == b"."
    {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
