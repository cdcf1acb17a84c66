//! String literal lexing and escape decoding.

use crate::token::Token;
use crate::Lexer;

/// Decodes a lowercase hex digit.
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(10 + b - b'a'),
        _ => None,
    }
}

impl<'a> Lexer<'a> {
    /// Lexes a string literal delimited by `'` or `"`.
    ///
    /// The closing delimiter matches the opening one. A backslash escapes
    /// the next byte: `a b f n r t v` decode to control codes, `xHH`
    /// consumes two lowercase hex digits and decodes to one byte, and any
    /// other escape decodes to a null byte that is silently dropped from
    /// the payload. Reaching end of input before the closing delimiter is
    /// an error.
    pub(crate) fn lex_string(&mut self) -> Token {
        let delimiter = self.cursor.current();
        self.cursor.advance();

        let mut content = Vec::new();
        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated string literal".to_string());
                return Token::Eof;
            }

            let b = self.cursor.current();
            if b == delimiter {
                self.cursor.advance();
                break;
            }

            if b == b'\\' {
                self.cursor.advance();
                if let Some(decoded) = self.lex_escape() {
                    content.push(decoded);
                }
            } else {
                content.push(b);
                self.cursor.advance();
            }
        }

        Token::Str(content)
    }

    /// Decodes one escape sequence, the backslash already consumed.
    ///
    /// Returns `None` for escapes that decode to the dropped null byte.
    fn lex_escape(&mut self) -> Option<u8> {
        let c = self.cursor.current();
        self.cursor.advance();
        match c {
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0C),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0B),
            b'x' => {
                let hi = hex_digit(self.cursor.current());
                if hi.is_some() {
                    self.cursor.advance();
                }
                let lo = hex_digit(self.cursor.current());
                if lo.is_some() {
                    self.cursor.advance();
                }
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Some((hi << 4) | lo),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
