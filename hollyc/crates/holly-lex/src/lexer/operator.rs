//! Operator and punctuation lexing.

use crate::token::{Token, SYMBOLS1, SYMBOLS2, SYMBOLS3};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Matches the longest symbol from the fixed tables.
    ///
    /// Three-byte symbols are tried first, then two-byte, then one-byte,
    /// so `>>=` can never lex as `>>` `=` or `>` `>` `=`. A byte no table
    /// entry matches is a lexical error.
    pub(crate) fn lex_symbol(&mut self) -> Token {
        for (bytes, token) in SYMBOLS3.iter().chain(SYMBOLS2).chain(SYMBOLS1) {
            if self.cursor.starts_with(bytes) {
                self.cursor.advance_n(bytes.len());
                return token.clone();
            }
        }

        let b = self.cursor.current();
        self.cursor.advance();
        if b.is_ascii_graphic() {
            self.report_error(format!("unexpected character '{}'", b as char));
        } else {
            self.report_error(format!("unexpected byte 0x{:02x}", b));
        }
        Token::Eof
    }
}
