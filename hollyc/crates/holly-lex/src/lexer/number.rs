//! Number literal lexing.

use crate::token::Token;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a number: `[0-9]+(\.[0-9]+)?`.
    ///
    /// The integer part accumulates in base 10; after a `.` the
    /// fractional digits accumulate separately and are divided by
    /// `10^count`. The result is always a float. Exponent notation is
    /// not supported.
    pub(crate) fn lex_number(&mut self) -> Token {
        let mut value = 0.0f64;
        while self.cursor.current().is_ascii_digit() {
            value = value * 10.0 + f64::from(self.cursor.current() - b'0');
            self.cursor.advance();
        }

        if self.cursor.current() == b'.' && self.cursor.peek(1).is_ascii_digit() {
            self.cursor.advance();
            let mut frac = 0.0f64;
            let mut digits = 0i32;
            while self.cursor.current().is_ascii_digit() {
                frac = frac * 10.0 + f64::from(self.cursor.current() - b'0');
                digits += 1;
                self.cursor.advance();
            }
            value += frac / 10.0f64.powi(digits);
        }

        Token::Num(value)
    }
}
