//! holly-lex - Lexical analysis for the Holly language.
//!
//! The lexer turns a byte slice of source text into a stream of
//! [`Token`]s, one at a time. It is byte-oriented: source files are read
//! as raw bytes, string literals may carry arbitrary bytes, and any
//! non-ASCII byte outside a string literal is a lexical error. There is
//! no token buffering; the parser keeps the single token of lookahead the
//! grammar needs.
//!
//! Structure:
//!
//! - [`cursor`] - byte cursor with position and line/column tracking
//! - [`token`] - the token enumeration and the fixed operator tables
//! - `lexer` - the scanning logic, split by token category
//!
//! Operators are matched longest-first against the fixed tables
//! ([`token::SYMBOLS3`], then [`token::SYMBOLS2`], then
//! [`token::SYMBOLS1`]), so `==` can never lex as two `=`.
//!
//! Errors are reported into the shared [`holly_util::Handler`] and are
//! sticky: after the first error, [`Lexer::next_token`] returns
//! [`Token::Eof`] without touching the input again.

pub mod cursor;
mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::Token;

use holly_util::Handler;

/// Lexes an entire source buffer, for tests and tools.
///
/// Returns the tokens up to (not including) end of input. On a lexical
/// error the returned prefix is whatever was scanned before the error;
/// the error itself is in the handler.
///
/// # Examples
///
/// ```
/// use holly_lex::{lex, Token};
/// use holly_util::Handler;
///
/// let handler = Handler::new();
/// let tokens = lex(b"let x = 5", &handler);
/// assert_eq!(
///     tokens,
///     vec![
///         Token::Let,
///         Token::Name(b"x".to_vec()),
///         Token::Eq,
///         Token::Num(5.0),
///     ]
/// );
/// ```
pub fn lex(source: &[u8], handler: &Handler) -> Vec<Token> {
    let mut lexer = Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        if token == Token::Eof {
            break;
        }
        tokens.push(token);
    }
    tokens
}
