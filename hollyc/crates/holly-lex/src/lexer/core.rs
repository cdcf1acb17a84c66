//! Core lexer: state, dispatch and error reporting.

use holly_util::{Handler, Span};

use crate::cursor::Cursor;
use crate::token::Token;

/// The Holly lexer.
///
/// Produces one token per [`Lexer::next_token`] call; the parser holds
/// the single token of lookahead. The lexer shares the run's diagnostic
/// [`Handler`] and honours the sticky-error discipline: once any error
/// has been recorded it stops scanning and reports end of input.
///
/// # Example
///
/// ```
/// use holly_lex::{Lexer, Token};
/// use holly_util::Handler;
///
/// let handler = Handler::new();
/// let mut lexer = Lexer::new(b"let x", &handler);
/// assert_eq!(lexer.next_token(), Token::Let);
/// assert_eq!(lexer.next_token(), Token::Name(b"x".to_vec()));
/// assert_eq!(lexer.next_token(), Token::Eof);
/// ```
pub struct Lexer<'a> {
    /// Byte cursor over the source.
    pub(crate) cursor: Cursor<'a>,

    /// Shared diagnostic handler; doubles as the sticky error flag.
    handler: &'a Handler,

    /// Byte offset where the current token started.
    token_start: usize,

    /// Line where the current token started (1-based).
    token_start_line: u32,

    /// Column where the current token started (1-based).
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`, reporting into `handler`.
    pub fn new(source: &'a [u8], handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Scans and returns the next token.
    ///
    /// Skips whitespace and comments, then dispatches on the first byte.
    /// Returns [`Token::Eof`] at end of input, and also once any error is
    /// sticky on the handler.
    pub fn next_token(&mut self) -> Token {
        if self.handler.has_errors() {
            return Token::Eof;
        }

        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Token::Eof;
        }

        match self.cursor.current() {
            b'"' | b'\'' => self.lex_string(),
            b if b.is_ascii_alphabetic() => self.lex_name(),
            b if b.is_ascii_digit() => self.lex_number(),
            _ => self.lex_symbol(),
        }
    }

    /// The span of the token most recently returned.
    pub fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Records a lexical error at the current token position.
    pub(crate) fn report_error(&mut self, message: String) {
        self.handler.error(message, self.token_span());
    }
}
