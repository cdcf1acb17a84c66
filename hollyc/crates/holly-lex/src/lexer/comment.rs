//! Whitespace and comment skipping.
//!
//! `--` starts a line comment running to end of line; `/-` starts a
//! block comment terminated by `-/`. Block comments do not nest.

use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Skips whitespace and comments before the next token.
    ///
    /// Whitespace is ASCII space, tab and newline. After a comment,
    /// whitespace skipping resumes.
    pub(crate) fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current() {
                b' ' | b'\t' | b'\n' => self.cursor.advance(),
                b'-' if self.cursor.peek(1) == b'-' => self.skip_line_comment(),
                b'/' if self.cursor.peek(1) == b'-' => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    /// Skips a `--` comment up to (not including) the newline.
    fn skip_line_comment(&mut self) {
        self.cursor.advance_n(2);
        while !self.cursor.is_at_end() && self.cursor.current() != b'\n' {
            self.cursor.advance();
        }
    }

    /// Skips a `/- ... -/` comment. An unterminated block comment simply
    /// consumes the rest of the input.
    fn skip_block_comment(&mut self) {
        self.cursor.advance_n(2);
        while !self.cursor.is_at_end() {
            if self.cursor.current() == b'-' && self.cursor.peek(1) == b'/' {
                self.cursor.advance_n(2);
                return;
            }
            self.cursor.advance();
        }
    }
}
