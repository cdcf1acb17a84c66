//! Name and reserved-word lexing.

use crate::token::{keyword_from_name, Token};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a name: `[A-Za-z][A-Za-z0-9_]*`.
    ///
    /// The scanned bytes are tested against the reserved-word table; on a
    /// match the reserved token is produced and the bytes are discarded
    /// (`true`/`false` produce boolean tokens). Otherwise the token is a
    /// `Name` carrying the bytes.
    pub(crate) fn lex_name(&mut self) -> Token {
        let start = self.cursor.position();
        while self.cursor.current().is_ascii_alphanumeric() || self.cursor.current() == b'_' {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        keyword_from_name(text).unwrap_or_else(|| Token::Name(text.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{lex, Token};
    use holly_util::Handler;

    #[test]
    fn test_plain_name() {
        let handler = Handler::new();
        assert_eq!(lex(b"letter", &handler), vec![Token::Name(b"letter".to_vec())]);
    }

    #[test]
    fn test_name_with_digits_and_underscores() {
        let handler = Handler::new();
        assert_eq!(
            lex(b"my_var2", &handler),
            vec![Token::Name(b"my_var2".to_vec())]
        );
    }

    #[test]
    fn test_reserved_words() {
        let handler = Handler::new();
        assert_eq!(
            lex(b"if else while break", &handler),
            vec![Token::If, Token::Else, Token::While, Token::Break]
        );
    }

    #[test]
    fn test_reserved_prefix_is_a_name() {
        // `iffy` must not lex as `if` followed by `fy`.
        let handler = Handler::new();
        assert_eq!(lex(b"iffy", &handler), vec![Token::Name(b"iffy".to_vec())]);
    }

    #[test]
    fn test_type_names() {
        let handler = Handler::new();
        assert_eq!(
            lex(b"String Number", &handler),
            vec![Token::StringType, Token::NumberType]
        );
    }

    #[test]
    fn test_name_cannot_start_with_underscore() {
        let handler = Handler::new();
        lex(b"_x", &handler);
        assert!(handler.has_errors());
    }
}
