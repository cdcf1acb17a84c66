//! Token definitions and the fixed symbol tables.

use std::fmt;

/// A single Holly token.
///
/// Literal classes carry their decoded payload: names and strings carry
/// bytes (string payloads are already escape-decoded), numbers carry the
/// parsed value, booleans carry their truth value. Everything else is a
/// fixed spelling.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // =========================================================================
    // RESERVED WORDS
    // =========================================================================
    /// "let" - variable declaration
    Let,
    /// "if" - conditional statement
    If,
    /// "else" - alternative branch
    Else,
    /// "return" - return from the enclosing function
    Return,
    /// "while" - loop statement
    While,
    /// "fn" - named function or lambda
    Fn,
    /// "nil" - the nil literal
    Nil,
    /// "for" - iteration statement
    For,
    /// "in" - subject separator of `for`
    In,
    /// "break" - leave the innermost loop
    Break,
    /// "and" - logical conjunction
    And,
    /// "or" - logical disjunction
    Or,
    /// "log" - write a value to standard output
    Log,

    // =========================================================================
    // TYPE NAMES
    // =========================================================================
    // Accepted (and discarded) after `:` in parameter lists.
    /// "String"
    StringType,
    /// "Number"
    NumberType,
    /// "Object"
    ObjectType,
    /// "Array"
    ArrayType,
    /// "Boolean"
    BooleanType,
    /// "Function"
    FunctionType,
    /// "Nil"
    NilType,

    // =========================================================================
    // LITERAL CLASSES
    // =========================================================================
    /// A string literal; payload bytes with escapes already decoded.
    Str(Vec<u8>),
    /// A number literal.
    Num(f64),
    /// `true` or `false`.
    Bool(bool),
    /// A name: `[A-Za-z][A-Za-z0-9_]*`, minus the reserved words.
    Name(Vec<u8>),
    /// End of input.
    Eof,

    // =========================================================================
    // THREE-CHARACTER SYMBOLS
    // =========================================================================
    /// ">>="
    ShrEq,
    /// "<<="
    ShlEq,

    // =========================================================================
    // TWO-CHARACTER SYMBOLS
    // =========================================================================
    /// "|="
    PipeEq,
    /// "-="
    MinusEq,
    /// "+="
    PlusEq,
    /// "*="
    StarEq,
    /// "^="
    CaretEq,
    /// "/="
    SlashEq,
    /// "%="
    PercentEq,
    /// "&="
    AmpEq,
    /// "<="
    LtEq,
    /// ">="
    GtEq,
    /// "<<"
    Shl,
    /// ">>"
    Shr,
    /// "::"
    ColonColon,
    /// ".."
    DotDot,
    /// "->"
    Arrow,
    /// "=="
    EqEq,
    /// "!="
    BangEq,

    // =========================================================================
    // ONE-CHARACTER SYMBOLS
    // =========================================================================
    /// "{"
    LBrace,
    /// "}"
    RBrace,
    /// "["
    LBracket,
    /// "]"
    RBracket,
    /// ":"
    Colon,
    /// "("
    LParen,
    /// ")"
    RParen,
    /// ";"
    Semicolon,
    /// ","
    Comma,
    /// "."
    Dot,
    /// "!"
    Bang,
    /// "~"
    Tilde,
    /// "*"
    Star,
    /// "|"
    Pipe,
    /// "-"
    Minus,
    /// "+"
    Plus,
    /// "^"
    Caret,
    /// "/"
    Slash,
    /// "%"
    Percent,
    /// ">"
    Gt,
    /// "<"
    Lt,
    /// "&"
    Ampersand,
    /// "="
    Eq,
    /// "\\"
    Backslash,
}

/// Three-byte symbols. Tried before the shorter tables.
pub const SYMBOLS3: &[(&[u8], Token)] = &[(b">>=", Token::ShrEq), (b"<<=", Token::ShlEq)];

/// Two-byte symbols. Tried after [`SYMBOLS3`], before [`SYMBOLS1`].
pub const SYMBOLS2: &[(&[u8], Token)] = &[
    (b"|=", Token::PipeEq),
    (b"-=", Token::MinusEq),
    (b"+=", Token::PlusEq),
    (b"*=", Token::StarEq),
    (b"^=", Token::CaretEq),
    (b"/=", Token::SlashEq),
    (b"%=", Token::PercentEq),
    (b"&=", Token::AmpEq),
    (b"<=", Token::LtEq),
    (b">=", Token::GtEq),
    (b"<<", Token::Shl),
    (b">>", Token::Shr),
    (b"::", Token::ColonColon),
    (b"..", Token::DotDot),
    (b"->", Token::Arrow),
    (b"==", Token::EqEq),
    (b"!=", Token::BangEq),
];

/// One-byte symbols, the fallback table.
pub const SYMBOLS1: &[(&[u8], Token)] = &[
    (b"{", Token::LBrace),
    (b"}", Token::RBrace),
    (b"[", Token::LBracket),
    (b"]", Token::RBracket),
    (b":", Token::Colon),
    (b"(", Token::LParen),
    (b")", Token::RParen),
    (b";", Token::Semicolon),
    (b",", Token::Comma),
    (b".", Token::Dot),
    (b"!", Token::Bang),
    (b"~", Token::Tilde),
    (b"*", Token::Star),
    (b"|", Token::Pipe),
    (b"-", Token::Minus),
    (b"+", Token::Plus),
    (b"^", Token::Caret),
    (b"/", Token::Slash),
    (b"%", Token::Percent),
    (b">", Token::Gt),
    (b"<", Token::Lt),
    (b"&", Token::Ampersand),
    (b"=", Token::Eq),
    (b"\\", Token::Backslash),
];

/// Classifies a scanned name against the reserved-word table.
///
/// `true` and `false` become boolean tokens carrying their value.
pub fn keyword_from_name(name: &[u8]) -> Option<Token> {
    let token = match name {
        b"let" => Token::Let,
        b"if" => Token::If,
        b"else" => Token::Else,
        b"return" => Token::Return,
        b"while" => Token::While,
        b"fn" => Token::Fn,
        b"true" => Token::Bool(true),
        b"false" => Token::Bool(false),
        b"nil" => Token::Nil,
        b"for" => Token::For,
        b"in" => Token::In,
        b"break" => Token::Break,
        b"and" => Token::And,
        b"or" => Token::Or,
        b"log" => Token::Log,
        b"String" => Token::StringType,
        b"Number" => Token::NumberType,
        b"Object" => Token::ObjectType,
        b"Array" => Token::ArrayType,
        b"Boolean" => Token::BooleanType,
        b"Function" => Token::FunctionType,
        b"Nil" => Token::NilType,
        _ => return None,
    };
    Some(token)
}

impl Token {
    /// The source spelling of a fixed token, or `None` for the literal
    /// classes whose spelling depends on the payload.
    pub fn lexeme(&self) -> Option<&'static str> {
        let lexeme = match self {
            Token::Let => "let",
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            Token::While => "while",
            Token::Fn => "fn",
            Token::Nil => "nil",
            Token::For => "for",
            Token::In => "in",
            Token::Break => "break",
            Token::And => "and",
            Token::Or => "or",
            Token::Log => "log",
            Token::StringType => "String",
            Token::NumberType => "Number",
            Token::ObjectType => "Object",
            Token::ArrayType => "Array",
            Token::BooleanType => "Boolean",
            Token::FunctionType => "Function",
            Token::NilType => "Nil",
            Token::ShrEq => ">>=",
            Token::ShlEq => "<<=",
            Token::PipeEq => "|=",
            Token::MinusEq => "-=",
            Token::PlusEq => "+=",
            Token::StarEq => "*=",
            Token::CaretEq => "^=",
            Token::SlashEq => "/=",
            Token::PercentEq => "%=",
            Token::AmpEq => "&=",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::ColonColon => "::",
            Token::DotDot => "..",
            Token::Arrow => "->",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::Star => "*",
            Token::Pipe => "|",
            Token::Minus => "-",
            Token::Plus => "+",
            Token::Caret => "^",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Gt => ">",
            Token::Lt => "<",
            Token::Ampersand => "&",
            Token::Eq => "=",
            Token::Backslash => "\\",
            Token::Str(_) | Token::Num(_) | Token::Bool(_) | Token::Name(_) | Token::Eof => {
                return None
            }
        };
        Some(lexeme)
    }

    /// True for the type-name tokens accepted after `:` in a namelist.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Token::StringType
                | Token::NumberType
                | Token::ObjectType
                | Token::ArrayType
                | Token::BooleanType
                | Token::FunctionType
                | Token::NilType
        )
    }
}

impl fmt::Display for Token {
    /// Formats the token the way diagnostics quote it: fixed tokens by
    /// their spelling, literal classes by their kind.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(_) => write!(f, "<string>"),
            Token::Num(_) => write!(f, "<number>"),
            Token::Bool(_) => write!(f, "<boolean>"),
            Token::Name(name) => write!(f, "{}", String::from_utf8_lossy(name)),
            Token::Eof => write!(f, "<eof>"),
            other => write!(f, "{}", other.lexeme().unwrap_or("<unknown>")),
        }
    }
}
