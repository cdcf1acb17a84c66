//! Expression parsing and emission.
//!
//! Binary expressions are parsed with binding powers (Pratt parsing)
//! instead of the naive single-level recursion: every operator has a
//! `(left, right)` pair, left-associative operators bind one tighter on
//! the right. The emitted code contract is unchanged everywhere: left
//! operand, right operand, opcode.
//!
//! # Operator precedence (loosest to tightest)
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `..` |
//! | 2 | `or` |
//! | 3 | `and` |
//! | 4 | `\|` |
//! | 5 | `^` |
//! | 6 | `&` |
//! | 7 | `==`, `!=` |
//! | 8 | `<`, `<=`, `>`, `>=` |
//! | 9 | `<<`, `>>` |
//! | 10 | `+`, `-` |
//! | 11 | `*`, `/`, `%` |
//! | 12 | unary `!`, `~`, `-` |

use holly_lex::Token;
use holly_vm::{Ins, Opcode};

use crate::{Parser, Pending};

/// Binding power levels; higher binds tighter.
mod bp {
    /// Start of an expression.
    pub const MIN: u8 = 0;
    /// String concatenation `..`.
    pub const CONCAT: u8 = 2;
    /// Logical `or`.
    pub const LOGICAL_OR: u8 = 4;
    /// Logical `and`.
    pub const LOGICAL_AND: u8 = 6;
    /// Bitwise `|`.
    pub const BITWISE_OR: u8 = 8;
    /// Bitwise `^`.
    pub const BITWISE_XOR: u8 = 10;
    /// Bitwise `&`.
    pub const BITWISE_AND: u8 = 12;
    /// `==`, `!=`.
    pub const EQUALITY: u8 = 14;
    /// `<`, `<=`, `>`, `>=`.
    pub const COMPARISON: u8 = 16;
    /// `<<`, `>>`.
    pub const SHIFT: u8 = 18;
    /// `+`, `-`.
    pub const ADDITIVE: u8 = 20;
    /// `*`, `/`, `%`.
    pub const MULTIPLICATIVE: u8 = 22;
    /// Prefix operators.
    pub const UNARY: u8 = 24;
}

impl<'a> Parser<'a> {
    /// `expression`: compile one expression onto the current stack.
    pub(crate) fn expression(&mut self) {
        self.expr_bp(bp::MIN);
    }

    /// The Pratt core: parse a prefix expression, then fold in binary
    /// operators whose left binding power reaches `min_bp`.
    fn expr_bp(&mut self, min_bp: u8) {
        if self.has_errors() {
            return;
        }
        self.prefix();
        loop {
            if self.has_errors() {
                return;
            }
            let Some((lbp, rbp, op)) = self.infix_binding_power() else {
                return;
            };
            if lbp < min_bp {
                return;
            }
            self.advance();
            self.expr_bp(rbp);
            if self.has_errors() {
                return;
            }
            self.emit(Ins::op0(op));
        }
    }

    /// Binding powers and opcode for the current token, when it is a
    /// binary operator. All Holly operators are left-associative:
    /// `right = left + 1`.
    fn infix_binding_power(&self) -> Option<(u8, u8, Opcode)> {
        let (lbp, op) = match &self.token {
            Token::DotDot => (bp::CONCAT, Opcode::Cat),
            Token::Or => (bp::LOGICAL_OR, Opcode::Or),
            Token::And => (bp::LOGICAL_AND, Opcode::And),
            Token::Pipe => (bp::BITWISE_OR, Opcode::BitOr),
            Token::Caret => (bp::BITWISE_XOR, Opcode::BitXor),
            Token::Ampersand => (bp::BITWISE_AND, Opcode::BitAnd),
            Token::EqEq => (bp::EQUALITY, Opcode::Eq),
            Token::BangEq => (bp::EQUALITY, Opcode::Neq),
            Token::Lt => (bp::COMPARISON, Opcode::Lt),
            Token::Gt => (bp::COMPARISON, Opcode::Gt),
            Token::LtEq => (bp::COMPARISON, Opcode::Le),
            Token::GtEq => (bp::COMPARISON, Opcode::Ge),
            Token::Shl => (bp::SHIFT, Opcode::Shl),
            Token::Shr => (bp::SHIFT, Opcode::Shr),
            Token::Plus => (bp::ADDITIVE, Opcode::Add),
            Token::Minus => (bp::ADDITIVE, Opcode::Sub),
            Token::Star => (bp::MULTIPLICATIVE, Opcode::Mult),
            Token::Slash => (bp::MULTIPLICATIVE, Opcode::Div),
            Token::Percent => (bp::MULTIPLICATIVE, Opcode::Mod),
            _ => return None,
        };
        Some((lbp, lbp + 1, op))
    }

    /// A literal, unary expression, parenthesized expression, aggregate
    /// literal, lambda, or name chain.
    fn prefix(&mut self) {
        if self.has_errors() {
            return;
        }
        match self.token.clone() {
            Token::Num(n) => {
                self.advance();
                let slot = self.num_slot(n);
                self.emit(Ins::new(Opcode::PushVal, slot));
            }
            Token::Str(bytes) => {
                self.advance();
                let slot = self.str_slot(&bytes);
                self.emit(Ins::new(Opcode::PushVal, slot));
            }
            Token::Bool(b) => {
                self.advance();
                let slot = self.bool_slot(b);
                self.emit(Ins::new(Opcode::PushVal, slot));
            }
            Token::Nil => {
                self.advance();
                let slot = self.nil_slot();
                self.emit(Ins::new(Opcode::PushVal, slot));
            }
            Token::Bang => {
                self.advance();
                self.expr_bp(bp::UNARY);
                self.emit(Ins::op0(Opcode::Not));
            }
            Token::Tilde => {
                self.advance();
                self.expr_bp(bp::UNARY);
                self.emit(Ins::op0(Opcode::BitNot));
            }
            Token::Minus => {
                self.advance();
                self.expr_bp(bp::UNARY);
                self.emit(Ins::op0(Opcode::Neg));
            }
            Token::LParen => {
                self.advance();
                self.expression();
                self.expect(Token::RParen);
            }
            Token::LBrace => self.object_literal(),
            Token::LBracket => self.array_literal(),
            Token::Fn => {
                self.advance();
                self.function_body();
            }
            Token::Name(name) => {
                self.advance();
                let pending = self.value_suffix(name);
                self.flush_load(pending);
            }
            _ => self.unexpected("expression"),
        }
    }

    /// `valuesuffix ::= { '.' Name | '[' expression ']'
    ///                  | '(' args ')' | '::' Name '(' args ')' }`
    ///
    /// Emission of the final suffix is delayed one step and returned as
    /// a [`Pending`], so statement position can turn it into a store.
    /// Everything before the final suffix is emitted as loads.
    pub(crate) fn value_suffix(&mut self, name: Vec<u8>) -> Pending {
        let mut pending = Pending::Name(name);
        loop {
            if self.has_errors() {
                return pending;
            }
            match &self.token {
                Token::Dot => {
                    self.advance();
                    self.flush_load(pending);
                    let Some(field) = self.expect_name() else {
                        return Pending::Loaded;
                    };
                    let slot = self.str_slot(&field);
                    pending = Pending::Field(slot);
                }
                Token::LBracket => {
                    self.advance();
                    self.flush_load(pending);
                    self.expression();
                    self.expect(Token::RBracket);
                    pending = Pending::Index;
                }
                Token::LParen => {
                    self.advance();
                    self.flush_load(pending);
                    let argc = self.call_args();
                    self.emit(Ins::new(Opcode::Call, argc));
                    pending = Pending::Loaded;
                }
                Token::ColonColon => {
                    // recv::name(args) passes the receiver as the first
                    // argument.
                    self.advance();
                    self.flush_load(pending);
                    let Some(method) = self.expect_name() else {
                        return Pending::Loaded;
                    };
                    let slot = self.str_slot(&method);
                    self.expect(Token::LParen);
                    self.emit(Ins::op0(Opcode::Dup));
                    self.emit(Ins::new(Opcode::GetField, slot));
                    self.emit(Ins::op0(Opcode::Swap));
                    let argc = self.call_args();
                    self.emit(Ins::new(Opcode::Call, argc.saturating_add(1)));
                    pending = Pending::Loaded;
                }
                _ => return pending,
            }
        }
    }

    /// Emits the load form of a pending suffix.
    pub(crate) fn flush_load(&mut self, pending: Pending) {
        match pending {
            Pending::Name(name) => {
                let slot = self.str_slot(&name);
                self.emit(Ins::new(Opcode::GLocal, slot));
            }
            Pending::Field(slot) => {
                self.emit(Ins::new(Opcode::GetField, slot));
            }
            Pending::Index => {
                self.emit(Ins::op0(Opcode::GetIndex));
            }
            Pending::Loaded => {}
        }
    }

    /// `'(' [ expression { ',' expression } ] ')'` after the opening
    /// parenthesis has been consumed. Returns the argument count.
    fn call_args(&mut self) -> u16 {
        let mut argc: u16 = 0;
        if !self.peek(&Token::RParen) && !self.has_errors() {
            loop {
                self.expression();
                argc = argc.saturating_add(1);
                if !self.accept(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen);
        argc
    }

    /// `object ::= '{' [ Name ':' expression { ',' … } ] '}'`
    fn object_literal(&mut self) {
        self.expect(Token::LBrace);
        self.emit(Ins::op0(Opcode::NewObj));
        if !self.peek(&Token::RBrace) && !self.has_errors() {
            loop {
                let Some(key) = self.expect_name() else {
                    break;
                };
                let slot = self.str_slot(&key);
                self.expect(Token::Colon);
                self.expression();
                self.emit(Ins::new(Opcode::SetField, slot));
                if !self.accept(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RBrace);
    }

    /// `array ::= '[' [ expression { ',' expression } ] ']'`
    fn array_literal(&mut self) {
        self.expect(Token::LBracket);
        self.emit(Ins::op0(Opcode::NewArr));
        if !self.peek(&Token::RBracket) && !self.has_errors() {
            loop {
                self.expression();
                self.emit(Ins::op0(Opcode::ArrPush));
                if !self.accept(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RBracket);
    }
}
