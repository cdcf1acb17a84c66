//! holly-par - Single-pass parser/compiler for the Holly language.
//!
//! There is no AST. The parser owns the lexer, a single token of
//! lookahead, the function-state arena and the constant pool; every
//! grammar production either consumes tokens and appends instructions to
//! the current function state, or reports an error and goes sticky.
//!
//! Scopes are the central mechanism: a `{ … }` block compiles into a
//! fresh [`FuncState`] linked to the current one, gets interned in the
//! constant pool, and the use site emits `PUSHVAL` + `CALL`. Lambdas are
//! the same thing with parameter names. The compiler keeps a stack of
//! open scopes and always emits into the innermost one.
//!
//! Grammar (brackets optional, braces repeated):
//!
//! ```text
//! start          ::= statementlist
//! statementlist  ::= { statement }
//! statement      ::= ifstmt | whilestmt | forstmt
//!                  | 'return' expression
//!                  | 'break'
//!                  | 'log' expression
//!                  | 'let' Name [ '=' expression ]
//!                  | 'fn' Name namelist ( '->' expression | block )
//!                  | Name valuesuffix [ assignment expression ]
//! block          ::= '{' statementlist '}'
//! valuesuffix    ::= { '.' Name | '[' expression ']'
//!                    | '(' [ expressionlist ] ')' | '::' Name call }
//! namelist       ::= [ Name [ ':' type ] { ',' Name [ ':' type ] } ]
//! ```
//!
//! Expressions are Pratt-parsed in `expr.rs`; the emitted code contract
//! is always left operand, right operand, opcode.

mod expr;

use holly_lex::{Lexer, Token};
use holly_util::Handler;
use holly_vm::{FuncArena, FuncId, FuncKind, Ins, Opcode, Pool};

/// The output of a compilation: every function state, the constant
/// pool, and the id of the global state execution starts in.
pub struct Unit {
    pub arena: FuncArena,
    pub pool: Pool,
    pub global: FuncId,
}

/// Compiles a source buffer. Errors are sticky on `handler`; the
/// returned unit is only meaningful when no error was recorded.
pub fn compile(source: &[u8], handler: &Handler) -> Unit {
    Parser::new(source, handler).parse()
}

/// Tracks what an innermost `break` may refer to. Lambda bodies push a
/// boundary so a `break` cannot jump out of the function it lives in.
#[derive(Clone, Copy)]
enum LoopFrame {
    /// A `while`/`for` whose owner scope sat at this depth of the scope
    /// stack.
    Loop { owner_depth: usize },
    /// A function body; breaks must not cross this.
    FnBoundary,
}

/// The recursive-descent parser/compiler.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Current token (single lookahead).
    token: Token,
    handler: &'a Handler,
    arena: FuncArena,
    pool: Pool,
    global: FuncId,
    /// Stack of open scopes; instructions go to the innermost.
    scopes: Vec<FuncId>,
    /// Enclosing loops and function boundaries, innermost last.
    loops: Vec<LoopFrame>,
    /// Counter for the hidden locals `for` desugars into.
    hidden: u32,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `source`, reporting into `handler`.
    pub fn new(source: &'a [u8], handler: &'a Handler) -> Self {
        let mut arena = FuncArena::new();
        // The arena is empty, the first id always exists.
        let global = arena.alloc(FuncKind::Global, None).unwrap_or(FuncId(0));
        let mut lexer = Lexer::new(source, handler);
        let token = lexer.next_token();
        Self {
            lexer,
            token,
            handler,
            arena,
            pool: Pool::new(),
            global,
            scopes: vec![global],
            loops: Vec::new(),
            hidden: 0,
        }
    }

    /// Compiles the whole program into the global state.
    pub fn parse(mut self) -> Unit {
        self.statement_list(None);
        if !self.peek(&Token::Eof) {
            self.unexpected("statement");
        }
        self.emit(Ins::op0(Opcode::Exit));
        Unit {
            arena: self.arena,
            pool: self.pool,
            global: self.global,
        }
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    /// `statementlist ::= { statement }`, stopping at `stop` or end of
    /// input.
    fn statement_list(&mut self, stop: Option<&Token>) {
        loop {
            if self.has_errors() || self.peek(&Token::Eof) {
                return;
            }
            if let Some(stop) = stop {
                if self.peek(stop) {
                    return;
                }
            }
            self.statement();
        }
    }

    fn statement(&mut self) {
        if self.has_errors() {
            return;
        }
        match &self.token {
            Token::Semicolon => {
                // Empty statement.
                self.advance();
            }
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::For => self.for_statement(),
            Token::Return => {
                self.advance();
                self.expression();
                self.emit(Ins::op0(Opcode::Ret));
                self.accept(Token::Semicolon);
            }
            Token::Break => {
                self.advance();
                self.break_statement();
                self.accept(Token::Semicolon);
            }
            Token::Log => {
                self.advance();
                self.expression();
                self.emit(Ins::op0(Opcode::Log));
                self.accept(Token::Semicolon);
            }
            Token::Let => self.let_statement(),
            Token::Fn => self.fn_statement(),
            Token::Name(_) => self.name_statement(),
            _ => self.unexpected("statement"),
        }
    }

    /// `'let' Name [ '=' expression ]`; without an initializer the
    /// binding starts out nil.
    fn let_statement(&mut self) {
        self.expect(Token::Let);
        let Some(name) = self.expect_name() else {
            return;
        };
        if self.accept(Token::Eq) {
            self.expression();
        } else {
            let slot = self.nil_slot();
            self.emit(Ins::new(Opcode::PushVal, slot));
        }
        let slot = self.str_slot(&name);
        self.emit(Ins::new(Opcode::SLocal, slot));
        self.accept(Token::Semicolon);
    }

    /// `'fn' Name namelist ( '->' expression | block )`: compile the
    /// lambda, then bind it like a `let`.
    fn fn_statement(&mut self) {
        self.expect(Token::Fn);
        let Some(name) = self.expect_name() else {
            return;
        };
        self.function_body();
        let slot = self.str_slot(&name);
        self.emit(Ins::new(Opcode::SLocal, slot));
        self.accept(Token::Semicolon);
    }

    fn break_statement(&mut self) {
        match self.loops.last().copied() {
            Some(LoopFrame::Loop { owner_depth }) => {
                let depth = self.scopes.len().saturating_sub(owner_depth).max(1);
                self.emit(Ins::new(Opcode::Brk, depth as u16));
            }
            Some(LoopFrame::FnBoundary) | None => {
                self.error_here("'break' outside of a loop");
            }
        }
    }

    /// `'if' expression block [ 'else' ( ifstmt | block ) ]`.
    ///
    /// The condition stays on the stack across both branch tests so the
    /// `else` side can re-test it with `JMPT`; the trailing `POP`
    /// balances it.
    fn if_statement(&mut self) {
        self.expect(Token::If);
        self.expression();
        let skip_body = self.emit(Ins::branch(Opcode::JmpF, 0));
        self.block_call();
        self.patch_to_here(skip_body);
        if self.accept(Token::Else) {
            let skip_else = self.emit(Ins::branch(Opcode::JmpT, 0));
            if self.peek(&Token::If) {
                self.if_statement();
            } else {
                self.block_call();
            }
            self.patch_to_here(skip_else);
        }
        self.emit(Ins::op0(Opcode::Pop));
    }

    /// `'while' expression block`.
    fn while_statement(&mut self) {
        self.expect(Token::While);
        let loop_top = self.ip();
        self.expression();
        let exit = self.emit(Ins::branch(Opcode::JmpF, 0));
        self.loops.push(LoopFrame::Loop {
            owner_depth: self.scopes.len(),
        });
        let body = self.block();
        self.loops.pop();
        self.emit(Ins::new(Opcode::PushVal, body));
        self.emit(Ins::new(Opcode::Call, 0));
        let brk = self.emit(Ins::branch(Opcode::JmpBrk, 0));
        self.emit(Ins::op0(Opcode::Pop));
        self.emit_jump_back(loop_top);
        self.patch_to_here(exit);
        self.patch_to_here(brk);
        self.emit(Ins::op0(Opcode::Pop));
    }

    /// `'for' Name 'in' expression block`, desugared to an index loop
    /// over an array. The subject and counter live in hidden locals of
    /// the enclosing scope; the loop variable is rebound before every
    /// body call.
    fn for_statement(&mut self) {
        self.expect(Token::For);
        let Some(name) = self.expect_name() else {
            return;
        };
        self.expect(Token::In);
        self.expression();

        self.hidden += 1;
        let iter = self.str_slot(format!("(for-iter-{})", self.hidden).as_bytes());
        let idx = self.str_slot(format!("(for-idx-{})", self.hidden).as_bytes());
        let name_slot = self.str_slot(&name);
        let zero = self.num_slot(0.0);
        let one = self.num_slot(1.0);

        self.emit(Ins::new(Opcode::SLocal, iter));
        self.emit(Ins::new(Opcode::PushVal, zero));
        self.emit(Ins::new(Opcode::SLocal, idx));

        let loop_top = self.ip();
        self.emit(Ins::new(Opcode::GLocal, idx));
        self.emit(Ins::new(Opcode::GLocal, iter));
        self.emit(Ins::op0(Opcode::Len));
        self.emit(Ins::op0(Opcode::Lt));
        let exit = self.emit(Ins::branch(Opcode::JmpF, 0));

        self.emit(Ins::new(Opcode::GLocal, iter));
        self.emit(Ins::new(Opcode::GLocal, idx));
        self.emit(Ins::op0(Opcode::GetIndex));
        self.emit(Ins::new(Opcode::SLocal, name_slot));

        self.loops.push(LoopFrame::Loop {
            owner_depth: self.scopes.len(),
        });
        let body = self.block();
        self.loops.pop();
        self.emit(Ins::new(Opcode::PushVal, body));
        self.emit(Ins::new(Opcode::Call, 0));
        let brk = self.emit(Ins::branch(Opcode::JmpBrk, 0));
        self.emit(Ins::op0(Opcode::Pop));

        self.emit(Ins::new(Opcode::GLocal, idx));
        self.emit(Ins::new(Opcode::PushVal, one));
        self.emit(Ins::op0(Opcode::Add));
        self.emit(Ins::new(Opcode::RLocal, idx));
        self.emit_jump_back(loop_top);

        self.patch_to_here(exit);
        self.patch_to_here(brk);
        self.emit(Ins::op0(Opcode::Pop));
    }

    /// `Name valuesuffix [ assignment expression ]` in statement
    /// position: a call or access chain, optionally ending in a store.
    /// The chain's value, when there is one left, is discarded.
    fn name_statement(&mut self) {
        let Some(name) = self.expect_name() else {
            return;
        };
        let target = self.value_suffix(name);

        if self.accept(Token::Eq) {
            self.assign(target);
            self.accept(Token::Semicolon);
            return;
        }
        if let Some(op) = self.compound_op() {
            self.advance();
            self.compound_assign(target, op);
            self.accept(Token::Semicolon);
            return;
        }

        self.flush_load(target);
        self.emit(Ins::op0(Opcode::Pop));
        self.accept(Token::Semicolon);
    }

    /// Plain assignment: compile the right-hand side, then store into
    /// the pending target.
    fn assign(&mut self, target: Pending) {
        match target {
            Pending::Name(name) => {
                self.expression();
                let slot = self.str_slot(&name);
                self.emit(Ins::new(Opcode::RLocal, slot));
            }
            Pending::Field(slot) => {
                self.expression();
                self.emit(Ins::new(Opcode::SetField, slot));
                self.emit(Ins::op0(Opcode::Pop));
            }
            Pending::Index => {
                self.expression();
                self.emit(Ins::op0(Opcode::SetIndex));
                self.emit(Ins::op0(Opcode::Pop));
            }
            Pending::Loaded => self.error_here("cannot assign to this expression"),
        }
    }

    /// Compound assignment desugars to load, operate, rebind; it is
    /// only available for plain name targets.
    fn compound_assign(&mut self, target: Pending, op: Opcode) {
        match target {
            Pending::Name(name) => {
                let slot = self.str_slot(&name);
                self.emit(Ins::new(Opcode::GLocal, slot));
                self.expression();
                self.emit(Ins::op0(op));
                self.emit(Ins::new(Opcode::RLocal, slot));
            }
            _ => self.error_here("compound assignment target must be a name"),
        }
    }

    /// Maps a compound-assignment token to its operation.
    fn compound_op(&self) -> Option<Opcode> {
        let op = match self.token {
            Token::PlusEq => Opcode::Add,
            Token::MinusEq => Opcode::Sub,
            Token::StarEq => Opcode::Mult,
            Token::SlashEq => Opcode::Div,
            Token::PercentEq => Opcode::Mod,
            Token::AmpEq => Opcode::BitAnd,
            Token::PipeEq => Opcode::BitOr,
            Token::CaretEq => Opcode::BitXor,
            Token::ShlEq => Opcode::Shl,
            Token::ShrEq => Opcode::Shr,
            _ => return None,
        };
        Some(op)
    }

    // =========================================================================
    // SCOPES
    // =========================================================================

    /// `block ::= '{' statementlist '}'`: compile into a fresh block
    /// state and return its constant-pool slot. The caller decides where
    /// the `PUSHVAL`/`CALL` go relative to its jumps.
    fn block(&mut self) -> u16 {
        let parent = self.cur();
        let Some(id) = self.arena.alloc(FuncKind::Block, Some(parent)) else {
            self.error_here("too many function states");
            return 0;
        };
        self.expect(Token::LBrace);
        self.scopes.push(id);
        self.statement_list(Some(&Token::RBrace));
        self.expect(Token::RBrace);
        self.scopes.pop();
        self.func_slot(id)
    }

    /// Compiles a block and emits the inline call to it.
    fn block_call(&mut self) {
        let slot = self.block();
        self.emit(Ins::new(Opcode::PushVal, slot));
        self.emit(Ins::new(Opcode::Call, 0));
    }

    /// `namelist ( '->' expression | block )`: the shared tail of named
    /// functions and lambdas. Compiles into a fresh lambda state and
    /// emits `PUSHVAL <slot>` in the enclosing scope.
    pub(crate) fn function_body(&mut self) {
        let parent = self.cur();
        let Some(id) = self.arena.alloc(FuncKind::Lambda, Some(parent)) else {
            self.error_here("too many function states");
            return;
        };

        // namelist: parameter names with optional type hints.
        if let Token::Name(_) = self.token {
            loop {
                let Some(param) = self.expect_name() else {
                    break;
                };
                self.arena[id].params.push(param);
                self.type_hint();
                if !self.accept(Token::Comma) {
                    break;
                }
            }
        }

        self.loops.push(LoopFrame::FnBoundary);
        self.scopes.push(id);
        if self.accept(Token::Arrow) {
            self.expression();
            // Implicit return of the expression body.
            self.emit(Ins::op0(Opcode::Ret));
        } else if self.peek(&Token::LBrace) {
            self.advance();
            self.statement_list(Some(&Token::RBrace));
            self.expect(Token::RBrace);
        } else {
            self.unexpected("'->' or '{'");
        }
        self.scopes.pop();
        self.loops.pop();

        let slot = self.func_slot(id);
        self.emit(Ins::new(Opcode::PushVal, slot));
    }

    /// `[ ':' type ]` after a parameter name. The hint is checked and
    /// discarded.
    fn type_hint(&mut self) {
        if self.accept(Token::Colon) {
            if self.token.is_type() {
                self.advance();
            } else {
                self.error_here(&format!("expected type, got '{}'", self.token));
            }
        }
    }

    // =========================================================================
    // TOKEN HANDLING
    // =========================================================================

    fn has_errors(&self) -> bool {
        self.handler.has_errors()
    }

    fn advance(&mut self) {
        self.token = self.lexer.next_token();
    }

    /// One-token lookahead test.
    fn peek(&self, token: &Token) -> bool {
        !self.has_errors() && self.token == *token
    }

    /// Consumes the current token when it matches.
    fn accept(&mut self, token: Token) -> bool {
        if self.peek(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token or reports `expected-k, got-actual`.
    fn expect(&mut self, token: Token) -> bool {
        if self.accept(token.clone()) {
            return true;
        }
        if !self.has_errors() {
            self.error_here(&format!("expected '{}', got '{}'", token, self.token));
        }
        false
    }

    /// Consumes a name token and returns its bytes.
    fn expect_name(&mut self) -> Option<Vec<u8>> {
        if self.has_errors() {
            return None;
        }
        if let Token::Name(name) = &self.token {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            self.error_here(&format!("expected name, got '{}'", self.token));
            None
        }
    }

    fn unexpected(&mut self, wanted: &str) {
        if !self.has_errors() {
            self.error_here(&format!("expected {}, got '{}'", wanted, self.token));
        }
    }

    fn error_here(&mut self, message: &str) {
        self.handler.error(message, self.lexer.token_span());
    }

    // =========================================================================
    // EMISSION
    // =========================================================================

    /// The scope instructions currently go to.
    fn cur(&self) -> FuncId {
        self.scopes.last().copied().unwrap_or(self.global)
    }

    /// Appends an instruction to the current scope, returning its index.
    pub(crate) fn emit(&mut self, ins: Ins) -> usize {
        let id = self.cur();
        self.arena[id].emit(ins)
    }

    /// The current scope's write pointer.
    fn ip(&self) -> usize {
        self.arena[self.cur()].ip()
    }

    /// Backpatches the branch at `hole` to land on the next emitted
    /// instruction: operand = current-ip - hole.
    fn patch_to_here(&mut self, hole: usize) {
        let id = self.cur();
        let offset = self.arena[id].ip() - hole;
        if offset > i16::MAX as usize {
            self.error_here("jump distance too large");
            return;
        }
        let patched = self.arena[id].ins[hole].with_operand(offset as i16 as u16);
        self.arena[id].ins[hole] = patched;
    }

    /// Emits an unconditional jump back to `target`.
    fn emit_jump_back(&mut self, target: usize) {
        let offset = target as i64 - self.ip() as i64;
        if offset < i16::MIN as i64 {
            self.error_here("loop body too large");
            return;
        }
        self.emit(Ins::branch(Opcode::Jmp, offset as i16));
    }

    // =========================================================================
    // CONSTANT POOL
    // =========================================================================

    fn pool_slot(&mut self, slot: Option<u16>) -> u16 {
        match slot {
            Some(slot) => slot,
            None => {
                self.error_here("constant pool overflow");
                0
            }
        }
    }

    pub(crate) fn num_slot(&mut self, n: f64) -> u16 {
        let slot = self.pool.intern_num(n);
        self.pool_slot(slot)
    }

    pub(crate) fn str_slot(&mut self, bytes: &[u8]) -> u16 {
        let slot = self.pool.intern_str(bytes);
        self.pool_slot(slot)
    }

    pub(crate) fn bool_slot(&mut self, b: bool) -> u16 {
        let slot = self.pool.intern_bool(b);
        self.pool_slot(slot)
    }

    pub(crate) fn nil_slot(&mut self) -> u16 {
        let slot = self.pool.intern_nil();
        self.pool_slot(slot)
    }

    fn func_slot(&mut self, id: FuncId) -> u16 {
        let slot = self.pool.add_func(id);
        self.pool_slot(slot)
    }
}

/// The delayed last step of a `Name valuesuffix` chain, so statement
/// position can turn it into a store once it has seen whether `=`
/// follows.
pub(crate) enum Pending {
    /// A bare name; nothing emitted yet.
    Name(Vec<u8>),
    /// Chain value is on the stack; a field access by this constant
    /// slot is pending.
    Field(u16),
    /// Chain value and index are on the stack; an index access is
    /// pending.
    Index,
    /// The chain value itself is on the stack (for example after a
    /// call); nothing is assignable.
    Loaded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use holly_vm::Value;

    fn compile_ok(source: &[u8]) -> Unit {
        let handler = Handler::new();
        let unit = compile(source, &handler);
        assert!(
            !handler.has_errors(),
            "unexpected compile error: {:?}",
            handler.first_error()
        );
        unit
    }

    fn ops(unit: &Unit, id: FuncId) -> Vec<Opcode> {
        unit.arena[id].ins.iter().map(|i| i.op()).collect()
    }

    #[test]
    fn test_let_with_initializer() {
        let unit = compile_ok(b"let x = 1 + 2");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::PushVal,
                Opcode::PushVal,
                Opcode::Add,
                Opcode::SLocal,
                Opcode::Exit,
            ]
        );
    }

    #[test]
    fn test_let_without_initializer_pushes_nil() {
        let unit = compile_ok(b"let x");
        let global = &unit.arena[unit.global];
        assert_eq!(global.ins[0].op(), Opcode::PushVal);
        assert_eq!(
            unit.pool.get(global.ins[0].operand()),
            Some(&Value::Nil)
        );
    }

    #[test]
    fn test_literals_are_interned_once() {
        let unit = compile_ok(b"let a = 7 let b = 7");
        let global = &unit.arena[unit.global];
        assert_eq!(global.ins[0].operand(), global.ins[2].operand());
    }

    #[test]
    fn test_name_lookup_emits_glocal() {
        let unit = compile_ok(b"let y = x");
        let global = &unit.arena[unit.global];
        assert_eq!(global.ins[0].op(), Opcode::GLocal);
        assert_eq!(
            unit.pool.get(global.ins[0].operand()),
            Some(&Value::str_from(b"x"))
        );
    }

    #[test]
    fn test_block_becomes_function_state() {
        let unit = compile_ok(b"if 1 { let x = 2 }");
        // Global plus the block.
        assert_eq!(unit.arena.len(), 2);
        let block = FuncId(1);
        assert_eq!(unit.arena[block].env, Some(unit.global));
        assert_eq!(unit.arena[block].kind, FuncKind::Block);
        assert_eq!(
            ops(&unit, block),
            vec![Opcode::PushVal, Opcode::SLocal]
        );
    }

    #[test]
    fn test_if_shape() {
        let unit = compile_ok(b"if 0 { } ");
        // cond, JMPF over the body call, body, call, POP of the
        // condition, EXIT.
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::PushVal,
                Opcode::JmpF,
                Opcode::PushVal,
                Opcode::Call,
                Opcode::Pop,
                Opcode::Exit,
            ]
        );
        let global = &unit.arena[unit.global];
        // JMPF lands after the CALL.
        assert_eq!(global.ins[1].jump(), 3);
    }

    #[test]
    fn test_if_else_shape() {
        let unit = compile_ok(b"if 0 { } else { }");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::PushVal,
                Opcode::JmpF,
                Opcode::PushVal,
                Opcode::Call,
                Opcode::JmpT,
                Opcode::PushVal,
                Opcode::Call,
                Opcode::Pop,
                Opcode::Exit,
            ]
        );
    }

    #[test]
    fn test_while_shape() {
        let unit = compile_ok(b"while 0 { }");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::PushVal, // 0 condition
                Opcode::JmpF,    // 1 -> exit
                Opcode::PushVal, // 2 body
                Opcode::Call,    // 3
                Opcode::JmpBrk,  // 4 -> exit
                Opcode::Pop,     // 5 iteration condition
                Opcode::Jmp,     // 6 -> 0
                Opcode::Pop,     // 7 exit condition
                Opcode::Exit,
            ]
        );
        let global = &unit.arena[unit.global];
        assert_eq!(global.ins[1].jump(), 6);
        assert_eq!(global.ins[4].jump(), 3);
        assert_eq!(global.ins[6].jump(), -6);
    }

    #[test]
    fn test_break_emits_brk() {
        let unit = compile_ok(b"while 1 { break }");
        let body = FuncId(1);
        assert_eq!(ops(&unit, body), vec![Opcode::Brk]);
        assert_eq!(unit.arena[body].ins[0].operand(), 1);
    }

    #[test]
    fn test_nested_break_depth() {
        let unit = compile_ok(b"while 1 { if 1 { break } }");
        // The break sits in the if-block, two frames below the loop
        // owner.
        let if_block = FuncId(2);
        assert_eq!(unit.arena[if_block].ins[0].op(), Opcode::Brk);
        assert_eq!(unit.arena[if_block].ins[0].operand(), 2);
    }

    #[test]
    fn test_break_outside_loop_is_error() {
        let handler = Handler::new();
        compile(b"break", &handler);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_break_cannot_cross_lambda() {
        let handler = Handler::new();
        compile(b"while 1 { let f = fn { break } }", &handler);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_lambda_params() {
        let unit = compile_ok(b"let f = fn a, b -> a + b");
        let lambda = FuncId(1);
        assert_eq!(unit.arena[lambda].kind, FuncKind::Lambda);
        assert_eq!(
            unit.arena[lambda].params,
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        // Body: a, b, ADD, implicit RET.
        assert_eq!(
            ops(&unit, lambda),
            vec![Opcode::GLocal, Opcode::GLocal, Opcode::Add, Opcode::Ret]
        );
    }

    #[test]
    fn test_lambda_type_hints_are_discarded() {
        let unit = compile_ok(b"let f = fn a: Number, b: String -> a");
        let lambda = FuncId(1);
        assert_eq!(unit.arena[lambda].params.len(), 2);
    }

    #[test]
    fn test_bad_type_hint_is_error() {
        let handler = Handler::new();
        compile(b"let f = fn a: wat -> a", &handler);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_named_fn_statement() {
        let unit = compile_ok(b"fn add a, b -> a + b");
        assert_eq!(
            ops(&unit, unit.global),
            vec![Opcode::PushVal, Opcode::SLocal, Opcode::Exit]
        );
    }

    #[test]
    fn test_assignment_rebinds() {
        let unit = compile_ok(b"let x = 1 x = 2");
        let global_ops = ops(&unit, unit.global);
        assert!(global_ops.contains(&Opcode::RLocal));
    }

    #[test]
    fn test_field_store() {
        let unit = compile_ok(b"o.name = 1");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::GLocal,
                Opcode::PushVal,
                Opcode::SetField,
                Opcode::Pop,
                Opcode::Exit,
            ]
        );
    }

    #[test]
    fn test_index_store() {
        let unit = compile_ok(b"a[0] = 1");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::GLocal,
                Opcode::PushVal,
                Opcode::PushVal,
                Opcode::SetIndex,
                Opcode::Pop,
                Opcode::Exit,
            ]
        );
    }

    #[test]
    fn test_compound_assignment() {
        let unit = compile_ok(b"let x = 1 x += 2");
        let global_ops = ops(&unit, unit.global);
        let tail = &global_ops[2..];
        assert_eq!(
            tail,
            &[
                Opcode::GLocal,
                Opcode::PushVal,
                Opcode::Add,
                Opcode::RLocal,
                Opcode::Exit,
            ]
        );
    }

    #[test]
    fn test_compound_assignment_needs_name_target() {
        let handler = Handler::new();
        compile(b"o.f += 1", &handler);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_call_statement_pops_result() {
        let unit = compile_ok(b"f(1, 2)");
        assert_eq!(
            ops(&unit, unit.global),
            vec![
                Opcode::GLocal,
                Opcode::PushVal,
                Opcode::PushVal,
                Opcode::Call,
                Opcode::Pop,
                Opcode::Exit,
            ]
        );
        let global = &unit.arena[unit.global];
        assert_eq!(global.ins[3].operand(), 2);
    }

    #[test]
    fn test_unexpected_token_is_sticky() {
        let handler = Handler::new();
        compile(b"let 5 = 3", &handler);
        assert!(handler.has_errors());
        let message = handler.first_error().unwrap().message;
        assert!(message.contains("expected name"), "{}", message);
    }

    #[test]
    fn test_error_count_stays_at_one() {
        // Everything after the first error short-circuits.
        let handler = Handler::new();
        compile(b"let 5 = 3 let 6 = 4 while {", &handler);
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn test_semicolons_are_optional() {
        let unit = compile_ok(b"let a = 1; let b = 2;;");
        let global_ops = ops(&unit, unit.global);
        assert_eq!(global_ops.iter().filter(|o| **o == Opcode::SLocal).count(), 2);
    }
}
