//! The bytecode interpreter.
//!
//! Execution is a loop over a stack of at most [`MAX_FRAMES`] active
//! function states. The top frame's `scan` pointer is incremented at
//! the top of the loop, which is why `CALL` parks a callee at `scan =
//! -1` and a relative jump of `a` is `scan += a - 1`. When a frame's
//! instructions are exhausted the VM pops back to the parent and
//! resumes after the `CALL` that entered it; with no parent left, the
//! VM halts.
//!
//! Runtime errors are sticky: they are recorded on the shared handler
//! and execution stops cleanly.

use std::io::Write;

use holly_util::{Handler, Span};

use crate::{
    FuncArena, FuncId, FuncKind, Ins, Opcode, Pool, RuntimeError, RuntimeResult, Str, Value,
};

/// Upper bound on simultaneously active frames.
pub const MAX_FRAMES: usize = 256;

/// Converts a number to an array index.
fn array_index(n: f64) -> RuntimeResult<usize> {
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        return Err(RuntimeError::BadIndex(format!("{}", n)));
    }
    Ok(n as usize)
}

/// The Holly virtual machine.
///
/// Borrows the function arena and constant pool produced by the
/// compiler; `LOG` output goes to the injected writer so callers (and
/// tests) decide where it lands.
pub struct Vm<'a, W: Write> {
    arena: &'a mut FuncArena,
    pool: &'a Pool,
    handler: &'a Handler,
    out: W,
    frames: Vec<FuncId>,
    break_flag: bool,
}

impl<'a, W: Write> Vm<'a, W> {
    /// Creates a VM over compiled state.
    pub fn new(arena: &'a mut FuncArena, pool: &'a Pool, handler: &'a Handler, out: W) -> Self {
        Self {
            arena,
            pool,
            handler,
            out,
            frames: Vec::new(),
            break_flag: false,
        }
    }

    /// Runs the program starting in `entry` (normally the global state).
    ///
    /// Does nothing when an error is already sticky. A runtime error is
    /// recorded on the handler and halts execution.
    pub fn run(&mut self, entry: FuncId) {
        if self.handler.has_errors() {
            return;
        }
        self.frames.clear();
        self.break_flag = false;
        self.arena[entry].scan = -1;
        self.arena[entry].estack.clear();
        self.frames.push(entry);

        if let Err(err) = self.exec() {
            self.handler.error(err.to_string(), Span::DUMMY);
            self.frames.clear();
        }
    }

    fn exec(&mut self) -> RuntimeResult<()> {
        while let Some(&fid) = self.frames.last() {
            let fs = &mut self.arena[fid];
            fs.scan += 1;
            let idx = fs.scan as usize;
            if idx >= fs.ins.len() {
                let kind = fs.kind;
                self.frames.pop();
                // A lambda that falls off its end still produced a call
                // result.
                if kind == FuncKind::Lambda {
                    if let Some(&parent) = self.frames.last() {
                        self.arena[parent].estack.push(Value::Nil);
                    }
                }
                continue;
            }
            let ins = fs.ins[idx];
            self.step(fid, ins)?;
        }
        Ok(())
    }

    fn step(&mut self, fid: FuncId, ins: Ins) -> RuntimeResult<()> {
        let a = ins.operand();
        match ins.op() {
            Opcode::Nop => {}

            Opcode::PushVal => {
                let value = self.constant(a)?.clone();
                self.push(fid, value);
            }
            Opcode::SLocal => {
                let name = self.name_at(a)?;
                let value = self.pop(fid)?;
                self.arena[fid].locals.set(name.as_bytes(), value)?;
            }
            Opcode::GLocal => {
                let name = self.name_at(a)?;
                let mut cur = Some(fid);
                let mut found = None;
                while let Some(id) = cur {
                    let fs = &self.arena[id];
                    if let Some(value) = fs.locals.get(name.as_bytes()) {
                        found = Some(value.clone());
                        break;
                    }
                    cur = fs.env;
                }
                match found {
                    Some(value) => self.push(fid, value),
                    None => return Err(RuntimeError::Undeclared(name.to_string())),
                }
            }
            Opcode::RLocal => {
                let name = self.name_at(a)?;
                let value = self.pop(fid)?;
                let mut cur = Some(fid);
                while let Some(id) = cur {
                    if self.arena[id].locals.get(name.as_bytes()).is_some() {
                        self.arena[id].locals.set(name.as_bytes(), value)?;
                        return Ok(());
                    }
                    cur = self.arena[id].env;
                }
                return Err(RuntimeError::Undeclared(name.to_string()));
            }

            Opcode::Add => self.arith(fid, "ADD", |l, r| l + r)?,
            Opcode::Sub => self.arith(fid, "SUB", |l, r| l - r)?,
            Opcode::Mult => self.arith(fid, "MULT", |l, r| l * r)?,
            Opcode::Div => self.arith(fid, "DIV", |l, r| l / r)?,
            Opcode::Mod => self.arith(fid, "MOD", |l, r| l % r)?,
            Opcode::Shl => self.arith_int(fid, "SHL", |l, r| l.wrapping_shl(r as u32))?,
            Opcode::Shr => self.arith_int(fid, "SHR", |l, r| l.wrapping_shr(r as u32))?,
            Opcode::BitAnd => self.arith_int(fid, "BAND", |l, r| l & r)?,
            Opcode::BitOr => self.arith_int(fid, "BOR", |l, r| l | r)?,
            Opcode::BitXor => self.arith_int(fid, "BXOR", |l, r| l ^ r)?,
            Opcode::Lt => self.compare(fid, "LT", |l, r| l < r)?,
            Opcode::Gt => self.compare(fid, "GT", |l, r| l > r)?,
            Opcode::Le => self.compare(fid, "LE", |l, r| l <= r)?,
            Opcode::Ge => self.compare(fid, "GE", |l, r| l >= r)?,

            Opcode::Eq => {
                let r = self.pop(fid)?;
                let l = self.pop(fid)?;
                self.push(fid, Value::Bool(l == r));
            }
            Opcode::Neq => {
                let r = self.pop(fid)?;
                let l = self.pop(fid)?;
                self.push(fid, Value::Bool(l != r));
            }
            Opcode::And => {
                let r = self.pop(fid)?;
                let l = self.pop(fid)?;
                self.push(fid, Value::Bool(l.is_truthy() && r.is_truthy()));
            }
            Opcode::Or => {
                let r = self.pop(fid)?;
                let l = self.pop(fid)?;
                self.push(fid, Value::Bool(l.is_truthy() || r.is_truthy()));
            }
            Opcode::Cat => {
                let r = self.pop(fid)?;
                let l = self.pop(fid)?;
                match (l, r) {
                    (Value::Str(l), Value::Str(r)) => self.push(fid, Value::Str(l.concat(&r))),
                    (Value::Str(_), other) | (other, _) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "CNCT",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                }
            }

            Opcode::Not => {
                let v = self.pop(fid)?;
                self.push(fid, Value::Bool(!v.is_truthy()));
            }
            Opcode::BitNot => {
                let n = self.pop_num(fid, "BNOT")?;
                self.push(fid, Value::Num(!(n as i64) as f64));
            }
            Opcode::Neg => {
                let n = self.pop_num(fid, "NEG")?;
                self.push(fid, Value::Num(-n));
            }

            Opcode::Jmp => self.jump_by(fid, ins.jump()),
            Opcode::JmpF => {
                // The tested value stays on the stack; the compiler pops
                // it at construct exit.
                if !self.peek(fid)?.is_truthy() {
                    self.jump_by(fid, ins.jump());
                }
            }
            Opcode::JmpT => {
                if self.peek(fid)?.is_truthy() {
                    self.jump_by(fid, ins.jump());
                }
            }
            Opcode::JmpBrk => {
                if self.break_flag {
                    self.break_flag = false;
                    self.jump_by(fid, ins.jump());
                }
            }

            Opcode::Call => {
                let argc = usize::from(a);
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(self.pop(fid)?);
                }
                args.reverse();
                let target = match self.pop(fid)? {
                    Value::Func(id) => id,
                    other => return Err(RuntimeError::NotCallable(other.type_name())),
                };
                if self.frames.len() >= MAX_FRAMES {
                    return Err(RuntimeError::FrameOverflow { max: MAX_FRAMES });
                }
                let params = self.arena[target].params.clone();
                let callee = &mut self.arena[target];
                callee.scan = -1;
                callee.estack.clear();
                for (i, param) in params.iter().enumerate() {
                    let value = args.get(i).cloned().unwrap_or(Value::Nil);
                    self.arena[target].locals.set(param, value)?;
                }
                self.frames.push(target);
            }
            Opcode::Ret => {
                let result = self.arena[fid].estack.pop().unwrap_or(Value::Nil);
                while let Some(popped) = self.frames.pop() {
                    if self.arena[popped].kind == FuncKind::Lambda {
                        break;
                    }
                }
                if let Some(&parent) = self.frames.last() {
                    self.push(parent, result);
                }
            }
            Opcode::Brk => {
                let depth = usize::from(a).max(1);
                for _ in 0..depth {
                    self.frames.pop();
                }
                self.break_flag = true;
            }

            Opcode::Pop => {
                self.pop(fid)?;
            }
            Opcode::Dup => {
                let v = self.peek(fid)?.clone();
                self.push(fid, v);
            }
            Opcode::Swap => {
                let top = self.pop(fid)?;
                let under = self.pop(fid)?;
                self.push(fid, top);
                self.push(fid, under);
            }

            Opcode::NewObj => self.push(fid, Value::new_obj()),
            Opcode::SetField => {
                let value = self.pop(fid)?;
                let name = self.name_at(a)?;
                match self.peek(fid)? {
                    Value::Obj(obj) => {
                        obj.borrow_mut().set(name.as_bytes(), value)?;
                    }
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "OBJSET",
                            expected: "object",
                            got: other.type_name(),
                        })
                    }
                }
            }
            Opcode::GetField => {
                let name = self.name_at(a)?;
                let value = match self.pop(fid)? {
                    Value::Obj(obj) => {
                        let table = obj.borrow();
                        table.get(name.as_bytes()).cloned().unwrap_or(Value::Nil)
                    }
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "OBJGET",
                            expected: "object",
                            got: other.type_name(),
                        })
                    }
                };
                self.push(fid, value);
            }
            Opcode::NewArr => self.push(fid, Value::new_arr()),
            Opcode::ArrPush => {
                let value = self.pop(fid)?;
                match self.peek(fid)? {
                    Value::Arr(arr) => arr.borrow_mut().push(value),
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "ARRPUSH",
                            expected: "array",
                            got: other.type_name(),
                        })
                    }
                }
            }
            Opcode::GetIndex => {
                let index = self.pop(fid)?;
                let container = self.pop(fid)?;
                let value = match (container, index) {
                    (Value::Arr(arr), Value::Num(n)) => {
                        let idx = array_index(n)?;
                        let items = arr.borrow();
                        items.get(idx).cloned().unwrap_or(Value::Nil)
                    }
                    (Value::Obj(obj), Value::Str(key)) => {
                        let table = obj.borrow();
                        table.get(key.as_bytes()).cloned().unwrap_or(Value::Nil)
                    }
                    (Value::Arr(_), other) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXGET",
                            expected: "number",
                            got: other.type_name(),
                        })
                    }
                    (Value::Obj(_), other) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXGET",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                    (other, _) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXGET",
                            expected: "array or object",
                            got: other.type_name(),
                        })
                    }
                };
                self.push(fid, value);
            }
            Opcode::SetIndex => {
                let value = self.pop(fid)?;
                let index = self.pop(fid)?;
                match (self.peek(fid)?, index) {
                    (Value::Arr(arr), Value::Num(n)) => {
                        let idx = array_index(n)?;
                        let mut items = arr.borrow_mut();
                        if idx >= items.len() {
                            items.resize(idx + 1, Value::Nil);
                        }
                        items[idx] = value;
                    }
                    (Value::Obj(obj), Value::Str(key)) => {
                        obj.borrow_mut().set(key.as_bytes(), value)?;
                    }
                    (Value::Arr(_), other) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXSET",
                            expected: "number",
                            got: other.type_name(),
                        })
                    }
                    (Value::Obj(_), other) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXSET",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                    (other, _) => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "IDXSET",
                            expected: "array or object",
                            got: other.type_name(),
                        })
                    }
                }
            }
            Opcode::Len => {
                let n = match self.pop(fid)? {
                    Value::Arr(arr) => arr.borrow().len() as f64,
                    Value::Obj(obj) => obj.borrow().len() as f64,
                    Value::Str(s) => s.len() as f64,
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            op: "LEN",
                            expected: "array, object or string",
                            got: other.type_name(),
                        })
                    }
                };
                self.push(fid, Value::Num(n));
            }

            Opcode::Log => {
                let v = self.pop(fid)?;
                writeln!(self.out, "{}", v)?;
            }
            Opcode::Exit => self.frames.clear(),
        }
        Ok(())
    }

    fn push(&mut self, fid: FuncId, value: Value) {
        self.arena[fid].estack.push(value);
    }

    fn pop(&mut self, fid: FuncId) -> RuntimeResult<Value> {
        self.arena[fid]
            .estack
            .pop()
            .ok_or(RuntimeError::StackUnderflow)
    }

    fn peek(&self, fid: FuncId) -> RuntimeResult<&Value> {
        self.arena[fid]
            .estack
            .last()
            .ok_or(RuntimeError::StackUnderflow)
    }

    fn pop_num(&mut self, fid: FuncId, op: &'static str) -> RuntimeResult<f64> {
        match self.pop(fid)? {
            Value::Num(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                op,
                expected: "number",
                got: other.type_name(),
            }),
        }
    }

    fn arith(
        &mut self,
        fid: FuncId,
        op: &'static str,
        apply: impl Fn(f64, f64) -> f64,
    ) -> RuntimeResult<()> {
        let r = self.pop_num(fid, op)?;
        let l = self.pop_num(fid, op)?;
        self.push(fid, Value::Num(apply(l, r)));
        Ok(())
    }

    fn arith_int(
        &mut self,
        fid: FuncId,
        op: &'static str,
        apply: impl Fn(i64, i64) -> i64,
    ) -> RuntimeResult<()> {
        let r = self.pop_num(fid, op)?;
        let l = self.pop_num(fid, op)?;
        self.push(fid, Value::Num(apply(l as i64, r as i64) as f64));
        Ok(())
    }

    fn compare(
        &mut self,
        fid: FuncId,
        op: &'static str,
        apply: impl Fn(f64, f64) -> bool,
    ) -> RuntimeResult<()> {
        let r = self.pop_num(fid, op)?;
        let l = self.pop_num(fid, op)?;
        self.push(fid, Value::Bool(apply(l, r)));
        Ok(())
    }

    fn jump_by(&mut self, fid: FuncId, offset: i32) {
        self.arena[fid].scan += offset - 1;
    }

    fn constant(&self, slot: u16) -> RuntimeResult<&Value> {
        self.pool.get(slot).ok_or(RuntimeError::BadConstant(slot))
    }

    fn name_at(&self, slot: u16) -> RuntimeResult<Str> {
        match self.pool.get(slot) {
            Some(Value::Str(s)) => Ok(s.clone()),
            _ => Err(RuntimeError::BadConstant(slot)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        arena: FuncArena,
        pool: Pool,
        handler: Handler,
        global: FuncId,
    }

    fn fixture() -> Fixture {
        let mut arena = FuncArena::new();
        let global = arena.alloc(FuncKind::Global, None).unwrap();
        Fixture {
            arena,
            pool: Pool::new(),
            handler: Handler::new(),
            global,
        }
    }

    fn run(fix: &mut Fixture) -> String {
        let mut out = Vec::new();
        let mut vm = Vm::new(&mut fix.arena, &fix.pool, &fix.handler, &mut out);
        vm.run(fix.global);
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_arithmetic_into_local() {
        let mut fix = fixture();
        let one = fix.pool.intern_num(1.0).unwrap();
        let two = fix.pool.intern_num(2.0).unwrap();
        let x = fix.pool.intern_str(b"x").unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, two));
        fix.arena[g].emit(Ins::op0(Opcode::Add));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, x));
        run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(fix.arena[g].locals.get(b"x"), Some(&Value::Num(3.0)));
    }

    #[test]
    fn test_jump_arithmetic() {
        // After JMPF with operand a on a falsy condition, the next
        // executed instruction is patch-site + a.
        let mut fix = fixture();
        let zero = fix.pool.intern_num(0.0).unwrap();
        let hello = fix.pool.intern_str(b"hello").unwrap();
        let world = fix.pool.intern_str(b"world").unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, zero)); // 0
        fix.arena[g].emit(Ins::branch(Opcode::JmpF, 3)); // 1 -> lands at 4
        fix.arena[g].emit(Ins::new(Opcode::PushVal, hello)); // 2
        fix.arena[g].emit(Ins::op0(Opcode::Log)); // 3
        fix.arena[g].emit(Ins::new(Opcode::PushVal, world)); // 4
        fix.arena[g].emit(Ins::op0(Opcode::Log)); // 5
        let out = run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(out, "world\n");
    }

    #[test]
    fn test_jmpf_keeps_condition() {
        let mut fix = fixture();
        let zero = fix.pool.intern_num(0.0).unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, zero));
        fix.arena[g].emit(Ins::branch(Opcode::JmpF, 1));
        run(&mut fix);
        assert_eq!(fix.arena[g].estack, vec![Value::Num(0.0)]);
    }

    #[test]
    fn test_scope_chain_walk() {
        // A block frame resolves names through its parent.
        let mut fix = fixture();
        let five = fix.pool.intern_num(5.0).unwrap();
        let x = fix.pool.intern_str(b"x").unwrap();
        let g = fix.global;
        let block = fix.arena.alloc(FuncKind::Block, Some(g)).unwrap();
        let block_slot = fix.pool.add_func(block).unwrap();
        fix.arena[block].emit(Ins::new(Opcode::GLocal, x));
        fix.arena[block].emit(Ins::op0(Opcode::Log));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, five));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, x));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, block_slot));
        fix.arena[g].emit(Ins::new(Opcode::Call, 0));
        let out = run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(out, "5\n");
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let mut fix = fixture();
        let five = fix.pool.intern_num(5.0).unwrap();
        let nine = fix.pool.intern_num(9.0).unwrap();
        let x = fix.pool.intern_str(b"x").unwrap();
        let g = fix.global;
        let block = fix.arena.alloc(FuncKind::Block, Some(g)).unwrap();
        let block_slot = fix.pool.add_func(block).unwrap();
        fix.arena[block].emit(Ins::new(Opcode::PushVal, nine));
        fix.arena[block].emit(Ins::new(Opcode::SLocal, x));
        fix.arena[block].emit(Ins::new(Opcode::GLocal, x));
        fix.arena[block].emit(Ins::op0(Opcode::Log));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, five));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, x));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, block_slot));
        fix.arena[g].emit(Ins::new(Opcode::Call, 0));
        let out = run(&mut fix);
        assert_eq!(out, "9\n");
        // The outer binding is untouched.
        assert_eq!(fix.arena[g].locals.get(b"x"), Some(&Value::Num(5.0)));
    }

    #[test]
    fn test_call_binds_arguments() {
        let mut fix = fixture();
        let two = fix.pool.intern_num(2.0).unwrap();
        let three = fix.pool.intern_num(3.0).unwrap();
        let a = fix.pool.intern_str(b"a").unwrap();
        let b = fix.pool.intern_str(b"b").unwrap();
        let r = fix.pool.intern_str(b"r").unwrap();
        let g = fix.global;
        let f = fix.arena.alloc(FuncKind::Lambda, Some(g)).unwrap();
        fix.arena[f].params = vec![b"a".to_vec(), b"b".to_vec()];
        let f_slot = fix.pool.add_func(f).unwrap();
        fix.arena[f].emit(Ins::new(Opcode::GLocal, a));
        fix.arena[f].emit(Ins::new(Opcode::GLocal, b));
        fix.arena[f].emit(Ins::op0(Opcode::Add));
        fix.arena[f].emit(Ins::op0(Opcode::Ret));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, f_slot));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, two));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, three));
        fix.arena[g].emit(Ins::new(Opcode::Call, 2));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, r));
        run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(fix.arena[g].locals.get(b"r"), Some(&Value::Num(5.0)));
    }

    #[test]
    fn test_lambda_without_return_yields_nil() {
        let mut fix = fixture();
        let r = fix.pool.intern_str(b"r").unwrap();
        let g = fix.global;
        let f = fix.arena.alloc(FuncKind::Lambda, Some(g)).unwrap();
        let f_slot = fix.pool.add_func(f).unwrap();
        fix.arena[g].emit(Ins::new(Opcode::PushVal, f_slot));
        fix.arena[g].emit(Ins::new(Opcode::Call, 0));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, r));
        run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(fix.arena[g].locals.get(b"r"), Some(&Value::Nil));
    }

    #[test]
    fn test_return_unwinds_block_frames() {
        // return inside a nested block leaves the whole lambda.
        let mut fix = fixture();
        let answer = fix.pool.intern_num(42.0).unwrap();
        let r = fix.pool.intern_str(b"r").unwrap();
        let g = fix.global;
        let f = fix.arena.alloc(FuncKind::Lambda, Some(g)).unwrap();
        let block = fix.arena.alloc(FuncKind::Block, Some(f)).unwrap();
        let f_slot = fix.pool.add_func(f).unwrap();
        let block_slot = fix.pool.add_func(block).unwrap();
        fix.arena[block].emit(Ins::new(Opcode::PushVal, answer));
        fix.arena[block].emit(Ins::op0(Opcode::Ret));
        fix.arena[f].emit(Ins::new(Opcode::PushVal, block_slot));
        fix.arena[f].emit(Ins::new(Opcode::Call, 0));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, f_slot));
        fix.arena[g].emit(Ins::new(Opcode::Call, 0));
        fix.arena[g].emit(Ins::new(Opcode::SLocal, r));
        run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(fix.arena[g].locals.get(b"r"), Some(&Value::Num(42.0)));
    }

    #[test]
    fn test_type_mismatch_is_sticky() {
        let mut fix = fixture();
        let s = fix.pool.intern_str(b"oops").unwrap();
        let one = fix.pool.intern_num(1.0).unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, s));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::op0(Opcode::Add));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        let out = run(&mut fix);
        assert!(fix.handler.has_errors());
        let message = fix.handler.first_error().unwrap().message;
        assert!(message.contains("type mismatch"), "{}", message);
        // Nothing after the fault executed.
        assert_eq!(out, "");
    }

    #[test]
    fn test_undeclared_variable() {
        let mut fix = fixture();
        let nope = fix.pool.intern_str(b"nope").unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::GLocal, nope));
        run(&mut fix);
        assert!(fix.handler.has_errors());
        assert!(fix
            .handler
            .first_error()
            .unwrap()
            .message
            .contains("undeclared variable 'nope'"));
    }

    #[test]
    fn test_frame_overflow() {
        // A function that endlessly calls itself exhausts the frame
        // stack.
        let mut fix = fixture();
        let g = fix.global;
        let f = fix.arena.alloc(FuncKind::Lambda, Some(g)).unwrap();
        let f_slot = fix.pool.add_func(f).unwrap();
        fix.arena[f].emit(Ins::new(Opcode::PushVal, f_slot));
        fix.arena[f].emit(Ins::new(Opcode::Call, 0));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, f_slot));
        fix.arena[g].emit(Ins::new(Opcode::Call, 0));
        run(&mut fix);
        assert!(fix.handler.has_errors());
        assert!(fix
            .handler
            .first_error()
            .unwrap()
            .message
            .contains("frame overflow"));
    }

    #[test]
    fn test_sticky_error_skips_run() {
        let mut fix = fixture();
        let one = fix.pool.intern_num(1.0).unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        fix.handler.error("earlier failure", Span::DUMMY);
        let out = run(&mut fix);
        assert_eq!(out, "");
        assert_eq!(fix.handler.error_count(), 1);
    }

    #[test]
    fn test_exit_halts() {
        let mut fix = fixture();
        let one = fix.pool.intern_num(1.0).unwrap();
        let two = fix.pool.intern_num(2.0).unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        fix.arena[g].emit(Ins::op0(Opcode::Exit));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, two));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        let out = run(&mut fix);
        assert_eq!(out, "1\n");
        assert!(!fix.handler.has_errors());
    }

    #[test]
    fn test_objects_and_arrays() {
        let mut fix = fixture();
        let key = fix.pool.intern_str(b"k").unwrap();
        let one = fix.pool.intern_num(1.0).unwrap();
        let zero = fix.pool.intern_num(0.0).unwrap();
        let g = fix.global;
        // { k: 1 }.k  and  [1][0]
        fix.arena[g].emit(Ins::op0(Opcode::NewObj));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::new(Opcode::SetField, key));
        fix.arena[g].emit(Ins::new(Opcode::GetField, key));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        fix.arena[g].emit(Ins::op0(Opcode::NewArr));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one));
        fix.arena[g].emit(Ins::op0(Opcode::ArrPush));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, zero));
        fix.arena[g].emit(Ins::op0(Opcode::GetIndex));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        let out = run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(out, "1\n1\n");
    }

    #[test]
    fn test_missing_field_reads_nil() {
        let mut fix = fixture();
        let key = fix.pool.intern_str(b"missing").unwrap();
        let g = fix.global;
        fix.arena[g].emit(Ins::op0(Opcode::NewObj));
        fix.arena[g].emit(Ins::new(Opcode::GetField, key));
        fix.arena[g].emit(Ins::op0(Opcode::Log));
        let out = run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(out, "nil\n");
    }

    #[test]
    fn test_break_unwinds_and_flags() {
        // BRK 1 from a body frame lands the owner on its JMPBRK.
        let mut fix = fixture();
        let one = fix.pool.intern_num(1.0).unwrap();
        let done = fix.pool.intern_str(b"done").unwrap();
        let g = fix.global;
        let body = fix.arena.alloc(FuncKind::Block, Some(g)).unwrap();
        let body_slot = fix.pool.add_func(body).unwrap();
        fix.arena[body].emit(Ins::new(Opcode::Brk, 1));
        fix.arena[g].emit(Ins::new(Opcode::PushVal, one)); // 0 loop condition
        fix.arena[g].emit(Ins::branch(Opcode::JmpF, 6)); // 1 -> exit at 7
        fix.arena[g].emit(Ins::new(Opcode::PushVal, body_slot)); // 2
        fix.arena[g].emit(Ins::new(Opcode::Call, 0)); // 3
        fix.arena[g].emit(Ins::branch(Opcode::JmpBrk, 3)); // 4 -> exit at 7
        fix.arena[g].emit(Ins::op0(Opcode::Pop)); // 5 drop condition
        fix.arena[g].emit(Ins::branch(Opcode::Jmp, -6)); // 6 -> back to 0
        fix.arena[g].emit(Ins::op0(Opcode::Pop)); // 7 drop condition
        fix.arena[g].emit(Ins::new(Opcode::PushVal, done)); // 8
        fix.arena[g].emit(Ins::op0(Opcode::Log)); // 9
        let out = run(&mut fix);
        assert!(!fix.handler.has_errors());
        assert_eq!(out, "done\n");
        assert_eq!(fix.arena[g].estack.len(), 0);
    }
}
