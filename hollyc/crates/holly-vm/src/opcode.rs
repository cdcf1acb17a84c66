//! Instruction encoding.
//!
//! An instruction is one 32-bit word: opcode in the high 16 bits,
//! operand in the low 16. The operand is a constant-pool slot for the
//! load and store opcodes, a relative offset (signed) for the branches,
//! an argument or frame count for `CALL`/`BRK`, and zero otherwise.

use std::fmt;

/// Operation codes.
///
/// The stack notation in the comments reads `before -- after`, top of
/// stack on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Does nothing.
    Nop = 0,

    /// `-- v` Push constant-pool slot `a`.
    PushVal,
    /// `v --` Pop and insert under the name at slot `a` into the current
    /// frame's locals (`let`).
    SLocal,
    /// `-- v` Resolve the name at slot `a` along the `env` chain and push
    /// the first hit; undeclared otherwise.
    GLocal,
    /// `v --` Pop and rebind the nearest existing binding of the name at
    /// slot `a` along the `env` chain; undeclared if none exists.
    RLocal,

    /// `l r -- l+r` Numbers only.
    Add,
    /// `l r -- l-r` Numbers only.
    Sub,
    /// `l r -- l*r` Numbers only.
    Mult,
    /// `l r -- l/r` Numbers only.
    Div,
    /// `l r -- l%r` Numbers only.
    Mod,
    /// `l r -- l<<r` Numbers, truncated to integers.
    Shl,
    /// `l r -- l>>r` Numbers, truncated to integers.
    Shr,
    /// `l r -- l&r` Numbers, truncated to integers.
    BitAnd,
    /// `l r -- l|r` Numbers, truncated to integers.
    BitOr,
    /// `l r -- l^r` Numbers, truncated to integers.
    BitXor,
    /// `l r -- l==r` Any values.
    Eq,
    /// `l r -- l!=r` Any values.
    Neq,
    /// `l r -- l<r` Numbers only.
    Lt,
    /// `l r -- l>r` Numbers only.
    Gt,
    /// `l r -- l<=r` Numbers only.
    Le,
    /// `l r -- l>=r` Numbers only.
    Ge,
    /// `l r -- bool` Logical conjunction of truthiness; both operands
    /// are already evaluated.
    And,
    /// `l r -- bool` Logical disjunction of truthiness.
    Or,
    /// `l r -- l..r` String concatenation.
    Cat,

    /// `v -- !v` Truthiness complement.
    Not,
    /// `v -- ~v` Bitwise complement of the truncated number.
    BitNot,
    /// `v -- -v` Numeric negation.
    Neg,

    /// Relative jump: `scan += a - 1`, the loop's increment lands on the
    /// target.
    Jmp,
    /// Like `Jmp` when the top of stack is falsy; the tested value stays
    /// on the stack either way.
    JmpF,
    /// Like `Jmp` when the top of stack is truthy; the tested value
    /// stays on the stack either way.
    JmpT,
    /// Like `Jmp` when the break flag is set; clears it.
    JmpBrk,

    /// `f a1 .. an --` Pop `a` arguments and the function under them,
    /// bind parameters, push a frame for the callee.
    Call,
    /// `v --` Unwind block frames up to and including the nearest lambda
    /// frame; the popped value becomes the call's result.
    Ret,
    /// Unwind `a` frames and set the break flag for the loop owner's
    /// `JmpBrk`.
    Brk,

    /// `v --` Discard the top of stack.
    Pop,
    /// `v -- v v` Duplicate the top of stack.
    Dup,
    /// `u v -- v u` Exchange the top two values.
    Swap,

    /// `-- o` Push a fresh empty object.
    NewObj,
    /// `o v -- o` Pop the value, set field named at slot `a` on the
    /// object underneath (which stays).
    SetField,
    /// `o -- v` Pop the object, push the field named at slot `a`
    /// (nil when absent).
    GetField,
    /// `-- arr` Push a fresh empty array.
    NewArr,
    /// `arr v -- arr` Pop the value, append to the array underneath
    /// (which stays).
    ArrPush,
    /// `c i -- v` Pop index and container, push the element (nil when
    /// out of range or absent).
    GetIndex,
    /// `c i v -- c` Pop value and index, store into the container
    /// underneath (which stays).
    SetIndex,
    /// `v -- n` Element count of an array or object, byte length of a
    /// string.
    Len,

    /// `v --` Pop, format by type, write to the VM output with a
    /// newline.
    Log,
    /// Halt the VM.
    Exit,
}

impl Opcode {
    /// The assembler mnemonic, as shown by instruction dumps.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOOP",
            Opcode::PushVal => "PUSHVAL",
            Opcode::SLocal => "SLOCAL",
            Opcode::GLocal => "GLOCAL",
            Opcode::RLocal => "RLOCAL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mult => "MULT",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::BitAnd => "BAND",
            Opcode::BitOr => "BOR",
            Opcode::BitXor => "BXOR",
            Opcode::Eq => "ISEQ",
            Opcode::Neq => "ISNEQ",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Le => "LE",
            Opcode::Ge => "GE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Cat => "CNCT",
            Opcode::Not => "NOT",
            Opcode::BitNot => "BNOT",
            Opcode::Neg => "NEG",
            Opcode::Jmp => "JMP",
            Opcode::JmpF => "JMPF",
            Opcode::JmpT => "JMPT",
            Opcode::JmpBrk => "JMPBRK",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Brk => "BRK",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Swap => "SWAP",
            Opcode::NewObj => "OBJNEW",
            Opcode::SetField => "OBJSET",
            Opcode::GetField => "OBJGET",
            Opcode::NewArr => "ARRNEW",
            Opcode::ArrPush => "ARRPUSH",
            Opcode::GetIndex => "IDXGET",
            Opcode::SetIndex => "IDXSET",
            Opcode::Len => "LEN",
            Opcode::Log => "LOG",
            Opcode::Exit => "EXIT",
        }
    }

    /// Decodes a raw opcode value; unknown values decode to `Nop`.
    fn from_raw(raw: u16) -> Opcode {
        const TABLE: &[Opcode] = &[
            Opcode::Nop,
            Opcode::PushVal,
            Opcode::SLocal,
            Opcode::GLocal,
            Opcode::RLocal,
            Opcode::Add,
            Opcode::Sub,
            Opcode::Mult,
            Opcode::Div,
            Opcode::Mod,
            Opcode::Shl,
            Opcode::Shr,
            Opcode::BitAnd,
            Opcode::BitOr,
            Opcode::BitXor,
            Opcode::Eq,
            Opcode::Neq,
            Opcode::Lt,
            Opcode::Gt,
            Opcode::Le,
            Opcode::Ge,
            Opcode::And,
            Opcode::Or,
            Opcode::Cat,
            Opcode::Not,
            Opcode::BitNot,
            Opcode::Neg,
            Opcode::Jmp,
            Opcode::JmpF,
            Opcode::JmpT,
            Opcode::JmpBrk,
            Opcode::Call,
            Opcode::Ret,
            Opcode::Brk,
            Opcode::Pop,
            Opcode::Dup,
            Opcode::Swap,
            Opcode::NewObj,
            Opcode::SetField,
            Opcode::GetField,
            Opcode::NewArr,
            Opcode::ArrPush,
            Opcode::GetIndex,
            Opcode::SetIndex,
            Opcode::Len,
            Opcode::Log,
            Opcode::Exit,
        ];
        TABLE.get(usize::from(raw)).copied().unwrap_or(Opcode::Nop)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ins(u32);

impl Ins {
    /// Packs an opcode and operand into a word.
    pub fn new(op: Opcode, operand: u16) -> Self {
        Ins((u32::from(op as u16) << 16) | u32::from(operand))
    }

    /// Packs an opcode with a zero operand.
    pub fn op0(op: Opcode) -> Self {
        Ins::new(op, 0)
    }

    /// Packs a branch with a signed relative offset.
    pub fn branch(op: Opcode, offset: i16) -> Self {
        Ins::new(op, offset as u16)
    }

    /// The opcode in the high 16 bits.
    pub fn op(self) -> Opcode {
        Opcode::from_raw((self.0 >> 16) as u16)
    }

    /// The raw operand in the low 16 bits.
    pub fn operand(self) -> u16 {
        self.0 as u16
    }

    /// The operand read as a signed jump offset.
    pub fn jump(self) -> i32 {
        i32::from(self.operand() as i16)
    }

    /// The same instruction with a different operand, for backpatching.
    pub fn with_operand(self, operand: u16) -> Ins {
        Ins::new(self.op(), operand)
    }
}

impl fmt::Debug for Ins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op(), self.operand())
    }
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Opcode::Jmp | Opcode::JmpF | Opcode::JmpT | Opcode::JmpBrk => {
                write!(f, "{} {:+}", self.op(), self.jump())
            }
            op => write!(f, "{} {}", op, self.operand()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let ins = Ins::new(Opcode::PushVal, 513);
        assert_eq!(ins.op(), Opcode::PushVal);
        assert_eq!(ins.operand(), 513);
    }

    #[test]
    fn test_zero_operand() {
        let ins = Ins::op0(Opcode::Add);
        assert_eq!(ins.op(), Opcode::Add);
        assert_eq!(ins.operand(), 0);
    }

    #[test]
    fn test_negative_jump() {
        let ins = Ins::branch(Opcode::Jmp, -5);
        assert_eq!(ins.op(), Opcode::Jmp);
        assert_eq!(ins.jump(), -5);
    }

    #[test]
    fn test_backpatch() {
        let hole = Ins::branch(Opcode::JmpF, 0);
        let patched = hole.with_operand(7u16);
        assert_eq!(patched.op(), Opcode::JmpF);
        assert_eq!(patched.jump(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Ins::new(Opcode::PushVal, 3)), "PUSHVAL 3");
        assert_eq!(format!("{}", Ins::branch(Opcode::Jmp, -4)), "JMP -4");
        assert_eq!(format!("{}", Ins::branch(Opcode::JmpF, 6)), "JMPF +6");
    }

    #[test]
    fn test_every_opcode_round_trips() {
        let all = [
            Opcode::Nop,
            Opcode::PushVal,
            Opcode::SLocal,
            Opcode::GLocal,
            Opcode::RLocal,
            Opcode::Add,
            Opcode::Sub,
            Opcode::Mult,
            Opcode::Div,
            Opcode::Mod,
            Opcode::Shl,
            Opcode::Shr,
            Opcode::BitAnd,
            Opcode::BitOr,
            Opcode::BitXor,
            Opcode::Eq,
            Opcode::Neq,
            Opcode::Lt,
            Opcode::Gt,
            Opcode::Le,
            Opcode::Ge,
            Opcode::And,
            Opcode::Or,
            Opcode::Cat,
            Opcode::Not,
            Opcode::BitNot,
            Opcode::Neg,
            Opcode::Jmp,
            Opcode::JmpF,
            Opcode::JmpT,
            Opcode::JmpBrk,
            Opcode::Call,
            Opcode::Ret,
            Opcode::Brk,
            Opcode::Pop,
            Opcode::Dup,
            Opcode::Swap,
            Opcode::NewObj,
            Opcode::SetField,
            Opcode::GetField,
            Opcode::NewArr,
            Opcode::ArrPush,
            Opcode::GetIndex,
            Opcode::SetIndex,
            Opcode::Len,
            Opcode::Log,
            Opcode::Exit,
        ];
        for op in all {
            assert_eq!(Ins::op0(op).op(), op, "{} failed to round-trip", op);
        }
    }
}
