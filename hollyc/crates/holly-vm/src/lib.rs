//! holly-vm - Values, bytecode and the Holly virtual machine.
//!
//! The compiler in `holly-par` emits straight into the types defined
//! here, so this crate is both the bytecode definition and its
//! interpreter:
//!
//! - [`Value`] - the tagged runtime value (number, boolean, string, nil,
//!   object, array, function)
//! - [`Ins`] / [`Opcode`] - 32-bit instructions, opcode in the high
//!   16 bits, operand in the low 16
//! - [`Pool`] - the process-wide constant pool, interned and indexed by
//!   16-bit slot
//! - [`FuncState`] / [`FuncArena`] - one record per lexical scope
//!   (global, block or lambda), holding its instruction buffer, locals
//!   and evaluation stack; scopes double as activation records
//! - [`Vm`] - the frame-stack interpreter
//!
//! A block is a function that takes no parameters and is called inline;
//! the compiler emits `PUSHVAL` + `CALL` wherever the grammar uses a
//! block, which collapses blocks, lambdas and the global scope into the
//! one [`FuncState`] mechanism.

mod error;
mod func;
mod opcode;
mod pool;
mod value;
mod vm;

pub use error::{RuntimeError, RuntimeResult};
pub use func::{FuncArena, FuncId, FuncKind, FuncState};
pub use opcode::{Ins, Opcode};
pub use pool::Pool;
pub use value::{Str, Value};
pub use vm::{Vm, MAX_FRAMES};
