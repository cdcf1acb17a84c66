//! Runtime error types.

use thiserror::Error;

use holly_util::TableError;

/// Errors the interpreter can raise. All of them are sticky: the VM
/// records the error on the shared handler and halts cleanly.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An opcode met an operand of the wrong tag.
    #[error("type mismatch: {op} expects {expected}, got {got}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    /// `GLOCAL`/`RLOCAL` found the name in no enclosing scope.
    #[error("undeclared variable '{0}'")]
    Undeclared(String),

    /// `CALL` on a value that is not a function.
    #[error("cannot call a {0}")]
    NotCallable(&'static str),

    /// More than the allowed number of active frames.
    #[error("frame overflow: more than {max} active frames")]
    FrameOverflow { max: usize },

    /// An opcode needed more stack than it had. Compiled code never
    /// does this; hand-built instruction sequences can.
    #[error("evaluation stack underflow")]
    StackUnderflow,

    /// An operand referenced a slot the pool does not have, or one of
    /// the wrong tag.
    #[error("invalid constant slot {0}")]
    BadConstant(u16),

    /// Array index that is negative or not a number.
    #[error("array index must be a non-negative number, got {0}")]
    BadIndex(String),

    /// A scope or object table refused an insertion.
    #[error(transparent)]
    Table(#[from] TableError),

    /// `LOG` could not write its output.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for VM operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
