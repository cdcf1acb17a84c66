//! holly-util - Foundation types shared by every phase of the interpreter.
//!
//! This crate provides the infrastructure the lexer, compiler and VM build
//! on:
//!
//! - [`Span`] - source locations (byte offsets plus line/column)
//! - [`Diagnostic`] / [`Handler`] - error collection with the sticky-error
//!   discipline: once an error has been recorded, every later phase entry
//!   point returns immediately
//! - [`Table`] - the string-keyed quadratic-probing hash table used for
//!   variable scopes and object fields
//!
//! Nothing here knows about tokens, instructions or values; the dependency
//! direction is strictly upward.

mod diagnostic;
mod error;
mod span;
mod table;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use error::{TableError, TableResult};
pub use span::Span;
pub use table::{sax_hash, Table, PRIMES};
