//! The constant pool.
//!
//! One pool exists per compilation unit. The compiler interns every
//! literal it meets and most opcodes reference their operands by 16-bit
//! slot. Scalar constants are deduplicated (interning the same number or
//! string twice yields the same slot); function values always get a
//! fresh slot since every function state is distinct.

use indexmap::IndexSet;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use crate::{FuncId, Str, Value};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Identity of a pool entry, used for deduplication. Numbers are keyed
/// by bit pattern so `0.0`/`-0.0` and NaNs behave deterministically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PoolKey {
    Num(u64),
    Str(Vec<u8>),
    Bool(bool),
    Nil,
    Func(u16),
}

/// An appendable, interned sequence of [`Value`]s indexed by 16-bit
/// slot.
///
/// # Examples
///
/// ```
/// use holly_vm::{Pool, Value};
///
/// let mut pool = Pool::new();
/// let a = pool.intern_num(3.0).unwrap();
/// let b = pool.intern_num(3.0).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(pool.get(a), Some(&Value::Num(3.0)));
/// ```
#[derive(Debug, Default)]
pub struct Pool {
    values: Vec<Value>,
    index: IndexSet<PoolKey, FxBuildHasher>,
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pooled values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `slot`.
    pub fn get(&self, slot: u16) -> Option<&Value> {
        self.values.get(usize::from(slot))
    }

    /// Interns a number.
    pub fn intern_num(&mut self, n: f64) -> Option<u16> {
        self.intern(PoolKey::Num(n.to_bits()), || Value::Num(n))
    }

    /// Interns a string.
    pub fn intern_str(&mut self, bytes: &[u8]) -> Option<u16> {
        self.intern(PoolKey::Str(bytes.to_vec()), || {
            Value::Str(Str::from_bytes(bytes))
        })
    }

    /// Interns a boolean.
    pub fn intern_bool(&mut self, b: bool) -> Option<u16> {
        self.intern(PoolKey::Bool(b), || Value::Bool(b))
    }

    /// Interns nil.
    pub fn intern_nil(&mut self) -> Option<u16> {
        self.intern(PoolKey::Nil, || Value::Nil)
    }

    /// Adds a function value. Function states are unique, so this never
    /// deduplicates.
    pub fn add_func(&mut self, id: FuncId) -> Option<u16> {
        self.intern(PoolKey::Func(id.0), || Value::Func(id))
    }

    /// Interns `key`, appending `value()` on first sight. `None` once
    /// the 16-bit slot space is exhausted.
    fn intern(&mut self, key: PoolKey, value: impl FnOnce() -> Value) -> Option<u16> {
        if let Some(existing) = self.index.get_index_of(&key) {
            return Some(existing as u16);
        }
        if self.values.len() > usize::from(u16::MAX) {
            return None;
        }
        let (slot, _) = self.index.insert_full(key);
        self.values.push(value());
        Some(slot as u16)
    }
}
