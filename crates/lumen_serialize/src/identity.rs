//! Identity tables: object handle ↔ dense serialized index.
//!
//! Both sides register objects in the same traversal order, so an index in
//! the stream names the same object for the writer and the reader without
//! handles ever being stored.

use crate::error::DecodeError;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{BlockId, FunctionId, RegisterId, ValueId, VariableId};
use std::collections::HashMap;
use std::fmt;

/// Indices share a word with two discriminator bits.
pub const MAX_INDEX: u32 = (1 << 30) - 1;

/// Any object that can be referenced from elsewhere in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    /// A function.
    Function(FunctionId),
    /// A variable.
    Variable(VariableId),
    /// A register.
    Register(RegisterId),
    /// An SSA value.
    Value(ValueId),
    /// A basic block.
    Block(BlockId),
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Function(id) => write!(f, "{id}"),
            Object::Variable(id) => write!(f, "{id}"),
            Object::Register(id) => write!(f, "{id}"),
            Object::Value(id) => write!(f, "{id}"),
            Object::Block(id) => write!(f, "{id}"),
        }
    }
}

/// Write side: assigns indices in first-registration order.
#[derive(Debug, Default)]
pub struct WriteTable {
    indices: HashMap<Object, u32>,
}

impl WriteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next index to `obj`.
    pub fn register(&mut self, obj: Object) -> LumenResult<u32> {
        let index = self.indices.len() as u32;
        if index > MAX_INDEX {
            return Err(InternalError::new(format!(
                "identity table overflow registering {obj}"
            )));
        }
        if self.indices.insert(obj, index).is_some() {
            return Err(InternalError::new(format!("{obj} registered twice")));
        }
        Ok(index)
    }

    /// Returns the index of a registered object.
    pub fn lookup(&self, obj: Object) -> LumenResult<u32> {
        self.try_lookup(obj)
            .ok_or_else(|| InternalError::new(format!("{obj} referenced before it was registered")))
    }

    /// Like [`lookup`](Self::lookup), for references that may legitimately
    /// still be unresolved.
    pub fn try_lookup(&self, obj: Object) -> Option<u32> {
        self.indices.get(&obj).copied()
    }

    /// Number of registered objects.
    pub fn len(&self) -> u64 {
        self.indices.len() as u64
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Read side: index → reconstructed object.
#[derive(Debug, Default)]
pub struct ReadTable {
    objects: Vec<Object>,
}

/// Every registered object costs at least this many bytes of stream.
const MIN_OBJECT_BYTES: usize = 4;

impl ReadTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Presizes the table for `count` objects, but never beyond what
    /// `remaining` bytes of stream could describe.
    pub fn reserve(&mut self, count: u64, remaining: usize) {
        let cap = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .min(remaining / MIN_OBJECT_BYTES);
        self.objects.reserve(cap);
    }

    /// Registers the next object.
    pub fn register(&mut self, obj: Object) {
        self.objects.push(obj);
    }

    /// Returns the object at `index`.
    pub fn lookup(&self, index: u32) -> Result<Object, DecodeError> {
        self.objects
            .get(index as usize)
            .copied()
            .ok_or_else(|| DecodeError::malformed(format!("reference to unknown object #{index}")))
    }

    /// Number of registered objects.
    pub fn len(&self) -> u64 {
        self.objects.len() as u64
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolves `index`, which must name a function.
    pub fn function(&self, index: u32) -> Result<FunctionId, DecodeError> {
        match self.lookup(index)? {
            Object::Function(id) => Ok(id),
            other => Err(wrong_kind(index, "function", other)),
        }
    }

    /// Resolves `index`, which must name a variable.
    pub fn variable(&self, index: u32) -> Result<VariableId, DecodeError> {
        match self.lookup(index)? {
            Object::Variable(id) => Ok(id),
            other => Err(wrong_kind(index, "variable", other)),
        }
    }

    /// Resolves `index`, which must name a register.
    pub fn register_id(&self, index: u32) -> Result<RegisterId, DecodeError> {
        match self.lookup(index)? {
            Object::Register(id) => Ok(id),
            other => Err(wrong_kind(index, "register", other)),
        }
    }

    /// Resolves `index`, which must name an SSA value.
    pub fn value(&self, index: u32) -> Result<ValueId, DecodeError> {
        match self.lookup(index)? {
            Object::Value(id) => Ok(id),
            other => Err(wrong_kind(index, "value", other)),
        }
    }

    /// Resolves `index`, which must name a block.
    pub fn block(&self, index: u32) -> Result<BlockId, DecodeError> {
        match self.lookup(index)? {
            Object::Block(id) => Ok(id),
            other => Err(wrong_kind(index, "block", other)),
        }
    }
}

fn wrong_kind(index: u32, expected: &str, found: Object) -> DecodeError {
    DecodeError::malformed(format!("object #{index} should be a {expected}, found {found}"))
}
