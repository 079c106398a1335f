//! Binary serialization of Lumen IR programs.
//!
//! A [`Program`] is a graph: operands name values defined elsewhere, calls
//! name functions that may be declared later, and phis name values and blocks
//! the traversal has not reached yet. The encoder never writes handles.
//! Instead, writer and reader walk the graph in the same fixed order and
//! assign every referenceable object the next dense index as they first
//! meet it, so an index in the stream names the same object on both sides.
//!
//! # Wire format
//!
//! All integers are little-endian and there is no version field; the payload
//! tracks the in-memory layout and staleness is detected outside this crate.
//!
//! 1. Object count (`u64`), backfilled once the pass is done.
//! 2. Module header: presence word, optional name and label, `ModuleInfo`.
//! 3. Six global variable lists (uniform, input, output, shared, generic,
//!    system value), each a count followed by variable records.
//! 4. Module registers: count and register records.
//! 5. Six module counters.
//! 6. Function count and every signature.
//! 7. Every body in the same order, each preceded by a presence word.
//!
//! Decoding is total: truncated or corrupt input yields a [`DecodeError`]
//! and never a panic or a partially built program.

#![warn(missing_docs)]

pub mod blob;
mod control;
pub mod error;
mod fixup;
pub mod identity;
mod instr;
mod leaf;
mod operand;
pub mod packed;
mod reader;
pub mod types;
mod writer;

pub use blob::{BlobReader, BlobWriter};
pub use error::{DecodeError, RoundTripError, SerializeError};
pub use identity::{Object, ReadTable, WriteTable};
pub use types::TypeTable;

use lumen_ir::Program;

/// Operands, control flow and constant trees deeper than this are rejected.
pub(crate) const MAX_NESTING: usize = 64;

/// Options for [`serialize_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Omit program, variable, register and function names.
    pub strip: bool,
}

/// The output of [`serialize_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized {
    /// The encoded program.
    pub bytes: Vec<u8>,
    /// Number of objects in the identity table, as stored in the header.
    pub object_count: u64,
}

/// Encodes `program` with default options.
pub fn serialize<T: TypeTable>(program: &Program, types: &T) -> Result<Vec<u8>, SerializeError> {
    serialize_with(program, types, &SerializeOptions::default()).map(|s| s.bytes)
}

/// Encodes `program`.
///
/// Fails only on graphs that violate IR invariants (dangling handles, source
/// counts that disagree with the opcode, fields too wide for their word) or
/// when the output buffer cannot grow.
pub fn serialize_with<T: TypeTable>(
    program: &Program,
    types: &T,
    options: &SerializeOptions,
) -> Result<Serialized, SerializeError> {
    let serialized = writer::write_program(program, types, options)?;
    log::debug!(
        "serialized {} functions into {} bytes ({} objects)",
        program.function_order.len(),
        serialized.bytes.len(),
        serialized.object_count
    );
    Ok(serialized)
}

/// Decodes a buffer produced by [`serialize`] into a fresh [`Program`].
///
/// Types are re-interned into `types`. A failed decode leaves `types` as it
/// found it.
pub fn deserialize<T: TypeTable>(bytes: &[u8], types: &mut T) -> Result<Program, DecodeError> {
    let program = reader::read_program(bytes, types)?;
    log::debug!(
        "deserialized {} functions from {} bytes",
        program.function_order.len(),
        bytes.len()
    );
    Ok(program)
}

/// Encodes and immediately decodes `program`.
pub fn round_trip<T: TypeTable>(program: &Program, types: &mut T) -> Result<Program, RoundTripError> {
    let bytes = serialize(program, types)?;
    Ok(deserialize(&bytes, types)?)
}

/// Reads the object count from a buffer's header without decoding it.
pub fn object_count(bytes: &[u8]) -> Option<u64> {
    let header: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(header))
}
