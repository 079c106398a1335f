//! Read-side traversal state and the module-level walk.

use crate::blob::BlobReader;
use crate::error::DecodeError;
use crate::fixup::PendingPhiRead;
use crate::identity::{Object, ReadTable};
use crate::types::TypeTable;
use lumen_ir::{ModuleCounters, Program, StorageClass, TypeId, Value, ValueId};

/// Everything one decode pass needs. The program under construction is
/// only handed out once the whole buffer has been validated.
pub(crate) struct Reader<'b, 't> {
    pub(crate) input: BlobReader<'b>,
    pub(crate) types: &'t mut dyn TypeTable,
    pub(crate) table: ReadTable,
    pub(crate) program: Program,
    pub(crate) phis: Vec<PendingPhiRead>,
}

impl<'b, 't> Reader<'b, 't> {
    fn new(bytes: &'b [u8], types: &'t mut dyn TypeTable) -> Self {
        Self {
            input: BlobReader::new(bytes),
            types,
            table: ReadTable::new(),
            program: Program::default(),
            phis: Vec::new(),
        }
    }

    pub(crate) fn read_type(&mut self) -> Result<TypeId, DecodeError> {
        self.types
            .decode_type(&mut self.input)
            .ok_or_else(|| DecodeError::malformed("invalid type encoding"))
    }

    /// Allocates and registers a fresh SSA value.
    pub(crate) fn define_value(&mut self, bit_size: u8, num_components: u8) -> ValueId {
        let id = self.program.values.alloc(Value::new(bit_size, num_components));
        self.table.register(Object::Value(id));
        id
    }

    fn read_module(&mut self) -> Result<(), DecodeError> {
        self.read_module_header()?;

        for class in StorageClass::GLOBAL {
            let vars = self.read_variables()?;
            if let Some(list) = self.program.globals.list_mut(class) {
                *list = vars;
            }
        }

        self.program.registers = self.read_registers()?;

        self.program.counters = ModuleCounters {
            num_inputs: self.input.read_u32(),
            num_uniforms: self.input.read_u32(),
            num_outputs: self.input.read_u32(),
            num_shared: self.input.read_u32(),
            scratch_size: self.input.read_u32(),
            reg_alloc: self.input.read_u32(),
        };

        self.read_functions()
    }
}

/// Decodes a buffer produced by [`write_program`](crate::writer::write_program).
///
/// On failure `types` is rolled back to its state before the call.
pub(crate) fn read_program(bytes: &[u8], types: &mut dyn TypeTable) -> Result<Program, DecodeError> {
    let checkpoint = types.checkpoint();
    let result = decode_program(bytes, &mut *types);
    if result.is_err() {
        types.rollback(checkpoint);
    }
    result
}

fn decode_program(bytes: &[u8], types: &mut dyn TypeTable) -> Result<Program, DecodeError> {
    let mut r = Reader::new(bytes, types);
    let expected = r.input.read_u64();
    r.table.reserve(expected, r.input.remaining());

    let result = r.read_module();
    // Any read past the end poisons whatever followed it, so truncation wins
    // over the error it may have caused.
    if let Some(offset) = r.input.overrun() {
        return Err(DecodeError::Truncated { offset });
    }
    result?;

    if r.input.remaining() > 0 {
        return Err(DecodeError::malformed(format!(
            "{} trailing bytes after the last function",
            r.input.remaining()
        )));
    }
    let found = r.table.len();
    if found != expected {
        return Err(DecodeError::ObjectCountMismatch { expected, found });
    }
    Ok(r.program)
}
