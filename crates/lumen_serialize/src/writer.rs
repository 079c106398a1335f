//! Write-side traversal state and the module-level walk.

use crate::blob::BlobWriter;
use crate::error::SerializeError;
use crate::fixup::PendingPhiWrite;
use crate::identity::{Object, WriteTable};
use crate::types::TypeTable;
use crate::{SerializeOptions, Serialized};
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{Program, StorageClass, TypeId, Value, ValueId};

/// Everything one encode pass needs. Lives for a single call.
pub(crate) struct Writer<'p> {
    pub(crate) program: &'p Program,
    pub(crate) types: &'p dyn TypeTable,
    pub(crate) out: BlobWriter,
    pub(crate) table: WriteTable,
    pub(crate) strip: bool,
    pub(crate) phis: Vec<PendingPhiWrite>,
}

impl<'p> Writer<'p> {
    fn new(program: &'p Program, types: &'p dyn TypeTable, strip: bool) -> Self {
        Self {
            program,
            types,
            out: BlobWriter::new(),
            table: WriteTable::new(),
            strip,
            phis: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, obj: Object) -> LumenResult<u32> {
        self.table.register(obj)
    }

    pub(crate) fn index_of(&self, obj: Object) -> LumenResult<u32> {
        self.table.lookup(obj)
    }

    pub(crate) fn write_type(&mut self, ty: TypeId) -> LumenResult<()> {
        self.types.encode_type(ty, &mut self.out)
    }

    pub(crate) fn value(&self, id: ValueId) -> LumenResult<&'p Value> {
        self.program
            .values
            .try_get(id)
            .ok_or_else(|| InternalError::new(format!("{id} does not exist")))
    }

    /// Drops `name` in strip mode.
    pub(crate) fn visible<'s>(&self, name: Option<&'s str>) -> Option<&'s str> {
        name.filter(|_| !self.strip)
    }

    fn write_module(&mut self) -> LumenResult<()> {
        let program = self.program;
        self.write_module_header()?;

        for class in StorageClass::GLOBAL {
            let list = program.globals.list(class).map_or(&[][..], Vec::as_slice);
            self.write_variables(list)?;
        }

        self.out.write_len(program.registers.len())?;
        for &reg in &program.registers {
            self.write_register(reg)?;
        }

        let c = &program.counters;
        for counter in [
            c.num_inputs,
            c.num_uniforms,
            c.num_outputs,
            c.num_shared,
            c.scratch_size,
            c.reg_alloc,
        ] {
            self.out.write_u32(counter);
        }

        self.write_functions()
    }
}

/// Encodes `program` in one pass.
pub(crate) fn write_program(
    program: &Program,
    types: &dyn TypeTable,
    options: &SerializeOptions,
) -> Result<Serialized, SerializeError> {
    let mut w = Writer::new(program, types, options.strip);
    let header = w.out.reserve_u64();
    w.write_module()?;
    if let Some(requested) = w.out.out_of_memory() {
        return Err(SerializeError::OutOfMemory { requested });
    }
    let object_count = w.table.len();
    w.out.overwrite_u64(header, object_count);
    Ok(Serialized {
        bytes: w.out.into_bytes(),
        object_count,
    })
}
