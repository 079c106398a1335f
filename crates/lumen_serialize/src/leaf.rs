//! Leaf records: the module header, variables, registers and constant
//! initializer trees.
//!
//! Variables and registers are registered in the identity table as a side
//! effect of being written or read.

use crate::error::DecodeError;
use crate::identity::Object;
use crate::packed::{RegisterWord, VariableFlags};
use crate::reader::Reader;
use crate::writer::Writer;
use crate::MAX_NESTING;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{ConstantTree, Register, RegisterId, StorageClass, Variable, VariableId};

const MODULE_HAS_NAME: u32 = 1 << 0;
const MODULE_HAS_LABEL: u32 = 1 << 1;

/// Four lanes plus a child count.
const MIN_CONSTANT_BYTES: usize = 36;
/// Shape word, array length and index.
const MIN_REGISTER_BYTES: usize = 12;

impl Writer<'_> {
    pub(crate) fn write_module_header(&mut self) -> LumenResult<()> {
        let program = self.program;
        let name = self.visible(program.name.as_deref());
        let label = self.visible(program.label.as_deref());
        let mut flags = 0;
        if name.is_some() {
            flags |= MODULE_HAS_NAME;
        }
        if label.is_some() {
            flags |= MODULE_HAS_LABEL;
        }
        self.out.write_u32(flags);
        if let Some(name) = name {
            self.out.write_string(name)?;
        }
        if let Some(label) = label {
            self.out.write_string(label)?;
        }
        self.out.write_pod(&program.info)
    }

    pub(crate) fn write_variables(&mut self, vars: &[VariableId]) -> LumenResult<()> {
        self.out.write_len(vars.len())?;
        for &var in vars {
            self.write_variable(var)?;
        }
        Ok(())
    }

    pub(crate) fn write_variable(&mut self, id: VariableId) -> LumenResult<()> {
        let var = self
            .program
            .variables
            .try_get(id)
            .ok_or_else(|| InternalError::new(format!("{id} does not exist")))?;
        self.register(Object::Variable(id))?;

        let name = self.visible(var.name.as_deref());
        let flags = VariableFlags::new(
            name.is_some(),
            var.constant_initializer.is_some(),
            var.interface_type.is_some(),
            var.storage.as_raw(),
        )?;
        self.out.write_u32(flags.0);
        self.write_type(var.ty)?;
        if let Some(name) = name {
            self.out.write_string(name)?;
        }
        self.out.write_pod(&var.data)?;
        if let Some(init) = &var.constant_initializer {
            self.write_constant(init, 0)?;
        }
        if let Some(iface) = var.interface_type {
            self.write_type(iface)?;
        }
        Ok(())
    }

    fn write_constant(&mut self, c: &ConstantTree, depth: usize) -> LumenResult<()> {
        if depth > MAX_NESTING {
            return Err(InternalError::new("constant initializer nests too deeply"));
        }
        for lane in c.lanes {
            self.out.write_u64(lane);
        }
        self.out.write_len(c.elements.len())?;
        for element in &c.elements {
            self.write_constant(element, depth + 1)?;
        }
        Ok(())
    }

    pub(crate) fn write_register(&mut self, id: RegisterId) -> LumenResult<()> {
        let reg = self
            .program
            .regs
            .try_get(id)
            .ok_or_else(|| InternalError::new(format!("{id} does not exist")))?;
        self.register(Object::Register(id))?;

        let name = self.visible(reg.name.as_deref());
        let word = RegisterWord::new(reg.num_components, reg.bit_size, name.is_some())?;
        self.out.write_u32(word.0);
        self.out.write_u32(reg.num_array_elems);
        self.out.write_u32(reg.index);
        if let Some(name) = name {
            self.out.write_string(name)?;
        }
        Ok(())
    }
}

impl Reader<'_, '_> {
    pub(crate) fn read_module_header(&mut self) -> Result<(), DecodeError> {
        let flags = self.input.read_u32();
        if flags & !(MODULE_HAS_NAME | MODULE_HAS_LABEL) != 0 {
            return Err(DecodeError::malformed(format!(
                "unknown module flags {flags:#x}"
            )));
        }
        if flags & MODULE_HAS_NAME != 0 {
            self.program.name = Some(self.input.read_string());
        }
        if flags & MODULE_HAS_LABEL != 0 {
            self.program.label = Some(self.input.read_string());
        }
        self.program.info = self
            .input
            .read_pod()
            .map_err(|e| DecodeError::malformed(format!("module info: {e}")))?;
        Ok(())
    }

    pub(crate) fn read_variables(&mut self) -> Result<Vec<VariableId>, DecodeError> {
        let count = self.input.read_len(4);
        let mut vars = Vec::with_capacity(count);
        for _ in 0..count {
            vars.push(self.read_variable()?);
        }
        Ok(vars)
    }

    pub(crate) fn read_variable(&mut self) -> Result<VariableId, DecodeError> {
        let flags = VariableFlags(self.input.read_u32());
        let storage = StorageClass::from_raw(flags.storage()).ok_or_else(|| {
            DecodeError::malformed(format!("unknown storage class {}", flags.storage()))
        })?;
        let ty = self.read_type()?;
        let name = if flags.has_name() {
            Some(self.input.read_string())
        } else {
            None
        };
        let data = self
            .input
            .read_pod()
            .map_err(|e| DecodeError::malformed(format!("variable data: {e}")))?;
        let constant_initializer = if flags.has_initializer() {
            Some(self.read_constant(0)?)
        } else {
            None
        };
        let interface_type = if flags.has_interface_type() {
            Some(self.read_type()?)
        } else {
            None
        };

        let id = self.program.variables.alloc(Variable {
            name,
            storage,
            ty,
            data,
            constant_initializer,
            interface_type,
        });
        self.table.register(Object::Variable(id));
        Ok(id)
    }

    fn read_constant(&mut self, depth: usize) -> Result<ConstantTree, DecodeError> {
        if depth > MAX_NESTING {
            return Err(DecodeError::malformed("constant initializer nests too deeply"));
        }
        let lanes = std::array::from_fn(|_| self.input.read_u64());
        let count = self.input.read_len(MIN_CONSTANT_BYTES);
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.read_constant(depth + 1)?);
        }
        Ok(ConstantTree { lanes, elements })
    }

    pub(crate) fn read_registers(&mut self) -> Result<Vec<RegisterId>, DecodeError> {
        let count = self.input.read_len(MIN_REGISTER_BYTES);
        let mut regs = Vec::with_capacity(count);
        for _ in 0..count {
            regs.push(self.read_register()?);
        }
        Ok(regs)
    }

    pub(crate) fn read_register(&mut self) -> Result<RegisterId, DecodeError> {
        let word = RegisterWord(self.input.read_u32());
        let num_array_elems = self.input.read_u32();
        let index = self.input.read_u32();
        let name = if word.has_name() {
            Some(self.input.read_string())
        } else {
            None
        };
        let id = self.program.regs.alloc(Register {
            name,
            bit_size: word.bit_size(),
            num_components: word.num_components(),
            num_array_elems,
            index,
        });
        self.table.register(Object::Register(id));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{deserialize, serialize};
    use lumen_ir::{
        BaseType, ConstantTree, Interpolation, ModuleInfo, Program, Register, StorageClass, TypeDb,
        Variable, VariableData,
    };

    #[test]
    fn globals_and_registers_survive() {
        let mut types = TypeDb::new();
        let vec4 = types.vector(BaseType::Float, 4);
        let mut program = Program::new(ModuleInfo::default());
        let mut color = Variable::new(Some("v_color"), StorageClass::Input, vec4);
        color.data = VariableData {
            location: 2,
            interpolation: Interpolation::Flat,
            centroid: true,
            ..VariableData::default()
        };
        program.add_global(color.clone()).unwrap();
        let mut tint = Variable::new(None, StorageClass::Global, vec4);
        tint.constant_initializer = Some(ConstantTree::aggregate(vec![
            ConstantTree::lanes([1, 2, 3, 4]),
            ConstantTree::aggregate(vec![ConstantTree::lanes([5, 0, 0, 0])]),
        ]));
        program.add_global(tint.clone()).unwrap();
        program.add_register(Register {
            name: Some("acc".to_string()),
            bit_size: 32,
            num_components: 4,
            num_array_elems: 8,
            index: 0,
        });

        let bytes = serialize(&program, &types).unwrap();
        let decoded = deserialize(&bytes, &mut types).unwrap();

        let input = decoded.globals.inputs[0];
        assert_eq!(decoded.variables[input], color);
        let global = decoded.globals.globals[0];
        assert_eq!(decoded.variables[global], tint);
        let reg = decoded.registers[0];
        assert_eq!(decoded.regs[reg].name.as_deref(), Some("acc"));
        assert_eq!(decoded.regs[reg].num_array_elems, 8);
    }

    #[test]
    fn unknown_module_flags_are_malformed() {
        let types = TypeDb::new();
        let program = Program::new(ModuleInfo::default());
        let mut bytes = serialize(&program, &types).unwrap();
        bytes[8] = 0x80;
        let err = deserialize(&bytes, &mut TypeDb::new()).unwrap_err();
        assert!(matches!(err, crate::DecodeError::Malformed(_)), "{err:?}");
    }
}
