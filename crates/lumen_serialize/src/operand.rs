//! Operands, destinations and deref chains.
//!
//! An operand starts with an [`OperandWord`]. A register operand continues
//! with its base offset and, when indexed indirectly, a nested operand
//! encoded the same way.

use crate::error::DecodeError;
use crate::identity::Object;
use crate::packed::{DestWord, OperandWord};
use crate::reader::Reader;
use crate::writer::Writer;
use crate::MAX_NESTING;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{Deref, DerefLink, Dest, Operand, RegisterRef, ValueId};

const LINK_ARRAY: u32 = 0;
const LINK_ARRAY_INDIRECT: u32 = 1;
const LINK_STRUCT: u32 = 2;

impl Writer<'_> {
    pub(crate) fn write_operand(&mut self, op: &Operand) -> LumenResult<()> {
        self.write_operand_at(op, 0)
    }

    fn write_operand_at(&mut self, op: &Operand, depth: usize) -> LumenResult<()> {
        match op {
            Operand::Value(v) => {
                let index = self.index_of(Object::Value(*v))?;
                self.out.write_u32(OperandWord::new(true, false, index)?.0);
                Ok(())
            }
            Operand::Register(r) => self.write_register_ref(r, depth),
        }
    }

    fn write_register_ref(&mut self, r: &RegisterRef, depth: usize) -> LumenResult<()> {
        if depth > MAX_NESTING {
            return Err(InternalError::new(format!(
                "indirect access to {} nests too deeply",
                r.reg
            )));
        }
        let index = self.index_of(Object::Register(r.reg))?;
        let word = OperandWord::new(false, r.indirect.is_some(), index)?;
        self.out.write_u32(word.0);
        self.out.write_u32(r.base_offset);
        if let Some(indirect) = &r.indirect {
            self.write_operand_at(indirect, depth + 1)?;
        }
        Ok(())
    }

    /// Writes a destination, registering the SSA value it defines.
    pub(crate) fn write_dest(&mut self, dest: &Dest) -> LumenResult<()> {
        match dest {
            Dest::Ssa(v) => self.write_ssa_def(*v),
            Dest::Register(r) => {
                self.out.write_u32(DestWord::register().0);
                self.write_register_ref(r, 0)
            }
        }
    }

    /// Writes the shape of a defined SSA value and registers it.
    pub(crate) fn write_ssa_def(&mut self, id: ValueId) -> LumenResult<()> {
        let value = self.value(id)?;
        let word = DestWord::ssa(value.num_components, value.bit_size)?;
        self.out.write_u32(word.0);
        self.register(Object::Value(id))?;
        Ok(())
    }

    pub(crate) fn write_deref(&mut self, deref: &Deref) -> LumenResult<()> {
        let var = self.index_of(Object::Variable(deref.var))?;
        self.out.write_u32(var);
        self.out.write_len(deref.path.len())?;
        for link in &deref.path {
            match link {
                DerefLink::Array {
                    base_offset,
                    indirect: None,
                } => {
                    self.out.write_u32(LINK_ARRAY);
                    self.out.write_u32(*base_offset);
                }
                DerefLink::Array {
                    base_offset,
                    indirect: Some(index),
                } => {
                    self.out.write_u32(LINK_ARRAY_INDIRECT);
                    self.out.write_u32(*base_offset);
                    self.write_operand(index)?;
                }
                DerefLink::Struct { field } => {
                    self.out.write_u32(LINK_STRUCT);
                    self.out.write_u32(*field);
                }
            }
        }
        Ok(())
    }
}

impl Reader<'_, '_> {
    pub(crate) fn read_operand(&mut self) -> Result<Operand, DecodeError> {
        self.read_operand_at(0)
    }

    fn read_operand_at(&mut self, depth: usize) -> Result<Operand, DecodeError> {
        let word = OperandWord(self.input.read_u32());
        if word.is_ssa() {
            if word.has_indirect() {
                return Err(DecodeError::malformed("SSA operand with an indirect index"));
            }
            return Ok(Operand::Value(self.table.value(word.index())?));
        }
        Ok(Operand::Register(self.read_register_ref(word, depth)?))
    }

    fn read_register_ref(
        &mut self,
        word: OperandWord,
        depth: usize,
    ) -> Result<RegisterRef, DecodeError> {
        if depth > MAX_NESTING {
            return Err(DecodeError::malformed("indirect register access nests too deeply"));
        }
        let reg = self.table.register_id(word.index())?;
        let base_offset = self.input.read_u32();
        let indirect = if word.has_indirect() {
            Some(Box::new(self.read_operand_at(depth + 1)?))
        } else {
            None
        };
        Ok(RegisterRef {
            reg,
            base_offset,
            indirect,
        })
    }

    pub(crate) fn read_dest(&mut self) -> Result<Dest, DecodeError> {
        let word = DestWord(self.input.read_u32());
        if word.is_ssa() {
            return Ok(Dest::Ssa(
                self.define_value(word.bit_size(), word.num_components()),
            ));
        }
        let reg = OperandWord(self.input.read_u32());
        if reg.is_ssa() {
            return Err(DecodeError::malformed(
                "register destination names an SSA value",
            ));
        }
        Ok(Dest::Register(self.read_register_ref(reg, 0)?))
    }

    pub(crate) fn read_ssa_def(&mut self) -> Result<ValueId, DecodeError> {
        let word = DestWord(self.input.read_u32());
        if !word.is_ssa() {
            return Err(DecodeError::malformed("expected an SSA definition"));
        }
        Ok(self.define_value(word.bit_size(), word.num_components()))
    }

    pub(crate) fn read_deref(&mut self) -> Result<Deref, DecodeError> {
        let var = self.table.variable(self.input.read_u32())?;
        // Every link is a tag plus one word.
        let count = self.input.read_len(8);
        let mut path = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.input.read_u32();
            let arg = self.input.read_u32();
            path.push(match tag {
                LINK_ARRAY => DerefLink::Array {
                    base_offset: arg,
                    indirect: None,
                },
                LINK_ARRAY_INDIRECT => DerefLink::Array {
                    base_offset: arg,
                    indirect: Some(self.read_operand()?),
                },
                LINK_STRUCT => DerefLink::Struct { field: arg },
                other => {
                    return Err(DecodeError::malformed(format!(
                        "unknown deref link tag {other}"
                    )))
                }
            });
        }
        Ok(Deref { var, path })
    }
}
