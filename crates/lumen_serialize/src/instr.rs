//! Instruction records.
//!
//! Every record starts with the [`InstructionKind`] word. Kinds that define
//! a value write their destination before any source, so a source can
//! never refer to the value being defined out of order. Source counts that
//! follow from the opcode are checked on write and derived on read.

use crate::error::DecodeError;
use crate::identity::Object;
use crate::packed::{AluHeader, AluSrcFlags, IntrinsicHeader, TexFields, TexHeader};
use crate::reader::Reader;
use crate::writer::Writer;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{
    AluInstr, AluOp, AluSrc, BlockId, CallInstr, InstrId, Instruction, InstructionKind,
    IntrinsicInstr, IntrinsicOp, JumpKind, LoadConstInstr, SamplerDim, TexInstr, TexOp, TexSrc,
    TexSrcKind, UndefInstr,
};

fn mismatch(what: &str, op: &str, expected: usize, found: usize) -> InternalError {
    InternalError::new(format!("{op} takes {expected} {what}, found {found}"))
}

impl Writer<'_> {
    pub(crate) fn write_instr(&mut self, id: InstrId) -> LumenResult<()> {
        let program = self.program;
        let instr = program
            .instrs
            .try_get(id)
            .ok_or_else(|| InternalError::new(format!("{id} does not exist")))?;
        self.out.write_u32(instr.kind().as_raw());
        match instr {
            Instruction::Alu(alu) => self.write_alu(alu),
            Instruction::Intrinsic(intr) => self.write_intrinsic(intr),
            Instruction::LoadConst(lc) => self.write_load_const(lc),
            Instruction::Undef(u) => self.write_ssa_def(u.dest),
            Instruction::Texture(tex) => self.write_tex(tex),
            Instruction::Phi(phi) => self.write_phi(phi),
            Instruction::Jump(kind) => {
                self.out.write_u32(kind.as_raw());
                Ok(())
            }
            Instruction::Call(call) => self.write_call(call),
        }
    }

    fn write_alu(&mut self, alu: &AluInstr) -> LumenResult<()> {
        let expected = alu.op.num_inputs();
        if alu.srcs.len() != expected {
            return Err(mismatch("sources", alu.op.name(), expected, alu.srcs.len()));
        }
        let header = AluHeader::new(
            alu.op.as_raw(),
            alu.exact,
            alu.saturate,
            alu.write_mask,
            alu.no_signed_wrap,
            alu.no_unsigned_wrap,
        )?;
        self.out.write_u32(header.0);
        self.write_dest(&alu.dest)?;
        for src in &alu.srcs {
            let flags = AluSrcFlags::new(src.negate, src.abs, src.swizzle)?;
            self.out.write_u32(flags.0);
            self.write_operand(&src.operand)?;
        }
        Ok(())
    }

    fn write_intrinsic(&mut self, intr: &IntrinsicInstr) -> LumenResult<()> {
        let shape = intr.op.shape();
        let name = intr.op.name();
        if intr.dest.is_some() != shape.has_dest {
            return Err(InternalError::new(format!(
                "{name} {} a destination",
                if shape.has_dest { "requires" } else { "cannot have" }
            )));
        }
        if intr.srcs.len() != usize::from(shape.num_srcs) {
            return Err(mismatch("sources", name, shape.num_srcs.into(), intr.srcs.len()));
        }
        if intr.const_index.len() != usize::from(shape.num_indices) {
            return Err(mismatch(
                "constant indices",
                name,
                shape.num_indices.into(),
                intr.const_index.len(),
            ));
        }
        if intr.variables.len() != usize::from(shape.num_variables) {
            return Err(mismatch(
                "variables",
                name,
                shape.num_variables.into(),
                intr.variables.len(),
            ));
        }

        let header = IntrinsicHeader::new(intr.op.as_raw(), intr.num_components)?;
        self.out.write_u32(header.0);
        if let Some(dest) = &intr.dest {
            self.write_dest(dest)?;
        }
        for src in &intr.srcs {
            self.write_operand(src)?;
        }
        for &index in &intr.const_index {
            self.out.write_i32(index);
        }
        for deref in &intr.variables {
            self.write_deref(deref)?;
        }
        Ok(())
    }

    fn write_load_const(&mut self, lc: &LoadConstInstr) -> LumenResult<()> {
        let components = usize::from(self.value(lc.dest)?.num_components);
        if lc.values.len() != components {
            return Err(InternalError::new(format!(
                "constant {} has {components} components but {} lanes",
                lc.dest,
                lc.values.len()
            )));
        }
        self.write_ssa_def(lc.dest)?;
        for &lane in &lc.values {
            self.out.write_u64(lane);
        }
        Ok(())
    }

    fn write_tex(&mut self, tex: &TexInstr) -> LumenResult<()> {
        let header = TexHeader::new(TexFields {
            op: tex.op.as_raw(),
            sampler_dim: tex.sampler_dim.as_raw(),
            coord_components: tex.coord_components,
            is_array: tex.is_array,
            is_shadow: tex.is_shadow,
            has_texture_deref: tex.texture.is_some(),
            has_sampler_deref: tex.sampler.is_some(),
            component: tex.component,
        })?;
        self.out.write_u32(header.0);
        self.out.write_len(tex.srcs.len())?;
        self.write_dest(&tex.dest)?;
        self.out.write_u32(tex.texture_index);
        self.out.write_u32(tex.sampler_index);
        for src in &tex.srcs {
            self.out.write_u32(src.kind.as_raw());
            self.write_operand(&src.operand)?;
        }
        if let Some(texture) = &tex.texture {
            self.write_deref(texture)?;
        }
        if let Some(sampler) = &tex.sampler {
            self.write_deref(sampler)?;
        }
        Ok(())
    }

    fn write_call(&mut self, call: &CallInstr) -> LumenResult<()> {
        let program = self.program;
        let callee = program
            .functions
            .try_get(call.callee)
            .ok_or_else(|| InternalError::new(format!("call to undeclared {}", call.callee)))?;
        if call.params.len() != callee.params.len() {
            return Err(mismatch(
                "parameters",
                &callee.name,
                callee.params.len(),
                call.params.len(),
            ));
        }
        if call.ret.is_some() != callee.return_type.is_some() {
            return Err(InternalError::new(format!(
                "call to {} disagrees with its signature about the return slot",
                callee.name
            )));
        }
        let index = self.index_of(Object::Function(call.callee))?;
        self.out.write_u32(index);
        for param in &call.params {
            self.write_deref(param)?;
        }
        if let Some(ret) = &call.ret {
            self.write_deref(ret)?;
        }
        Ok(())
    }
}

impl Reader<'_, '_> {
    /// Reads one instruction and appends it to `block`.
    pub(crate) fn read_instr(&mut self, block: BlockId) -> Result<(), DecodeError> {
        let raw = self.input.read_u32();
        let kind = InstructionKind::from_raw(raw)
            .ok_or_else(|| DecodeError::malformed(format!("unknown instruction kind {raw}")))?;
        let instr = match kind {
            InstructionKind::Alu => Instruction::Alu(self.read_alu()?),
            InstructionKind::Intrinsic => Instruction::Intrinsic(self.read_intrinsic()?),
            InstructionKind::LoadConst => Instruction::LoadConst(self.read_load_const()?),
            InstructionKind::Undef => Instruction::Undef(UndefInstr {
                dest: self.read_ssa_def()?,
            }),
            InstructionKind::Texture => Instruction::Texture(self.read_tex()?),
            InstructionKind::Phi => return self.read_phi(block),
            InstructionKind::Jump => {
                let raw = self.input.read_u32();
                Instruction::Jump(JumpKind::from_raw(raw).ok_or_else(|| {
                    DecodeError::malformed(format!("unknown jump kind {raw}"))
                })?)
            }
            InstructionKind::Call => Instruction::Call(self.read_call()?),
        };
        self.append(block, instr);
        Ok(())
    }

    /// Adds a decoded instruction to its block and records its uses.
    pub(crate) fn append(&mut self, block: BlockId, instr: Instruction) -> InstrId {
        let id = self.program.instrs.alloc(instr);
        if let Some(b) = self.program.blocks.try_get_mut(block) {
            b.instrs.push(id);
        }
        self.program.link_uses(id);
        id
    }

    fn read_alu(&mut self) -> Result<AluInstr, DecodeError> {
        let header = AluHeader(self.input.read_u32());
        let op = AluOp::from_raw(header.op())
            .ok_or_else(|| DecodeError::malformed(format!("unknown ALU op {}", header.op())))?;
        let dest = self.read_dest()?;
        let mut srcs = Vec::with_capacity(op.num_inputs());
        for _ in 0..op.num_inputs() {
            let flags = AluSrcFlags(self.input.read_u32());
            srcs.push(AluSrc {
                operand: self.read_operand()?,
                negate: flags.negate(),
                abs: flags.abs(),
                swizzle: flags.swizzle(),
            });
        }
        Ok(AluInstr {
            op,
            dest,
            write_mask: header.write_mask(),
            saturate: header.saturate(),
            exact: header.exact(),
            no_signed_wrap: header.no_signed_wrap(),
            no_unsigned_wrap: header.no_unsigned_wrap(),
            srcs,
        })
    }

    fn read_intrinsic(&mut self) -> Result<IntrinsicInstr, DecodeError> {
        let header = IntrinsicHeader(self.input.read_u32());
        let op = IntrinsicOp::from_raw(header.op()).ok_or_else(|| {
            DecodeError::malformed(format!("unknown intrinsic {}", header.op()))
        })?;
        let shape = op.shape();
        let dest = if shape.has_dest {
            Some(self.read_dest()?)
        } else {
            None
        };
        let mut srcs = Vec::with_capacity(shape.num_srcs.into());
        for _ in 0..shape.num_srcs {
            srcs.push(self.read_operand()?);
        }
        let const_index = (0..shape.num_indices)
            .map(|_| self.input.read_i32())
            .collect();
        let mut variables = Vec::with_capacity(shape.num_variables.into());
        for _ in 0..shape.num_variables {
            variables.push(self.read_deref()?);
        }
        Ok(IntrinsicInstr {
            op,
            num_components: header.num_components(),
            dest,
            srcs,
            const_index,
            variables,
        })
    }

    fn read_load_const(&mut self) -> Result<LoadConstInstr, DecodeError> {
        let dest = self.read_ssa_def()?;
        let components = self
            .program
            .values
            .try_get(dest)
            .map_or(0, |v| v.num_components);
        let values = (0..components).map(|_| self.input.read_u64()).collect();
        Ok(LoadConstInstr { dest, values })
    }

    fn read_tex(&mut self) -> Result<TexInstr, DecodeError> {
        let fields = TexHeader(self.input.read_u32()).fields();
        let op = TexOp::from_raw(fields.op)
            .ok_or_else(|| DecodeError::malformed(format!("unknown texture op {}", fields.op)))?;
        let sampler_dim = SamplerDim::from_raw(fields.sampler_dim).ok_or_else(|| {
            DecodeError::malformed(format!("unknown sampler dimension {}", fields.sampler_dim))
        })?;
        // Kind word plus at least one operand word.
        let count = self.input.read_len(8);
        let dest = self.read_dest()?;
        let texture_index = self.input.read_u32();
        let sampler_index = self.input.read_u32();
        let mut srcs = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = self.input.read_u32();
            let kind = TexSrcKind::from_raw(raw).ok_or_else(|| {
                DecodeError::malformed(format!("unknown texture source kind {raw}"))
            })?;
            srcs.push(TexSrc {
                kind,
                operand: self.read_operand()?,
            });
        }
        let texture = if fields.has_texture_deref {
            Some(self.read_deref()?)
        } else {
            None
        };
        let sampler = if fields.has_sampler_deref {
            Some(self.read_deref()?)
        } else {
            None
        };
        Ok(TexInstr {
            op,
            dest,
            sampler_dim,
            coord_components: fields.coord_components,
            is_array: fields.is_array,
            is_shadow: fields.is_shadow,
            component: fields.component,
            texture_index,
            sampler_index,
            srcs,
            texture,
            sampler,
        })
    }

    fn read_call(&mut self) -> Result<CallInstr, DecodeError> {
        let callee = self.table.function(self.input.read_u32())?;
        let (num_params, has_ret) = self
            .program
            .functions
            .try_get(callee)
            .map(|f| (f.params.len(), f.return_type.is_some()))
            .ok_or_else(|| DecodeError::malformed(format!("call to unknown {callee}")))?;
        let mut params = Vec::with_capacity(num_params);
        for _ in 0..num_params {
            params.push(self.read_deref()?);
        }
        let ret = if has_ret {
            Some(self.read_deref()?)
        } else {
            None
        };
        Ok(CallInstr {
            callee,
            params,
            ret,
        })
    }
}
