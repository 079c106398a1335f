//! Forward references from phi instructions.
//!
//! A phi may name a value or block that the traversal has not reached yet,
//! typically a loop header merging a value computed later in the loop body.
//! The writer leaves two placeholder words per source and backfills them once
//! the whole function body is written. The reader gives each source an
//! unresolved slot, records the raw indices and patches the slots once the
//! body is read, wiring up use-lists as it goes.

use crate::error::DecodeError;
use crate::identity::Object;
use crate::reader::Reader;
use crate::writer::Writer;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{BlockId, InstrId, Instruction, PhiInstr, PhiSrc, Use, ValueId};

/// A phi source waiting for its indices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingPhiWrite {
    /// Offset of the value placeholder; the block placeholder follows it.
    pub(crate) offset: usize,
    pub(crate) value: ValueId,
    pub(crate) pred: BlockId,
}

/// Raw phi source indices read before their targets were known.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingPhiRead {
    pub(crate) phi: InstrId,
    /// Position of the unresolved entry in the phi's source list.
    pub(crate) slot: u32,
    pub(crate) value: u32,
    pub(crate) pred: u32,
}

/// Stands in for a phi source until [`Reader::resolve_phis`] patches it.
fn unresolved_src() -> PhiSrc {
    PhiSrc {
        pred: BlockId::from_raw(u32::MAX),
        value: ValueId::from_raw(u32::MAX),
    }
}

impl Writer<'_> {
    pub(crate) fn write_phi(&mut self, phi: &PhiInstr) -> LumenResult<()> {
        self.write_ssa_def(phi.dest)?;
        self.out.write_len(phi.srcs.len())?;
        for src in &phi.srcs {
            let offset = self.out.reserve_u32();
            self.out.reserve_u32();
            self.phis.push(PendingPhiWrite {
                offset,
                value: src.value,
                pred: src.pred,
            });
        }
        Ok(())
    }

    /// Backfills every phi source recorded since the last call.
    pub(crate) fn resolve_phis(&mut self) -> LumenResult<()> {
        for pending in std::mem::take(&mut self.phis) {
            let value = self
                .table
                .try_lookup(Object::Value(pending.value))
                .ok_or_else(|| {
                    InternalError::new(format!(
                        "phi source {} is never defined in the function",
                        pending.value
                    ))
                })?;
            let pred = self
                .table
                .try_lookup(Object::Block(pending.pred))
                .ok_or_else(|| {
                    InternalError::new(format!(
                        "phi predecessor {} is not part of the function",
                        pending.pred
                    ))
                })?;
            self.out.overwrite_u32(pending.offset, value);
            self.out.overwrite_u32(pending.offset + 4, pred);
        }
        Ok(())
    }
}

impl Reader<'_, '_> {
    /// Reads a phi and appends it to `block` with one unresolved source per
    /// encoded source.
    pub(crate) fn read_phi(&mut self, block: BlockId) -> Result<(), DecodeError> {
        let dest = self.read_ssa_def()?;
        let count = self.input.read_len(8);
        let phi = self.append(
            block,
            Instruction::Phi(PhiInstr {
                dest,
                srcs: vec![unresolved_src(); count],
            }),
        );
        for slot in 0..count as u32 {
            let value = self.input.read_u32();
            let pred = self.input.read_u32();
            self.phis.push(PendingPhiRead {
                phi,
                slot,
                value,
                pred,
            });
        }
        Ok(())
    }

    pub(crate) fn resolve_phis(&mut self) -> Result<(), DecodeError> {
        for pending in std::mem::take(&mut self.phis) {
            let value = self.table.value(pending.value)?;
            let pred = self.table.block(pending.pred)?;
            let src = match self.program.instrs.try_get_mut(pending.phi) {
                Some(Instruction::Phi(phi)) => phi.srcs.get_mut(pending.slot as usize),
                _ => None,
            };
            let Some(src) = src else {
                return Err(DecodeError::malformed(format!(
                    "{} has no source {}",
                    pending.phi, pending.slot
                )));
            };
            *src = PhiSrc { pred, value };
            if let Some(v) = self.program.values.try_get_mut(value) {
                v.uses.push(Use {
                    instr: pending.phi,
                    slot: pending.slot,
                });
            }
        }
        Ok(())
    }
}
