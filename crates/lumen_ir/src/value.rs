//! SSA values, registers, and the operand forms that refer to them.

use crate::ids::{InstrId, RegisterId, ValueId, VariableId};
use serde::{Deserialize, Serialize};

/// One use of an SSA value: the instruction and the index of the reference
/// among that instruction's SSA references (see
/// [`Instruction::ssa_refs`](crate::instr::Instruction::ssa_refs)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Use {
    /// The using instruction.
    pub instr: InstrId,
    /// Reference slot within the instruction.
    pub slot: u32,
}

/// An SSA value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Bits per component.
    pub bit_size: u8,
    /// Number of components.
    pub num_components: u8,
    /// Every instruction source that reads this value.
    pub uses: Vec<Use>,
}

impl Value {
    /// Creates a value with an empty use-list.
    pub fn new(bit_size: u8, num_components: u8) -> Self {
        Self {
            bit_size,
            num_components,
            uses: Vec::new(),
        }
    }
}

/// Non-SSA storage that may be written many times and indexed indirectly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Optional debug name.
    pub name: Option<String>,
    /// Bits per component.
    pub bit_size: u8,
    /// Number of components.
    pub num_components: u8,
    /// Number of array elements; 0 for a non-array register.
    pub num_array_elems: u32,
    /// Allocation index within the owning scope.
    pub index: u32,
}

/// A register access: base element plus an optional dynamic index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRef {
    /// The register.
    pub reg: RegisterId,
    /// Constant array element offset.
    pub base_offset: u32,
    /// Dynamic index added to the base offset; may itself be an indirect
    /// register access.
    pub indirect: Option<Box<Operand>>,
}

impl RegisterRef {
    /// A direct access to element `base_offset`.
    pub fn direct(reg: RegisterId, base_offset: u32) -> Self {
        Self {
            reg,
            base_offset,
            indirect: None,
        }
    }

    /// An access to `base_offset + indirect`.
    pub fn indirect(reg: RegisterId, base_offset: u32, indirect: Operand) -> Self {
        Self {
            reg,
            base_offset,
            indirect: Some(Box::new(indirect)),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Reads an SSA value.
    Value(ValueId),
    /// Reads a register element.
    Register(RegisterRef),
}

impl Operand {
    /// Calls `f` for every SSA value this operand reads, outermost first.
    pub fn for_each_value(&self, f: &mut impl FnMut(ValueId)) {
        match self {
            Operand::Value(v) => f(*v),
            Operand::Register(r) => {
                if let Some(ind) = &r.indirect {
                    ind.for_each_value(f);
                }
            }
        }
    }
}

/// Where an instruction writes its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dest {
    /// Defines a fresh SSA value.
    Ssa(ValueId),
    /// Writes a register element.
    Register(RegisterRef),
}

impl Dest {
    /// Calls `f` for every SSA value read while computing the destination
    /// address (only indirect register writes read values).
    pub fn for_each_value(&self, f: &mut impl FnMut(ValueId)) {
        if let Dest::Register(r) = self {
            if let Some(ind) = &r.indirect {
                ind.for_each_value(f);
            }
        }
    }

    /// Returns the defined SSA value, if any.
    pub fn ssa(&self) -> Option<ValueId> {
        match self {
            Dest::Ssa(v) => Some(*v),
            Dest::Register(_) => None,
        }
    }
}

/// One step of a deref chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerefLink {
    /// Array element `base_offset + indirect`.
    Array {
        /// Constant element offset.
        base_offset: u32,
        /// Optional dynamic index.
        indirect: Option<Operand>,
    },
    /// Struct member.
    Struct {
        /// Field index.
        field: u32,
    },
}

/// A variable plus an access path into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deref {
    /// The accessed variable.
    pub var: VariableId,
    /// Access path, outermost first.
    pub path: Vec<DerefLink>,
}

impl Deref {
    /// A deref of the whole variable.
    pub fn var(var: VariableId) -> Self {
        Self {
            var,
            path: Vec::new(),
        }
    }

    /// Calls `f` for every SSA value used as a dynamic index.
    pub fn for_each_value(&self, f: &mut impl FnMut(ValueId)) {
        for link in &self.path {
            if let DerefLink::Array {
                indirect: Some(op), ..
            } = link
            {
                op.for_each_value(f);
            }
        }
    }
}
