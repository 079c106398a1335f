//! The top-level program container.
//!
//! A [`Program`] owns every node of one shader: functions, variables,
//! registers, blocks, instructions and SSA values. It is the unit the
//! serializer writes and reads atomically.

use crate::arena::Arena;
use crate::function::{Block, Function};
use crate::ids::{BlockId, FunctionId, InstrId, RegisterId, ValueId, VariableId};
use crate::instr::Instruction;
use crate::value::{Register, Use, Value};
use crate::variable::{GlobalVariables, Variable};
use lumen_common::{InternalError, LumenResult};
use serde::{Deserialize, Serialize};

/// Pipeline stage a program runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader.
    #[default]
    Vertex,
    /// Tessellation control shader.
    TessControl,
    /// Tessellation evaluation shader.
    TessEval,
    /// Geometry shader.
    Geometry,
    /// Fragment shader.
    Fragment,
    /// Compute shader.
    Compute,
}

/// Fixed-layout module metadata, stored verbatim by the serializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Pipeline stage.
    pub stage: ShaderStage,
    /// Number of textures used.
    pub num_textures: u32,
    /// Number of uniform buffers.
    pub num_ubos: u32,
    /// Number of storage buffers.
    pub num_ssbos: u32,
    /// Number of images.
    pub num_images: u32,
    /// Bitmask of input locations read.
    pub inputs_read: u64,
    /// Bitmask of output locations written.
    pub outputs_written: u64,
    /// Bitmask of system values read.
    pub system_values_read: u64,
    /// Compute workgroup size.
    pub workgroup_size: [u16; 3],
    /// Whether the shader may discard fragments.
    pub uses_discard: bool,
    /// Whether any texture op uses implicit derivatives.
    pub uses_implicit_lod: bool,
}

/// Module-wide allocation counters and slot usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCounters {
    /// Input slots in use.
    pub num_inputs: u32,
    /// Uniform slots in use.
    pub num_uniforms: u32,
    /// Output slots in use.
    pub num_outputs: u32,
    /// Shared memory bytes.
    pub num_shared: u32,
    /// Scratch memory bytes.
    pub scratch_size: u32,
    /// Next free module-level register index.
    pub reg_alloc: u32,
}

/// A complete shader program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    /// Optional program name.
    pub name: Option<String>,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Fixed-layout metadata.
    pub info: ModuleInfo,
    /// Allocation counters.
    pub counters: ModuleCounters,
    /// Global variable lists by storage class.
    pub globals: GlobalVariables,
    /// Module-level registers.
    pub registers: Vec<RegisterId>,
    /// Functions in declaration order.
    pub function_order: Vec<FunctionId>,
    /// Function storage.
    pub functions: Arena<FunctionId, Function>,
    /// Variable storage (globals and function-scoped).
    pub variables: Arena<VariableId, Variable>,
    /// Register storage (module-level and function-local).
    pub regs: Arena<RegisterId, Register>,
    /// Block storage.
    pub blocks: Arena<BlockId, Block>,
    /// Instruction storage.
    pub instrs: Arena<InstrId, Instruction>,
    /// SSA value storage.
    pub values: Arena<ValueId, Value>,
}

impl Program {
    /// Creates an empty program.
    pub fn new(info: ModuleInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Adds a variable to the global list matching its storage class.
    pub fn add_global(&mut self, var: Variable) -> LumenResult<VariableId> {
        let class = var.storage;
        if self.globals.list(class).is_none() {
            return Err(InternalError::new(format!(
                "{class:?} variables cannot be global"
            )));
        }
        let id = self.variables.alloc(var);
        if let Some(list) = self.globals.list_mut(class) {
            list.push(id);
        }
        Ok(id)
    }

    /// Adds a module-level register.
    pub fn add_register(&mut self, reg: Register) -> RegisterId {
        let id = self.regs.alloc(reg);
        self.registers.push(id);
        id
    }

    /// Declares a function and appends it to the declaration order.
    pub fn declare_function(&mut self, function: Function) -> FunctionId {
        let id = self.functions.alloc(function);
        self.function_order.push(id);
        id
    }

    /// Iterates over functions in declaration order. Ids that name no
    /// function are skipped.
    pub fn functions_in_order(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.function_order
            .iter()
            .filter_map(move |&id| self.functions.try_get(id).map(|f| (id, f)))
    }

    /// Appends a use of every SSA value `instr` reads to that value's
    /// use-list. References to values outside this program are skipped.
    pub fn link_uses(&mut self, instr: InstrId) {
        let Some(inst) = self.instrs.try_get(instr) else {
            return;
        };
        for (slot, value) in inst.ssa_refs().into_iter().enumerate() {
            if let Some(v) = self.values.try_get_mut(value) {
                v.uses.push(Use {
                    instr,
                    slot: slot as u32,
                });
            }
        }
    }

    /// Looks up a function by name.
    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions_in_order()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Counts the instructions reachable from function bodies.
    pub fn instruction_count(&self) -> usize {
        self.functions_in_order()
            .filter_map(|(_, f)| f.body.as_ref())
            .flat_map(|body| body.blocks())
            .filter_map(|b| self.blocks.try_get(b))
            .map(|block| block.instrs.len())
            .sum()
    }
}
