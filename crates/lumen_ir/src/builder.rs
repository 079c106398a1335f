//! Incremental construction of function bodies.
//!
//! [`BodyBuilder`] appends blocks and structured regions to a function body
//! and inserts instructions while keeping every SSA value's use-list in sync.

use crate::function::{Block, Body, CfNode, IfNode, LoopNode};
use crate::ids::{BlockId, FunctionId, InstrId, RegisterId, ValueId, VariableId};
use crate::instr::{
    AluInstr, AluOp, AluSrc, CallInstr, Instruction, JumpKind, LoadConstInstr, PhiInstr, PhiSrc,
    UndefInstr,
};
use crate::program::Program;
use crate::value::{Deref, Dest, Operand, Register, Use, Value};
use crate::variable::Variable;
use lumen_common::{InternalError, LumenResult};

enum Region {
    If {
        condition: Operand,
        then_list: Vec<CfNode>,
        else_list: Option<Vec<CfNode>>,
    },
    Loop {
        body: Vec<CfNode>,
    },
}

/// Builds the body of one function.
///
/// Regions are opened and closed explicitly: `begin_if` / `begin_else` /
/// `end_if` and `begin_loop` / `end_loop`. New blocks are appended to the
/// innermost open region. [`finish`](Self::finish) installs the body.
pub struct BodyBuilder<'p> {
    program: &'p mut Program,
    function: FunctionId,
    body: Body,
    regions: Vec<Region>,
}

impl<'p> BodyBuilder<'p> {
    /// Starts an empty body for `function`.
    pub fn new(program: &'p mut Program, function: FunctionId) -> Self {
        Self {
            program,
            function,
            body: Body::default(),
            regions: Vec::new(),
        }
    }

    /// Read access to the program under construction.
    pub fn program(&self) -> &Program {
        self.program
    }

    fn current_list(&mut self) -> &mut Vec<CfNode> {
        match self.regions.last_mut() {
            None => &mut self.body.cf,
            Some(Region::If {
                else_list: Some(list),
                ..
            }) => list,
            Some(Region::If { then_list, .. }) => then_list,
            Some(Region::Loop { body }) => body,
        }
    }

    /// Adds a function-local variable.
    pub fn add_local(&mut self, var: Variable) -> VariableId {
        let id = self.program.variables.alloc(var);
        self.body.locals.push(id);
        id
    }

    /// Adds a parameter variable.
    pub fn add_param(&mut self, var: Variable) -> VariableId {
        let id = self.program.variables.alloc(var);
        self.body.params.push(id);
        id
    }

    /// Sets the return slot variable.
    pub fn set_return_var(&mut self, var: Variable) -> VariableId {
        let id = self.program.variables.alloc(var);
        self.body.return_var = Some(id);
        id
    }

    /// Adds a function-local register and assigns it the next index.
    pub fn add_register(&mut self, mut reg: Register) -> RegisterId {
        reg.index = self.body.reg_alloc;
        self.body.reg_alloc += 1;
        let id = self.program.regs.alloc(reg);
        self.body.registers.push(id);
        id
    }

    /// Appends a new, empty block to the innermost open region.
    pub fn block(&mut self) -> BlockId {
        let id = self.program.blocks.alloc(Block::default());
        self.current_list().push(CfNode::Block(id));
        id
    }

    /// Opens an `if`; subsequent blocks go to the then-branch.
    pub fn begin_if(&mut self, condition: Operand) {
        self.regions.push(Region::If {
            condition,
            then_list: Vec::new(),
            else_list: None,
        });
    }

    /// Switches the innermost `if` to its else-branch.
    pub fn begin_else(&mut self) -> LumenResult<()> {
        match self.regions.last_mut() {
            Some(Region::If { else_list, .. }) if else_list.is_none() => {
                *else_list = Some(Vec::new());
                Ok(())
            }
            _ => Err(InternalError::new("begin_else without an open then-branch")),
        }
    }

    /// Closes the innermost `if`.
    pub fn end_if(&mut self) -> LumenResult<()> {
        match self.regions.pop() {
            Some(Region::If {
                condition,
                then_list,
                else_list,
            }) => {
                let node = CfNode::If(IfNode {
                    condition,
                    then_list,
                    else_list: else_list.unwrap_or_default(),
                });
                self.current_list().push(node);
                Ok(())
            }
            Some(other) => {
                self.regions.push(other);
                Err(InternalError::new("end_if while a loop is innermost"))
            }
            None => Err(InternalError::new("end_if without begin_if")),
        }
    }

    /// Opens a loop.
    pub fn begin_loop(&mut self) {
        self.regions.push(Region::Loop { body: Vec::new() });
    }

    /// Closes the innermost loop.
    pub fn end_loop(&mut self) -> LumenResult<()> {
        match self.regions.pop() {
            Some(Region::Loop { body }) => {
                self.current_list().push(CfNode::Loop(LoopNode { body }));
                Ok(())
            }
            Some(other) => {
                self.regions.push(other);
                Err(InternalError::new("end_loop while an if is innermost"))
            }
            None => Err(InternalError::new("end_loop without begin_loop")),
        }
    }

    /// Allocates a fresh SSA value with no uses.
    pub fn new_value(&mut self, bit_size: u8, num_components: u8) -> ValueId {
        self.program.values.alloc(Value::new(bit_size, num_components))
    }

    /// Appends `instr` to `block` and records its uses.
    pub fn push(&mut self, block: BlockId, instr: Instruction) -> InstrId {
        let id = self.program.instrs.alloc(instr);
        self.program.blocks[block].instrs.push(id);
        self.program.link_uses(id);
        id
    }

    /// Appends a constant load.
    pub fn load_const(&mut self, block: BlockId, bit_size: u8, values: &[u64]) -> ValueId {
        let dest = self.new_value(bit_size, values.len() as u8);
        self.push(
            block,
            Instruction::LoadConst(LoadConstInstr {
                dest,
                values: values.to_vec(),
            }),
        );
        dest
    }

    /// Appends an undefined value.
    pub fn undef(&mut self, block: BlockId, bit_size: u8, num_components: u8) -> ValueId {
        let dest = self.new_value(bit_size, num_components);
        self.push(block, Instruction::Undef(UndefInstr { dest }));
        dest
    }

    /// Appends an ALU instruction with unmodified sources and an SSA result.
    pub fn alu(
        &mut self,
        block: BlockId,
        op: AluOp,
        bit_size: u8,
        num_components: u8,
        srcs: &[Operand],
    ) -> ValueId {
        let dest = self.new_value(bit_size, num_components);
        self.push(
            block,
            Instruction::Alu(AluInstr {
                op,
                dest: Dest::Ssa(dest),
                write_mask: (1u8 << num_components.min(4)) - 1,
                saturate: false,
                exact: false,
                no_signed_wrap: false,
                no_unsigned_wrap: false,
                srcs: srcs.iter().cloned().map(AluSrc::new).collect(),
            }),
        );
        dest
    }

    /// Appends a jump.
    pub fn jump(&mut self, block: BlockId, kind: JumpKind) -> InstrId {
        self.push(block, Instruction::Jump(kind))
    }

    /// Appends a call.
    pub fn call(
        &mut self,
        block: BlockId,
        callee: FunctionId,
        params: Vec<Deref>,
        ret: Option<Deref>,
    ) -> InstrId {
        self.push(block, Instruction::Call(CallInstr { callee, params, ret }))
    }

    /// Appends a phi with no sources yet; add them with
    /// [`add_phi_src`](Self::add_phi_src) once the incoming values exist.
    pub fn phi(&mut self, block: BlockId, bit_size: u8, num_components: u8) -> (InstrId, ValueId) {
        let dest = self.new_value(bit_size, num_components);
        let id = self.push(
            block,
            Instruction::Phi(PhiInstr {
                dest,
                srcs: Vec::new(),
            }),
        );
        (id, dest)
    }

    /// Adds an incoming edge to a phi and records the use.
    pub fn add_phi_src(&mut self, phi: InstrId, pred: BlockId, value: ValueId) -> LumenResult<()> {
        let slot = match self.program.instrs.try_get_mut(phi) {
            Some(Instruction::Phi(p)) => {
                p.srcs.push(PhiSrc { pred, value });
                p.srcs.len() as u32 - 1
            }
            _ => return Err(InternalError::new(format!("{phi} is not a phi"))),
        };
        let v = self
            .program
            .values
            .try_get_mut(value)
            .ok_or_else(|| InternalError::new(format!("phi source {value} does not exist")))?;
        v.uses.push(Use { instr: phi, slot });
        Ok(())
    }

    /// Installs the body into the function.
    pub fn finish(self) -> LumenResult<()> {
        if !self.regions.is_empty() {
            return Err(InternalError::new(format!(
                "{} control-flow region(s) left open",
                self.regions.len()
            )));
        }
        let function = self
            .program
            .functions
            .try_get_mut(self.function)
            .ok_or_else(|| InternalError::new(format!("{} is not declared", self.function)))?;
        function.body = Some(self.body);
        Ok(())
    }
}
