//! Functions, bodies and structured control flow.
//!
//! Functions are encoded in two phases. Every signature is written (and
//! every function registered) before any body, so a call may name any
//! function in the program regardless of declaration order.

use crate::error::DecodeError;
use crate::identity::Object;
use crate::packed::ParamWord;
use crate::reader::Reader;
use crate::writer::Writer;
use crate::MAX_NESTING;
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{Block, BlockId, Body, CfNode, Function, FunctionId, IfNode, LoopNode, Param};

const CF_BLOCK: u32 = 0;
const CF_IF: u32 = 1;
const CF_LOOP: u32 = 2;

const SIGNATURE_HAS_NAME: u32 = 1 << 0;
const SIGNATURE_HAS_RETURN: u32 = 1 << 1;

/// Flags word plus parameter count.
const MIN_SIGNATURE_BYTES: usize = 8;
/// Shape word plus the smallest type record.
const MIN_PARAM_BYTES: usize = 5;

impl Writer<'_> {
    pub(crate) fn write_functions(&mut self) -> LumenResult<()> {
        let program = self.program;
        let mut functions = Vec::with_capacity(program.function_order.len());
        for &id in &program.function_order {
            let function = program
                .functions
                .try_get(id)
                .ok_or_else(|| InternalError::new(format!("{id} does not exist")))?;
            functions.push((id, function));
        }

        self.out.write_len(functions.len())?;
        for &(id, function) in &functions {
            self.register(Object::Function(id))?;
            self.write_signature(function)?;
        }
        for &(_, function) in &functions {
            match &function.body {
                Some(body) => {
                    self.out.write_u32(1);
                    self.write_body(function, body)?;
                }
                None => self.out.write_u32(0),
            }
        }
        Ok(())
    }

    fn write_signature(&mut self, function: &Function) -> LumenResult<()> {
        let name = self.visible(Some(function.name.as_str()));
        let mut flags = 0;
        if name.is_some() {
            flags |= SIGNATURE_HAS_NAME;
        }
        if function.return_type.is_some() {
            flags |= SIGNATURE_HAS_RETURN;
        }
        self.out.write_u32(flags);
        self.out.write_len(function.params.len())?;
        for param in &function.params {
            self.out
                .write_u32(ParamWord::new(param.num_components, param.bit_size)?.0);
            self.write_type(param.ty)?;
        }
        if let Some(name) = name {
            self.out.write_string(name)?;
        }
        if let Some(ty) = function.return_type {
            self.write_type(ty)?;
        }
        Ok(())
    }

    fn write_body(&mut self, function: &Function, body: &Body) -> LumenResult<()> {
        if body.params.len() != function.params.len() {
            return Err(InternalError::new(format!(
                "{} declares {} parameters but its body binds {}",
                function.name,
                function.params.len(),
                body.params.len()
            )));
        }
        self.out.write_u32(body.reg_alloc);
        self.write_variables(&body.locals)?;
        self.out.write_len(body.registers.len())?;
        for &reg in &body.registers {
            self.write_register(reg)?;
        }
        self.write_variables(&body.params)?;
        match body.return_var {
            Some(var) => {
                self.out.write_u32(1);
                self.write_variable(var)?;
            }
            None => self.out.write_u32(0),
        }
        self.write_cf_list(&body.cf, 0)?;
        self.resolve_phis()
    }

    fn write_cf_list(&mut self, list: &[CfNode], depth: usize) -> LumenResult<()> {
        if depth > MAX_NESTING {
            return Err(InternalError::new("control flow nests too deeply"));
        }
        self.out.write_len(list.len())?;
        for node in list {
            match node {
                CfNode::Block(block) => {
                    self.out.write_u32(CF_BLOCK);
                    self.write_block(*block)?;
                }
                CfNode::If(node) => {
                    self.out.write_u32(CF_IF);
                    self.write_operand(&node.condition)?;
                    self.write_cf_list(&node.then_list, depth + 1)?;
                    self.write_cf_list(&node.else_list, depth + 1)?;
                }
                CfNode::Loop(node) => {
                    self.out.write_u32(CF_LOOP);
                    self.write_cf_list(&node.body, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn write_block(&mut self, id: BlockId) -> LumenResult<()> {
        let program = self.program;
        let block = program
            .blocks
            .try_get(id)
            .ok_or_else(|| InternalError::new(format!("{id} does not exist")))?;
        self.register(Object::Block(id))?;
        self.out.write_len(block.instrs.len())?;
        for &instr in &block.instrs {
            self.write_instr(instr)?;
        }
        Ok(())
    }
}

impl Reader<'_, '_> {
    pub(crate) fn read_functions(&mut self) -> Result<(), DecodeError> {
        let count = self.input.read_len(MIN_SIGNATURE_BYTES);
        for _ in 0..count {
            let function = self.read_signature()?;
            let id = self.program.declare_function(function);
            self.table.register(Object::Function(id));
        }
        let order = self.program.function_order.clone();
        for id in order {
            match self.input.read_u32() {
                0 => {}
                1 => {
                    let body = self.read_body(id)?;
                    if let Some(function) = self.program.functions.try_get_mut(id) {
                        function.body = Some(body);
                    }
                }
                other => {
                    return Err(DecodeError::malformed(format!(
                        "invalid body presence word {other}"
                    )))
                }
            }
        }
        Ok(())
    }

    fn read_signature(&mut self) -> Result<Function, DecodeError> {
        let flags = self.input.read_u32();
        if flags & !(SIGNATURE_HAS_NAME | SIGNATURE_HAS_RETURN) != 0 {
            return Err(DecodeError::malformed(format!(
                "unknown signature flags {flags:#x}"
            )));
        }
        let count = self.input.read_len(MIN_PARAM_BYTES);
        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            let word = ParamWord(self.input.read_u32());
            params.push(Param {
                num_components: word.num_components(),
                bit_size: word.bit_size(),
                ty: self.read_type()?,
            });
        }
        let name = if flags & SIGNATURE_HAS_NAME != 0 {
            self.input.read_string()
        } else {
            String::new()
        };
        let return_type = if flags & SIGNATURE_HAS_RETURN != 0 {
            Some(self.read_type()?)
        } else {
            None
        };
        Ok(Function {
            name,
            params,
            return_type,
            body: None,
        })
    }

    fn read_body(&mut self, function: FunctionId) -> Result<Body, DecodeError> {
        let reg_alloc = self.input.read_u32();
        let locals = self.read_variables()?;
        let registers = self.read_registers()?;
        let params = self.read_variables()?;
        let declared = self
            .program
            .functions
            .try_get(function)
            .map_or(0, |f| f.params.len());
        if params.len() != declared {
            return Err(DecodeError::malformed(format!(
                "{function} declares {declared} parameters but its body binds {}",
                params.len()
            )));
        }
        let return_var = match self.input.read_u32() {
            0 => None,
            1 => Some(self.read_variable()?),
            other => {
                return Err(DecodeError::malformed(format!(
                    "invalid return slot presence word {other}"
                )))
            }
        };
        let cf = self.read_cf_list(0)?;
        self.resolve_phis()?;
        Ok(Body {
            reg_alloc,
            locals,
            registers,
            params,
            return_var,
            cf,
        })
    }

    fn read_cf_list(&mut self, depth: usize) -> Result<Vec<CfNode>, DecodeError> {
        if depth > MAX_NESTING {
            return Err(DecodeError::malformed("control flow nests too deeply"));
        }
        // Every node is at least a tag and a count.
        let count = self.input.read_len(8);
        let mut list = Vec::with_capacity(count);
        for _ in 0..count {
            let node = match self.input.read_u32() {
                CF_BLOCK => CfNode::Block(self.read_block()?),
                CF_IF => CfNode::If(IfNode {
                    condition: self.read_operand()?,
                    then_list: self.read_cf_list(depth + 1)?,
                    else_list: self.read_cf_list(depth + 1)?,
                }),
                CF_LOOP => CfNode::Loop(LoopNode {
                    body: self.read_cf_list(depth + 1)?,
                }),
                other => {
                    return Err(DecodeError::malformed(format!(
                        "unknown control-flow tag {other}"
                    )))
                }
            };
            list.push(node);
        }
        Ok(list)
    }

    fn read_block(&mut self) -> Result<BlockId, DecodeError> {
        let id = self.program.blocks.alloc(Block::default());
        self.table.register(Object::Block(id));
        // Kind word plus at least one more.
        let count = self.input.read_len(8);
        for _ in 0..count {
            self.read_instr(id)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{deserialize, serialize, DecodeError, SerializeError};
    use lumen_ir::{
        equivalent, BaseType, BodyBuilder, Function, FunctionId, JumpKind, ModuleInfo, Operand,
        Param, Program, TypeDb,
    };

    #[test]
    fn dangling_function_id_is_an_internal_error() {
        let mut program = Program::new(ModuleInfo::default());
        program.declare_function(Function::declare("f", Vec::new(), None));
        program.function_order.push(FunctionId::from_raw(5));
        let err = serialize(&program, &TypeDb::new()).unwrap_err();
        assert!(matches!(err, SerializeError::Internal(_)), "{err:?}");
        assert!(err.to_string().contains("fn5 does not exist"), "{err}");
    }

    #[test]
    fn declarations_without_bodies_survive() {
        let mut types = TypeDb::new();
        let float = types.scalar(BaseType::Float);
        let mut program = Program::new(ModuleInfo::default());
        let param = Param {
            num_components: 1,
            bit_size: 32,
            ty: float,
        };
        program.declare_function(Function::declare("extern_fn", vec![param], Some(float)));

        let bytes = serialize(&program, &types).unwrap();
        let decoded = deserialize(&bytes, &mut types).unwrap();
        equivalent(&program, &decoded).unwrap();
        let id = decoded.function_by_name("extern_fn").unwrap();
        assert!(decoded.functions[id].body.is_none());
        assert_eq!(decoded.functions[id].params, vec![param]);
    }

    #[test]
    fn nested_if_inside_loop() {
        let types = TypeDb::new();
        let mut program = Program::new(ModuleInfo::default());
        let main = program.declare_function(Function::declare("main", Vec::new(), None));
        let mut b = BodyBuilder::new(&mut program, main);
        b.block();
        b.begin_loop();
        let head = b.block();
        let cond = b.load_const(head, 1, &[1]);
        b.begin_if(Operand::Value(cond));
        let then = b.block();
        b.jump(then, JumpKind::Break);
        b.begin_else().unwrap();
        let other = b.block();
        b.jump(other, JumpKind::Continue);
        b.end_if().unwrap();
        b.end_loop().unwrap();
        let exit = b.block();
        b.jump(exit, JumpKind::Return);
        b.finish().unwrap();

        let bytes = serialize(&program, &types).unwrap();
        let decoded = deserialize(&bytes, &mut TypeDb::new()).unwrap();
        equivalent(&program, &decoded).unwrap();
        assert_eq!(decoded.instruction_count(), 4);
    }

    #[test]
    fn bad_presence_word_is_malformed() {
        let types = TypeDb::new();
        let mut program = Program::new(ModuleInfo::default());
        program.declare_function(Function::declare("f", Vec::new(), None));
        let mut bytes = serialize(&program, &types).unwrap();
        let last = bytes.len() - 4;
        bytes[last] = 7;
        let err = deserialize(&bytes, &mut TypeDb::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)), "{err:?}");
    }
}
