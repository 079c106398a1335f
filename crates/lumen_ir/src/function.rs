//! Functions, their bodies, and structured control flow.
//!
//! Control flow is a tree: a body is a list of [`CfNode`]s, where blocks hold
//! straight-line instructions and `if`/`loop` nodes hold nested lists. There
//! are no explicit edges; loop back-edges and exits are `continue`/`break`
//! jump instructions.

use crate::ids::{BlockId, InstrId, RegisterId, TypeId, VariableId};
use crate::value::Operand;
use serde::{Deserialize, Serialize};

/// A basic block: a straight-line instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Instructions in execution order.
    pub instrs: Vec<InstrId>,
}

/// A two-way branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfNode {
    /// Branch condition.
    pub condition: Operand,
    /// Taken when the condition is true.
    pub then_list: Vec<CfNode>,
    /// Taken when the condition is false.
    pub else_list: Vec<CfNode>,
}

/// An infinite loop left through `break` (or `return`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopNode {
    /// Loop body.
    pub body: Vec<CfNode>,
}

/// A control-flow node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfNode {
    /// A basic block.
    Block(BlockId),
    /// A branch.
    If(IfNode),
    /// A loop.
    Loop(LoopNode),
}

impl CfNode {
    /// Calls `f` for every block in this subtree, in program order.
    pub fn for_each_block(&self, f: &mut impl FnMut(BlockId)) {
        match self {
            CfNode::Block(b) => f(*b),
            CfNode::If(node) => {
                for child in node.then_list.iter().chain(node.else_list.iter()) {
                    child.for_each_block(f);
                }
            }
            CfNode::Loop(node) => {
                for child in &node.body {
                    child.for_each_block(f);
                }
            }
        }
    }
}

/// A function parameter as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Number of components.
    pub num_components: u8,
    /// Bits per component.
    pub bit_size: u8,
    /// Declared type.
    pub ty: TypeId,
}

/// The implementation of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Next free register index within this body.
    pub reg_alloc: u32,
    /// Local variables.
    pub locals: Vec<VariableId>,
    /// Local registers.
    pub registers: Vec<RegisterId>,
    /// Parameter variables, one per signature parameter.
    pub params: Vec<VariableId>,
    /// Return slot variable.
    pub return_var: Option<VariableId>,
    /// Top-level control-flow list.
    pub cf: Vec<CfNode>,
}

impl Body {
    /// Lists every block of the body in program order.
    pub fn blocks(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        for node in &self.cf {
            node.for_each_block(&mut |b| out.push(b));
        }
        out
    }
}

/// A function: a signature and, once defined, a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Parameters.
    pub params: Vec<Param>,
    /// Return type, if the function returns a value.
    pub return_type: Option<TypeId>,
    /// The implementation; `None` for declarations.
    pub body: Option<Body>,
}

impl Function {
    /// A function declaration without a body.
    pub fn declare(name: &str, params: Vec<Param>, return_type: Option<TypeId>) -> Self {
        Self {
            name: name.to_string(),
            params,
            return_type,
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ValueId;

    #[test]
    fn blocks_in_program_order() {
        let body = Body {
            cf: vec![
                CfNode::Block(BlockId::from_raw(0)),
                CfNode::If(IfNode {
                    condition: Operand::Value(ValueId::from_raw(0)),
                    then_list: vec![CfNode::Block(BlockId::from_raw(1))],
                    else_list: vec![CfNode::Block(BlockId::from_raw(2))],
                }),
                CfNode::Loop(LoopNode {
                    body: vec![CfNode::Block(BlockId::from_raw(3))],
                }),
                CfNode::Block(BlockId::from_raw(4)),
            ],
            ..Body::default()
        };
        let raw: Vec<u32> = body.blocks().iter().map(|b| b.as_raw()).collect();
        assert_eq!(raw, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn declaration_has_no_body() {
        let f = Function::declare("main", Vec::new(), None);
        assert!(f.body.is_none());
        assert_eq!(f.name, "main");
    }
}
