//! The Lumen shader IR: programs of functions whose bodies are structured
//! control-flow trees of basic blocks and instructions.
//!
//! Every node lives in an arena owned by the [`Program`] and is referred to by
//! a typed `u32` handle. Cross references (operands, phi sources, calls,
//! variable derefs) are handles, so the graph may be cyclic without any
//! shared ownership. [`BodyBuilder`] constructs bodies while keeping SSA
//! use-lists consistent, and [`equivalent`] compares two programs
//! structurally.

#![warn(missing_docs)]

pub mod arena;
pub mod builder;
pub mod display;
pub mod equiv;
pub mod function;
pub mod ids;
pub mod instr;
pub mod program;
pub mod types;
pub mod value;
pub mod variable;

pub use arena::{Arena, ArenaId};
pub use builder::BodyBuilder;
pub use display::ProgramPrinter;
pub use equiv::{equivalent, equivalent_with_types, Divergence};
pub use function::{Block, Body, CfNode, Function, IfNode, LoopNode, Param};
pub use ids::{BlockId, FunctionId, InstrId, RegisterId, TypeId, ValueId, VariableId};
pub use instr::{
    AluInstr, AluOp, AluSrc, CallInstr, Instruction, InstructionKind, IntrinsicInfo,
    IntrinsicInstr, IntrinsicOp, JumpKind, LoadConstInstr, PhiInstr, PhiSrc, SamplerDim, TexInstr, TexOp,
    TexSrc, TexSrcKind, UndefInstr,
};
pub use program::{ModuleCounters, ModuleInfo, Program, ShaderStage};
pub use types::{BaseType, Type, TypeDb};
pub use value::{Deref, DerefLink, Dest, Operand, Register, RegisterRef, Use, Value};
pub use variable::{
    ConstantTree, GlobalVariables, Interpolation, StorageClass, Variable, VariableData,
};
