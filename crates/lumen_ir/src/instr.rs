//! Instructions and their opcode tables.
//!
//! Opcodes carry stable raw codes so they can be stored in packed words;
//! [`from_raw`](AluOp::from_raw) returns `None` for unknown codes.

use crate::ids::{BlockId, FunctionId, ValueId};
use crate::value::{Deref, Dest, Operand};
use serde::{Deserialize, Serialize};

pub use crate::types::SamplerDim;

macro_rules! opcode_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $info:ty {
            $( $variant:ident = $code:literal => $text:literal, $inf:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[doc = $text]
                $variant = $code,
            )*
        }

        impl $name {
            /// Returns the opcode for a raw code.
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $( $code => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Returns the raw code.
            pub fn as_raw(self) -> u32 {
                self as u32
            }

            /// Returns the mnemonic.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )*
                }
            }

            #[allow(dead_code, clippy::unused_unit)]
            fn info(self) -> $info {
                match self {
                    $( Self::$variant => $inf, )*
                }
            }
        }
    };
}

opcode_enum! {
    /// Arithmetic and logic opcodes. The info column is the source count.
    pub enum AluOp: u8 {
        Mov = 0 => "mov", 1;
        Fneg = 1 => "fneg", 1;
        Fabs = 2 => "fabs", 1;
        Fadd = 3 => "fadd", 2;
        Fsub = 4 => "fsub", 2;
        Fmul = 5 => "fmul", 2;
        Ffma = 6 => "ffma", 3;
        Fdiv = 7 => "fdiv", 2;
        Fsqrt = 8 => "fsqrt", 1;
        Frsq = 9 => "frsq", 1;
        Fmin = 10 => "fmin", 2;
        Fmax = 11 => "fmax", 2;
        Flt = 12 => "flt", 2;
        Fge = 13 => "fge", 2;
        Feq = 14 => "feq", 2;
        Fne = 15 => "fne", 2;
        Iadd = 16 => "iadd", 2;
        Isub = 17 => "isub", 2;
        Imul = 18 => "imul", 2;
        Ineg = 19 => "ineg", 1;
        Ilt = 20 => "ilt", 2;
        Ige = 21 => "ige", 2;
        Ieq = 22 => "ieq", 2;
        Ine = 23 => "ine", 2;
        Iand = 24 => "iand", 2;
        Ior = 25 => "ior", 2;
        Ixor = 26 => "ixor", 2;
        Inot = 27 => "inot", 1;
        Ishl = 28 => "ishl", 2;
        Ishr = 29 => "ishr", 2;
        Ushr = 30 => "ushr", 2;
        F2i = 31 => "f2i", 1;
        F2u = 32 => "f2u", 1;
        I2f = 33 => "i2f", 1;
        U2f = 34 => "u2f", 1;
        B2f = 35 => "b2f", 1;
        Bcsel = 36 => "bcsel", 3;
        Vec2 = 37 => "vec2", 2;
        Vec3 = 38 => "vec3", 3;
        Vec4 = 39 => "vec4", 4;
        Fdot3 = 40 => "fdot3", 2;
        Fdot4 = 41 => "fdot4", 2;
    }
}

impl AluOp {
    /// Number of sources this opcode takes.
    pub fn num_inputs(self) -> usize {
        self.info() as usize
    }
}

/// Static shape of an intrinsic opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicInfo {
    /// Number of operand sources.
    pub num_srcs: u8,
    /// Number of deref-chain operands.
    pub num_variables: u8,
    /// Number of constant indices.
    pub num_indices: u8,
    /// Whether the intrinsic produces a value.
    pub has_dest: bool,
}

const fn shape(num_srcs: u8, num_variables: u8, num_indices: u8, has_dest: bool) -> IntrinsicInfo {
    IntrinsicInfo {
        num_srcs,
        num_variables,
        num_indices,
        has_dest,
    }
}

opcode_enum! {
    /// Memory and side-effecting operations.
    pub enum IntrinsicOp: IntrinsicInfo {
        LoadVar = 0 => "load_var", shape(0, 1, 0, true);
        StoreVar = 1 => "store_var", shape(1, 1, 1, false);
        CopyVar = 2 => "copy_var", shape(0, 2, 0, false);
        LoadUniform = 3 => "load_uniform", shape(1, 0, 2, true);
        LoadInput = 4 => "load_input", shape(1, 0, 2, true);
        StoreOutput = 5 => "store_output", shape(2, 0, 3, false);
        LoadSsbo = 6 => "load_ssbo", shape(2, 0, 1, true);
        StoreSsbo = 7 => "store_ssbo", shape(3, 0, 2, false);
        SsboAtomicAdd = 8 => "ssbo_atomic_add", shape(3, 0, 0, true);
        Discard = 9 => "discard", shape(0, 0, 0, false);
        DiscardIf = 10 => "discard_if", shape(1, 0, 0, false);
        Barrier = 11 => "barrier", shape(0, 0, 0, false);
        LoadInvocationId = 12 => "load_invocation_id", shape(0, 0, 0, true);
        LoadFragCoord = 13 => "load_frag_coord", shape(0, 0, 0, true);
        EmitVertex = 14 => "emit_vertex", shape(0, 0, 1, false);
    }
}

impl IntrinsicOp {
    /// Returns the static shape of this intrinsic.
    pub fn shape(self) -> IntrinsicInfo {
        self.info()
    }
}

opcode_enum! {
    /// Texture operations.
    pub enum TexOp: () {
        Tex = 0 => "tex", ();
        Txb = 1 => "txb", ();
        Txl = 2 => "txl", ();
        Txd = 3 => "txd", ();
        Txf = 4 => "txf", ();
        TxfMs = 5 => "txf_ms", ();
        Txs = 6 => "txs", ();
        Lod = 7 => "lod", ();
        Tg4 = 8 => "tg4", ();
        QueryLevels = 9 => "query_levels", ();
    }
}

opcode_enum! {
    /// Roles of texture instruction sources.
    pub enum TexSrcKind: () {
        Coord = 0 => "coord", ();
        Projector = 1 => "projector", ();
        Comparator = 2 => "comparator", ();
        Offset = 3 => "offset", ();
        Bias = 4 => "bias", ();
        Lod = 5 => "lod", ();
        MsIndex = 6 => "ms_index", ();
        Ddx = 7 => "ddx", ();
        Ddy = 8 => "ddy", ();
        TextureOffset = 9 => "texture_offset", ();
        SamplerOffset = 10 => "sampler_offset", ();
    }
}

opcode_enum! {
    /// Control transfers.
    pub enum JumpKind: () {
        Return = 0 => "return", ();
        Break = 1 => "break", ();
        Continue = 2 => "continue", ();
    }
}

opcode_enum! {
    /// Instruction kind discriminants.
    pub enum InstructionKind: () {
        Alu = 0 => "alu", ();
        Intrinsic = 1 => "intrinsic", ();
        LoadConst = 2 => "load_const", ();
        Undef = 3 => "undef", ();
        Texture = 4 => "tex", ();
        Phi = 5 => "phi", ();
        Jump = 6 => "jump", ();
        Call = 7 => "call", ();
    }
}

/// One ALU source with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluSrc {
    /// The operand.
    pub operand: Operand,
    /// Negate modifier.
    pub negate: bool,
    /// Absolute-value modifier.
    pub abs: bool,
    /// Component selection, one entry (0–3) per destination component.
    pub swizzle: [u8; 4],
}

impl AluSrc {
    /// An unmodified, identity-swizzled source.
    pub fn new(operand: Operand) -> Self {
        Self {
            operand,
            negate: false,
            abs: false,
            swizzle: [0, 1, 2, 3],
        }
    }
}

/// An arithmetic/logic instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluInstr {
    /// Opcode.
    pub op: AluOp,
    /// Result destination.
    pub dest: Dest,
    /// Written components (register destinations).
    pub write_mask: u8,
    /// Clamp the result to [0, 1].
    pub saturate: bool,
    /// Forbid value-changing float optimizations.
    pub exact: bool,
    /// Signed overflow is undefined.
    pub no_signed_wrap: bool,
    /// Unsigned overflow is undefined.
    pub no_unsigned_wrap: bool,
    /// Sources; the count is fixed by the opcode.
    pub srcs: Vec<AluSrc>,
}

/// A memory or side-effecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrinsicInstr {
    /// Opcode.
    pub op: IntrinsicOp,
    /// Component count of the value loaded or stored.
    pub num_components: u8,
    /// Result destination, present exactly when the opcode has one.
    pub dest: Option<Dest>,
    /// Operand sources.
    pub srcs: Vec<Operand>,
    /// Constant indices (base offsets, write masks, access flags).
    pub const_index: Vec<i32>,
    /// Deref-chain operands.
    pub variables: Vec<Deref>,
}

/// Materializes a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConstInstr {
    /// The defined value; its component count matches `values.len()`.
    pub dest: ValueId,
    /// Raw bits per component.
    pub values: Vec<u64>,
}

/// Produces an undefined value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndefInstr {
    /// The defined value.
    pub dest: ValueId,
}

/// One texture source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TexSrc {
    /// The source's role.
    pub kind: TexSrcKind,
    /// The operand.
    pub operand: Operand,
}

/// A texture sample, fetch or query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TexInstr {
    /// Operation.
    pub op: TexOp,
    /// Result destination.
    pub dest: Dest,
    /// Texture dimensionality.
    pub sampler_dim: SamplerDim,
    /// Number of coordinate components.
    pub coord_components: u8,
    /// Array texture.
    pub is_array: bool,
    /// Depth comparison.
    pub is_shadow: bool,
    /// Gathered component for `tg4`.
    pub component: u8,
    /// Texture binding index.
    pub texture_index: u32,
    /// Sampler binding index.
    pub sampler_index: u32,
    /// Typed sources.
    pub srcs: Vec<TexSrc>,
    /// Texture variable, when not bound by index.
    pub texture: Option<Deref>,
    /// Sampler variable, when not bound by index.
    pub sampler: Option<Deref>,
}

/// One incoming edge of a phi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiSrc {
    /// Predecessor block.
    pub pred: BlockId,
    /// Value flowing in along that edge.
    pub value: ValueId,
}

/// Selects a value by the predecessor control arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiInstr {
    /// The defined value.
    pub dest: ValueId,
    /// One source per predecessor.
    pub srcs: Vec<PhiSrc>,
}

/// A call to another function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInstr {
    /// Called function.
    pub callee: FunctionId,
    /// One deref per callee parameter.
    pub params: Vec<Deref>,
    /// Deref receiving the return value, present when the callee returns one.
    pub ret: Option<Deref>,
}

/// An instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Arithmetic/logic.
    Alu(AluInstr),
    /// Memory/side effect.
    Intrinsic(IntrinsicInstr),
    /// Constant.
    LoadConst(LoadConstInstr),
    /// Undefined value.
    Undef(UndefInstr),
    /// Texture operation.
    Texture(TexInstr),
    /// Phi.
    Phi(PhiInstr),
    /// Control transfer.
    Jump(JumpKind),
    /// Call.
    Call(CallInstr),
}

impl Instruction {
    /// Returns the kind discriminant.
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::Alu(_) => InstructionKind::Alu,
            Instruction::Intrinsic(_) => InstructionKind::Intrinsic,
            Instruction::LoadConst(_) => InstructionKind::LoadConst,
            Instruction::Undef(_) => InstructionKind::Undef,
            Instruction::Texture(_) => InstructionKind::Texture,
            Instruction::Phi(_) => InstructionKind::Phi,
            Instruction::Jump(_) => InstructionKind::Jump,
            Instruction::Call(_) => InstructionKind::Call,
        }
    }

    /// Returns the SSA value this instruction defines, if any.
    pub fn defined_value(&self) -> Option<ValueId> {
        match self {
            Instruction::Alu(alu) => alu.dest.ssa(),
            Instruction::Intrinsic(intr) => intr.dest.as_ref().and_then(Dest::ssa),
            Instruction::LoadConst(lc) => Some(lc.dest),
            Instruction::Undef(u) => Some(u.dest),
            Instruction::Texture(tex) => tex.dest.ssa(),
            Instruction::Phi(phi) => Some(phi.dest),
            Instruction::Jump(_) | Instruction::Call(_) => None,
        }
    }

    /// Lists every SSA value this instruction reads, in slot order.
    ///
    /// The position of a value in this list is the `slot` recorded in that
    /// value's use-list. Destination address indices come first, then
    /// sources, then deref-chain indices.
    pub fn ssa_refs(&self) -> Vec<ValueId> {
        let mut out = Vec::new();
        let mut push = |v: ValueId| out.push(v);
        match self {
            Instruction::Alu(alu) => {
                alu.dest.for_each_value(&mut push);
                for src in &alu.srcs {
                    src.operand.for_each_value(&mut push);
                }
            }
            Instruction::Intrinsic(intr) => {
                if let Some(dest) = &intr.dest {
                    dest.for_each_value(&mut push);
                }
                for src in &intr.srcs {
                    src.for_each_value(&mut push);
                }
                for deref in &intr.variables {
                    deref.for_each_value(&mut push);
                }
            }
            Instruction::Texture(tex) => {
                tex.dest.for_each_value(&mut push);
                for src in &tex.srcs {
                    src.operand.for_each_value(&mut push);
                }
                for deref in tex.texture.iter().chain(tex.sampler.iter()) {
                    deref.for_each_value(&mut push);
                }
            }
            Instruction::Phi(phi) => {
                for src in &phi.srcs {
                    push(src.value);
                }
            }
            Instruction::Call(call) => {
                for deref in call.params.iter().chain(call.ret.iter()) {
                    deref.for_each_value(&mut push);
                }
            }
            Instruction::LoadConst(_) | Instruction::Undef(_) | Instruction::Jump(_) => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{RegisterId, VariableId};
    use crate::value::{DerefLink, RegisterRef};

    #[test]
    fn alu_op_raw_roundtrip() {
        for raw in 0..64 {
            if let Some(op) = AluOp::from_raw(raw) {
                assert_eq!(op.as_raw(), raw);
            }
        }
        assert_eq!(AluOp::from_raw(200), None);
    }

    #[test]
    fn alu_input_counts() {
        assert_eq!(AluOp::Mov.num_inputs(), 1);
        assert_eq!(AluOp::Ffma.num_inputs(), 3);
        assert_eq!(AluOp::Vec4.num_inputs(), 4);
    }

    #[test]
    fn intrinsic_shapes() {
        let store = IntrinsicOp::StoreVar.shape();
        assert_eq!(store.num_srcs, 1);
        assert_eq!(store.num_variables, 1);
        assert!(!store.has_dest);
        assert!(IntrinsicOp::LoadVar.shape().has_dest);
    }

    #[test]
    fn names() {
        assert_eq!(AluOp::Fadd.name(), "fadd");
        assert_eq!(TexOp::TxfMs.name(), "txf_ms");
        assert_eq!(JumpKind::Continue.name(), "continue");
    }

    #[test]
    fn ssa_refs_order_dest_then_srcs() {
        let alu = Instruction::Alu(AluInstr {
            op: AluOp::Fadd,
            dest: Dest::Register(RegisterRef::indirect(
                RegisterId::from_raw(0),
                0,
                Operand::Value(ValueId::from_raw(7)),
            )),
            write_mask: 0x1,
            saturate: false,
            exact: false,
            no_signed_wrap: false,
            no_unsigned_wrap: false,
            srcs: vec![
                AluSrc::new(Operand::Value(ValueId::from_raw(1))),
                AluSrc::new(Operand::Value(ValueId::from_raw(2))),
            ],
        });
        let refs: Vec<u32> = alu.ssa_refs().iter().map(|v| v.as_raw()).collect();
        assert_eq!(refs, vec![7, 1, 2]);
        assert_eq!(alu.defined_value(), None);
    }

    #[test]
    fn call_refs_come_from_derefs() {
        let call = Instruction::Call(CallInstr {
            callee: FunctionId::from_raw(0),
            params: vec![Deref {
                var: VariableId::from_raw(0),
                path: vec![DerefLink::Array {
                    base_offset: 1,
                    indirect: Some(Operand::Value(ValueId::from_raw(5))),
                }],
            }],
            ret: None,
        });
        assert_eq!(call.ssa_refs(), vec![ValueId::from_raw(5)]);
        assert_eq!(call.kind(), InstructionKind::Call);
    }
}
