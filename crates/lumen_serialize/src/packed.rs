//! Bit-packed attribute words.
//!
//! Each newtype documents its layout as `name [lo, hi)` bit ranges. The
//! constructors reject field values that do not fit, so a graph with, say,
//! a 40-component value is an internal error rather than silent truncation.

use lumen_common::{InternalError, LumenResult};

fn pack(word: &mut u32, name: &str, lo: u32, width: u32, value: u32) -> LumenResult<()> {
    let max = (1u64 << width) - 1;
    if u64::from(value) > max {
        return Err(InternalError::new(format!(
            "{name} value {value} does not fit in {width} bits"
        )));
    }
    *word |= value << lo;
    Ok(())
}

fn unpack(word: u32, lo: u32, width: u32) -> u32 {
    (word >> lo) & ((1u32 << width) - 1)
}

fn flag(word: u32, bit: u32) -> bool {
    word & (1 << bit) != 0
}

/// First word of every operand.
///
/// `is_ssa [0]`, `has_indirect [1]`, `index [2, 32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandWord(pub u32);

impl OperandWord {
    /// Packs an operand word.
    pub fn new(is_ssa: bool, has_indirect: bool, index: u32) -> LumenResult<Self> {
        let mut w = u32::from(is_ssa) | u32::from(has_indirect) << 1;
        pack(&mut w, "object index", 2, 30, index)?;
        Ok(Self(w))
    }

    /// The operand reads an SSA value.
    pub fn is_ssa(self) -> bool {
        flag(self.0, 0)
    }

    /// A nested indirect operand follows.
    pub fn has_indirect(self) -> bool {
        flag(self.0, 1)
    }

    /// Identity index of the value or register.
    pub fn index(self) -> u32 {
        self.0 >> 2
    }
}

/// ALU instruction header.
///
/// `op [0, 8)`, `exact [8]`, `saturate [9]`, `write_mask [10, 14)`,
/// `no_signed_wrap [14]`, `no_unsigned_wrap [15]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluHeader(pub u32);

impl AluHeader {
    /// Packs an ALU header.
    pub fn new(
        op: u32,
        exact: bool,
        saturate: bool,
        write_mask: u8,
        no_signed_wrap: bool,
        no_unsigned_wrap: bool,
    ) -> LumenResult<Self> {
        let mut w = 0;
        pack(&mut w, "alu op", 0, 8, op)?;
        pack(&mut w, "write mask", 10, 4, u32::from(write_mask))?;
        w |= u32::from(exact) << 8
            | u32::from(saturate) << 9
            | u32::from(no_signed_wrap) << 14
            | u32::from(no_unsigned_wrap) << 15;
        Ok(Self(w))
    }

    /// Raw opcode.
    pub fn op(self) -> u32 {
        unpack(self.0, 0, 8)
    }

    /// `exact` flag.
    pub fn exact(self) -> bool {
        flag(self.0, 8)
    }

    /// `saturate` flag.
    pub fn saturate(self) -> bool {
        flag(self.0, 9)
    }

    /// Component write mask.
    pub fn write_mask(self) -> u8 {
        unpack(self.0, 10, 4) as u8
    }

    /// `no_signed_wrap` flag.
    pub fn no_signed_wrap(self) -> bool {
        flag(self.0, 14)
    }

    /// `no_unsigned_wrap` flag.
    pub fn no_unsigned_wrap(self) -> bool {
        flag(self.0, 15)
    }
}

/// Per-source ALU modifiers.
///
/// `negate [0]`, `abs [1]`, `swizzle[i] [2 + 2i, 4 + 2i)` for `i` in 0..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluSrcFlags(pub u32);

impl AluSrcFlags {
    /// Packs source modifiers.
    pub fn new(negate: bool, abs: bool, swizzle: [u8; 4]) -> LumenResult<Self> {
        let mut w = u32::from(negate) | u32::from(abs) << 1;
        for (i, &s) in swizzle.iter().enumerate() {
            pack(&mut w, "swizzle", 2 + 2 * i as u32, 2, u32::from(s))?;
        }
        Ok(Self(w))
    }

    /// Negate modifier.
    pub fn negate(self) -> bool {
        flag(self.0, 0)
    }

    /// Absolute-value modifier.
    pub fn abs(self) -> bool {
        flag(self.0, 1)
    }

    /// Component selection.
    pub fn swizzle(self) -> [u8; 4] {
        std::array::from_fn(|i| unpack(self.0, 2 + 2 * i as u32, 2) as u8)
    }
}

/// Destination word, also used alone for constant and undefined values.
///
/// `is_ssa [0]`, `num_components [1, 6)`, `bit_size [6, 14)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestWord(pub u32);

impl DestWord {
    /// Word for an SSA destination.
    pub fn ssa(num_components: u8, bit_size: u8) -> LumenResult<Self> {
        let mut w = 1;
        pack(&mut w, "component count", 1, 5, u32::from(num_components))?;
        pack(&mut w, "bit size", 6, 8, u32::from(bit_size))?;
        Ok(Self(w))
    }

    /// Word for a register destination; a register reference follows.
    pub fn register() -> Self {
        Self(0)
    }

    /// The destination is a fresh SSA value.
    pub fn is_ssa(self) -> bool {
        flag(self.0, 0)
    }

    /// Component count of the SSA value.
    pub fn num_components(self) -> u8 {
        unpack(self.0, 1, 5) as u8
    }

    /// Bit size of the SSA value.
    pub fn bit_size(self) -> u8 {
        unpack(self.0, 6, 8) as u8
    }
}

/// Intrinsic header.
///
/// `op [0, 8)`, `num_components [8, 13)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicHeader(pub u32);

impl IntrinsicHeader {
    /// Packs an intrinsic header.
    pub fn new(op: u32, num_components: u8) -> LumenResult<Self> {
        let mut w = 0;
        pack(&mut w, "intrinsic op", 0, 8, op)?;
        pack(&mut w, "component count", 8, 5, u32::from(num_components))?;
        Ok(Self(w))
    }

    /// Raw opcode.
    pub fn op(self) -> u32 {
        unpack(self.0, 0, 8)
    }

    /// Component count.
    pub fn num_components(self) -> u8 {
        unpack(self.0, 8, 5) as u8
    }
}

/// Texture instruction header.
///
/// `op [0, 5)`, `sampler_dim [5, 9)`, `coord_components [9, 12)`,
/// `is_array [12]`, `is_shadow [13]`, `has_texture_deref [14]`,
/// `has_sampler_deref [15]`, `component [16, 18)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexHeader(pub u32);

/// Unpacked [`TexHeader`] fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexFields {
    /// Raw texture op.
    pub op: u32,
    /// Raw sampler dimension.
    pub sampler_dim: u32,
    /// Coordinate component count.
    pub coord_components: u8,
    /// Array texture.
    pub is_array: bool,
    /// Shadow comparison.
    pub is_shadow: bool,
    /// A texture deref chain follows.
    pub has_texture_deref: bool,
    /// A sampler deref chain follows.
    pub has_sampler_deref: bool,
    /// Gather component.
    pub component: u8,
}

impl TexHeader {
    /// Packs a texture header.
    pub fn new(fields: TexFields) -> LumenResult<Self> {
        let mut w = 0;
        pack(&mut w, "texture op", 0, 5, fields.op)?;
        pack(&mut w, "sampler dim", 5, 4, fields.sampler_dim)?;
        pack(&mut w, "coord components", 9, 3, u32::from(fields.coord_components))?;
        pack(&mut w, "gather component", 16, 2, u32::from(fields.component))?;
        w |= u32::from(fields.is_array) << 12
            | u32::from(fields.is_shadow) << 13
            | u32::from(fields.has_texture_deref) << 14
            | u32::from(fields.has_sampler_deref) << 15;
        Ok(Self(w))
    }

    /// Unpacks every field.
    pub fn fields(self) -> TexFields {
        TexFields {
            op: unpack(self.0, 0, 5),
            sampler_dim: unpack(self.0, 5, 4),
            coord_components: unpack(self.0, 9, 3) as u8,
            is_array: flag(self.0, 12),
            is_shadow: flag(self.0, 13),
            has_texture_deref: flag(self.0, 14),
            has_sampler_deref: flag(self.0, 15),
            component: unpack(self.0, 16, 2) as u8,
        }
    }
}

/// Presence and storage-class word of a variable record.
///
/// `has_name [0]`, `has_initializer [1]`, `has_interface_type [2]`,
/// `storage [4, 8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableFlags(pub u32);

impl VariableFlags {
    /// Packs variable flags.
    pub fn new(
        has_name: bool,
        has_initializer: bool,
        has_interface_type: bool,
        storage: u32,
    ) -> LumenResult<Self> {
        let mut w = u32::from(has_name)
            | u32::from(has_initializer) << 1
            | u32::from(has_interface_type) << 2;
        pack(&mut w, "storage class", 4, 4, storage)?;
        Ok(Self(w))
    }

    /// A name string follows.
    pub fn has_name(self) -> bool {
        flag(self.0, 0)
    }

    /// A constant tree follows.
    pub fn has_initializer(self) -> bool {
        flag(self.0, 1)
    }

    /// An interface type follows.
    pub fn has_interface_type(self) -> bool {
        flag(self.0, 2)
    }

    /// Raw storage class.
    pub fn storage(self) -> u32 {
        unpack(self.0, 4, 4)
    }
}

/// Shape word of a register record.
///
/// `num_components [0, 5)`, `bit_size [5, 13)`, `has_name [13]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWord(pub u32);

impl RegisterWord {
    /// Packs a register shape.
    pub fn new(num_components: u8, bit_size: u8, has_name: bool) -> LumenResult<Self> {
        let mut w = u32::from(has_name) << 13;
        pack(&mut w, "component count", 0, 5, u32::from(num_components))?;
        pack(&mut w, "bit size", 5, 8, u32::from(bit_size))?;
        Ok(Self(w))
    }

    /// Component count.
    pub fn num_components(self) -> u8 {
        unpack(self.0, 0, 5) as u8
    }

    /// Bit size.
    pub fn bit_size(self) -> u8 {
        unpack(self.0, 5, 8) as u8
    }

    /// A name string follows.
    pub fn has_name(self) -> bool {
        flag(self.0, 13)
    }
}

/// Shape word of a function parameter: `num_components [0, 5)`,
/// `bit_size [5, 13)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamWord(pub u32);

impl ParamWord {
    /// Packs a parameter shape.
    pub fn new(num_components: u8, bit_size: u8) -> LumenResult<Self> {
        let mut w = 0;
        pack(&mut w, "component count", 0, 5, u32::from(num_components))?;
        pack(&mut w, "bit size", 5, 8, u32::from(bit_size))?;
        Ok(Self(w))
    }

    /// Component count.
    pub fn num_components(self) -> u8 {
        unpack(self.0, 0, 5) as u8
    }

    /// Bit size.
    pub fn bit_size(self) -> u8 {
        unpack(self.0, 5, 8) as u8
    }
}
