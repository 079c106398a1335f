//! Shader types and the interning type database.
//!
//! Variables, parameters and return slots carry a [`TypeId`] into a
//! [`TypeDb`]. The database is owned by the caller rather than by a
//! [`Program`](crate::program::Program), so several programs can share one
//! set of types.

use crate::ids::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    /// 32-bit float.
    Float,
    /// 16-bit float.
    Float16,
    /// 64-bit float.
    Double,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    Uint,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit unsigned integer.
    Uint64,
    /// Boolean.
    Bool,
}

impl BaseType {
    /// All base types, in discriminant order.
    pub const ALL: [BaseType; 8] = [
        BaseType::Float,
        BaseType::Float16,
        BaseType::Double,
        BaseType::Int,
        BaseType::Uint,
        BaseType::Int64,
        BaseType::Uint64,
        BaseType::Bool,
    ];

    /// Returns the type for a raw discriminant.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Returns the raw discriminant.
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Returns the size of one component in bits.
    pub fn bit_size(self) -> u8 {
        match self {
            BaseType::Float16 => 16,
            BaseType::Double | BaseType::Int64 | BaseType::Uint64 => 64,
            BaseType::Bool => 1,
            _ => 32,
        }
    }
}

/// The dimensionality of a sampler or texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerDim {
    /// 1D texture.
    Dim1D,
    /// 2D texture.
    Dim2D,
    /// 3D texture.
    Dim3D,
    /// Cube map.
    Cube,
    /// Rectangle texture with unnormalized coordinates.
    Rect,
    /// Buffer texture.
    Buf,
    /// Multisampled 2D texture.
    Ms,
    /// Subpass input.
    Subpass,
}

impl SamplerDim {
    /// All dimensions, in discriminant order.
    pub const ALL: [SamplerDim; 8] = [
        SamplerDim::Dim1D,
        SamplerDim::Dim2D,
        SamplerDim::Dim3D,
        SamplerDim::Cube,
        SamplerDim::Rect,
        SamplerDim::Buf,
        SamplerDim::Ms,
        SamplerDim::Subpass,
    ];

    /// Returns the dimension for a raw discriminant.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Returns the raw discriminant.
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// A shader type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// No value (function return of `void`).
    Void,
    /// A scalar.
    Scalar(BaseType),
    /// A vector of 2–4 (or up to 16) components.
    Vector {
        /// Component type.
        base: BaseType,
        /// Number of components.
        components: u8,
    },
    /// A matrix of floats.
    Matrix {
        /// Component type.
        base: BaseType,
        /// Number of columns.
        columns: u8,
        /// Number of rows.
        rows: u8,
    },
    /// A fixed-length array; a length of 0 means unsized.
    Array {
        /// Element type.
        element: TypeId,
        /// Number of elements.
        len: u32,
    },
    /// A named struct.
    Struct {
        /// Struct name.
        name: String,
        /// Named fields.
        fields: Vec<(String, TypeId)>,
    },
    /// A sampler or combined image-sampler.
    Sampler {
        /// Dimensionality.
        dim: SamplerDim,
        /// Whether this is a shadow (depth-comparison) sampler.
        shadow: bool,
        /// Whether this samples an array texture.
        array: bool,
        /// Result component type.
        result: BaseType,
    },
    /// An interface block (uniform/storage/in/out block).
    Interface {
        /// Block name.
        name: String,
        /// Named fields.
        fields: Vec<(String, TypeId)>,
    },
}

/// Central type database with interned types.
///
/// Each unique [`Type`] is stored once and referenced by [`TypeId`], so type
/// equality is an ID comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDb {
    types: Vec<Type>,
    #[serde(skip)]
    lookup: HashMap<Type, TypeId>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    ///
    /// If an identical type already exists, returns the existing ID.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        // The lookup map is not serialized, so a deserialized database falls
        // back to a scan before rebuilding its entry.
        if let Some(i) = self.types.iter().position(|existing| existing == &ty) {
            let id = TypeId::from_raw(i as u32);
            self.lookup.insert(ty, id);
            return id;
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    /// Returns the type with the given ID, or `None` if the ID was not
    /// produced by this database.
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.as_raw() as usize)
    }

    /// Convenience for interning a scalar.
    pub fn scalar(&mut self, base: BaseType) -> TypeId {
        self.intern(Type::Scalar(base))
    }

    /// Convenience for interning a vector.
    pub fn vector(&mut self, base: BaseType, components: u8) -> TypeId {
        self.intern(Type::Vector { base, components })
    }

    /// Returns the number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Forgets every type interned after the first `len`.
    ///
    /// IDs at or above `len` become invalid. Used to undo interning done by
    /// a decode that failed.
    pub fn truncate(&mut self, len: usize) {
        self.types.truncate(len);
        self.lookup.retain(|_, id| (id.as_raw() as usize) < len);
    }

    /// Returns `true` if no types have been interned.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Renders a type as GLSL-like text.
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            None => format!("<invalid {id}>"),
            Some(Type::Void) => "void".to_string(),
            Some(Type::Scalar(base)) => base_name(*base).to_string(),
            Some(Type::Vector { base, components }) => {
                format!("{}vec{components}", vector_prefix(*base))
            }
            Some(Type::Matrix { columns, rows, .. }) => format!("mat{columns}x{rows}"),
            Some(Type::Array { element, len }) => format!("{}[{len}]", self.name(*element)),
            Some(Type::Struct { name, .. }) => format!("struct {name}"),
            Some(Type::Sampler { dim, shadow, .. }) => {
                format!("sampler{dim:?}{}", if *shadow { "Shadow" } else { "" })
            }
            Some(Type::Interface { name, .. }) => format!("block {name}"),
        }
    }
}

fn base_name(base: BaseType) -> &'static str {
    match base {
        BaseType::Float => "float",
        BaseType::Float16 => "float16_t",
        BaseType::Double => "double",
        BaseType::Int => "int",
        BaseType::Uint => "uint",
        BaseType::Int64 => "int64_t",
        BaseType::Uint64 => "uint64_t",
        BaseType::Bool => "bool",
    }
}

fn vector_prefix(base: BaseType) -> &'static str {
    match base {
        BaseType::Float => "",
        BaseType::Float16 => "f16",
        BaseType::Double => "d",
        BaseType::Int => "i",
        BaseType::Uint => "u",
        BaseType::Int64 => "i64",
        BaseType::Uint64 => "u64",
        BaseType::Bool => "b",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut db = TypeDb::new();
        let a = db.scalar(BaseType::Float);
        let b = db.scalar(BaseType::Float);
        assert_eq!(a, b);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn intern_different_types() {
        let mut db = TypeDb::new();
        let f = db.scalar(BaseType::Float);
        let v = db.vector(BaseType::Float, 4);
        assert_ne!(f, v);
        assert_eq!(db.get(v), Some(&Type::Vector { base: BaseType::Float, components: 4 }));
    }

    #[test]
    fn get_foreign_id_is_none() {
        let db = TypeDb::new();
        assert!(db.get(TypeId::from_raw(3)).is_none());
    }

    #[test]
    fn truncate_drops_later_types() {
        let mut db = TypeDb::new();
        let f = db.scalar(BaseType::Float);
        db.vector(BaseType::Float, 2);
        db.truncate(1);
        assert_eq!(db.len(), 1);
        assert_eq!(db.scalar(BaseType::Float), f);
        // The freed slot is handed out again.
        assert_eq!(db.scalar(BaseType::Int), TypeId::from_raw(1));
    }

    #[test]
    fn names() {
        let mut db = TypeDb::new();
        let v = db.vector(BaseType::Uint, 3);
        let arr = db.intern(Type::Array { element: v, len: 2 });
        assert_eq!(db.name(v), "uvec3");
        assert_eq!(db.name(arr), "uvec3[2]");
    }

    #[test]
    fn bit_sizes() {
        assert_eq!(BaseType::Double.bit_size(), 64);
        assert_eq!(BaseType::Float16.bit_size(), 16);
        assert_eq!(BaseType::Bool.bit_size(), 1);
    }

    #[test]
    fn serde_roundtrip_still_interns() {
        let mut db = TypeDb::new();
        let f = db.scalar(BaseType::Float);
        let json = serde_json::to_string(&db).unwrap();
        let mut restored: TypeDb = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.scalar(BaseType::Float), f);
        assert_eq!(restored.len(), 1);
    }
}
