//! The injected type-table hook.
//!
//! The engine does not know how types are represented; it hands every
//! [`TypeId`] to a [`TypeTable`] and stores whatever bytes the table writes.

use crate::blob::{BlobReader, BlobWriter};
use lumen_common::{InternalError, LumenResult};
use lumen_ir::{BaseType, SamplerDim, Type, TypeDb, TypeId};

/// Encodes and decodes type references.
pub trait TypeTable {
    /// Writes `ty` to `out`.
    fn encode_type(&self, ty: TypeId, out: &mut BlobWriter) -> LumenResult<()>;

    /// Reads a type written by [`encode_type`](Self::encode_type).
    /// Returns `None` if the bytes do not describe a type.
    fn decode_type(&mut self, input: &mut BlobReader<'_>) -> Option<TypeId>;

    /// Marks the current contents so a failed decode can undo whatever it
    /// added. Tables that never grow while decoding can keep the default.
    fn checkpoint(&self) -> usize {
        0
    }

    /// Drops everything added since `checkpoint` was taken.
    fn rollback(&mut self, _checkpoint: usize) {}
}

/// Types nest through arrays and struct members; deeper input is rejected.
const MAX_TYPE_DEPTH: usize = 64;

const TAG_VOID: u8 = 0;
const TAG_SCALAR: u8 = 1;
const TAG_VECTOR: u8 = 2;
const TAG_MATRIX: u8 = 3;
const TAG_ARRAY: u8 = 4;
const TAG_STRUCT: u8 = 5;
const TAG_SAMPLER: u8 = 6;
const TAG_INTERFACE: u8 = 7;

/// [`TypeDb`] writes each type structurally and re-interns it on decode,
/// so decoding into the database that encoded returns the same IDs.
impl TypeTable for TypeDb {
    fn encode_type(&self, ty: TypeId, out: &mut BlobWriter) -> LumenResult<()> {
        encode(self, ty, out, 0)
    }

    fn decode_type(&mut self, input: &mut BlobReader<'_>) -> Option<TypeId> {
        decode(self, input, 0)
    }

    fn checkpoint(&self) -> usize {
        self.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        self.truncate(checkpoint);
    }
}

fn base_raw(base: BaseType) -> u8 {
    base.as_raw() as u8
}

fn encode(db: &TypeDb, id: TypeId, out: &mut BlobWriter, depth: usize) -> LumenResult<()> {
    if depth > MAX_TYPE_DEPTH {
        return Err(InternalError::new(format!("{id} nests too deeply")));
    }
    let ty = db
        .get(id)
        .ok_or_else(|| InternalError::new(format!("{id} is not in the type database")))?;
    match ty {
        Type::Void => out.write_u8(TAG_VOID),
        Type::Scalar(base) => {
            out.write_u8(TAG_SCALAR);
            out.write_u8(base_raw(*base));
        }
        Type::Vector { base, components } => {
            out.write_u8(TAG_VECTOR);
            out.write_u8(base_raw(*base));
            out.write_u8(*components);
        }
        Type::Matrix {
            base,
            columns,
            rows,
        } => {
            out.write_u8(TAG_MATRIX);
            out.write_u8(base_raw(*base));
            out.write_u8(*columns);
            out.write_u8(*rows);
        }
        Type::Array { element, len } => {
            out.write_u8(TAG_ARRAY);
            out.write_u32(*len);
            encode(db, *element, out, depth + 1)?;
        }
        Type::Struct { name, fields } | Type::Interface { name, fields } => {
            let tag = if matches!(ty, Type::Struct { .. }) {
                TAG_STRUCT
            } else {
                TAG_INTERFACE
            };
            out.write_u8(tag);
            out.write_string(name)?;
            out.write_len(fields.len())?;
            for (field, field_ty) in fields {
                out.write_string(field)?;
                encode(db, *field_ty, out, depth + 1)?;
            }
        }
        Type::Sampler {
            dim,
            shadow,
            array,
            result,
        } => {
            out.write_u8(TAG_SAMPLER);
            out.write_u8(dim.as_raw() as u8);
            out.write_u8(u8::from(*shadow) | u8::from(*array) << 1);
            out.write_u8(base_raw(*result));
        }
    }
    Ok(())
}

fn decode(db: &mut TypeDb, input: &mut BlobReader<'_>, depth: usize) -> Option<TypeId> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    let base = |raw: u8| BaseType::from_raw(u32::from(raw));
    let ty = match input.read_u8() {
        TAG_VOID => Type::Void,
        TAG_SCALAR => Type::Scalar(base(input.read_u8())?),
        TAG_VECTOR => Type::Vector {
            base: base(input.read_u8())?,
            components: input.read_u8(),
        },
        TAG_MATRIX => Type::Matrix {
            base: base(input.read_u8())?,
            columns: input.read_u8(),
            rows: input.read_u8(),
        },
        TAG_ARRAY => {
            let len = input.read_u32();
            let element = decode(db, input, depth + 1)?;
            Type::Array { element, len }
        }
        tag @ (TAG_STRUCT | TAG_INTERFACE) => {
            let name = input.read_string();
            // A field is at least a length prefix plus a type tag.
            let count = input.read_len(5);
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                let field = input.read_string();
                fields.push((field, decode(db, input, depth + 1)?));
            }
            if tag == TAG_STRUCT {
                Type::Struct { name, fields }
            } else {
                Type::Interface { name, fields }
            }
        }
        TAG_SAMPLER => {
            let dim = SamplerDim::from_raw(u32::from(input.read_u8()))?;
            let bits = input.read_u8();
            Type::Sampler {
                dim,
                shadow: bits & 1 != 0,
                array: bits & 2 != 0,
                result: base(input.read_u8())?,
            }
        }
        _ => return None,
    };
    Some(db.intern(ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(db: &mut TypeDb, id: TypeId) -> Option<TypeId> {
        let mut out = BlobWriter::new();
        db.encode_type(id, &mut out).unwrap();
        let bytes = out.into_bytes();
        let mut input = BlobReader::new(&bytes);
        let decoded = db.decode_type(&mut input);
        assert_eq!(input.remaining(), 0);
        decoded
    }

    #[test]
    fn same_database_returns_same_ids() {
        let mut db = TypeDb::new();
        let vec4 = db.vector(BaseType::Float, 4);
        let arr = db.intern(Type::Array {
            element: vec4,
            len: 8,
        });
        let light = db.intern(Type::Struct {
            name: "Light".to_string(),
            fields: vec![("color".to_string(), vec4), ("cascades".to_string(), arr)],
        });
        let before = db.len();
        assert_eq!(round_trip(&mut db, light), Some(light));
        assert_eq!(db.len(), before);
    }

    #[test]
    fn fresh_database_reinterns() {
        let mut src = TypeDb::new();
        let sampler = src.intern(Type::Sampler {
            dim: SamplerDim::Cube,
            shadow: true,
            array: false,
            result: BaseType::Float,
        });
        let mut out = BlobWriter::new();
        src.encode_type(sampler, &mut out).unwrap();

        let mut dst = TypeDb::new();
        dst.scalar(BaseType::Int);
        let bytes = out.into_bytes();
        let id = dst.decode_type(&mut BlobReader::new(&bytes)).unwrap();
        assert_eq!(dst.get(id), src.get(sampler));
    }

    #[test]
    fn rollback_forgets_types_added_after_checkpoint() {
        let mut db = TypeDb::new();
        let int = db.scalar(BaseType::Int);
        let mark = db.checkpoint();
        let vec3 = db.vector(BaseType::Float, 3);
        db.rollback(mark);
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(vec3), None);
        assert_eq!(db.scalar(BaseType::Int), int);
        assert_eq!(db.vector(BaseType::Float, 3), vec3);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut db = TypeDb::new();
        let bytes = [0xEEu8];
        assert_eq!(db.decode_type(&mut BlobReader::new(&bytes)), None);
    }

    #[test]
    fn foreign_id_is_internal_error() {
        let db = TypeDb::new();
        let mut out = BlobWriter::new();
        assert!(db.encode_type(TypeId::from_raw(3), &mut out).is_err());
    }
}
