//! Opaque ID newtypes for all IR nodes.
//!
//! Each ID is a thin `u32` wrapper created by
//! [`Arena::alloc`](crate::arena::Arena::alloc). IDs are only meaningful
//! relative to the [`Program`](crate::program::Program) that allocated them.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A function declared in the program.
    FunctionId,
    "fn"
);

define_id!(
    /// A variable (global, local, parameter or return slot).
    VariableId,
    "var"
);

define_id!(
    /// A non-SSA register.
    RegisterId,
    "r"
);

define_id!(
    /// An SSA value produced by exactly one instruction.
    ValueId,
    "%"
);

define_id!(
    /// A basic block.
    BlockId,
    "block"
);

define_id!(
    /// An instruction.
    InstrId,
    "inst"
);

define_id!(
    /// An interned type in a [`TypeDb`](crate::types::TypeDb).
    TypeId,
    "ty"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        let id = ValueId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(BlockId::from_raw(1));
        set.insert(BlockId::from_raw(2));
        set.insert(BlockId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_uses_prefix() {
        assert_eq!(ValueId::from_raw(3).to_string(), "%3");
        assert_eq!(BlockId::from_raw(0).to_string(), "block0");
        assert_eq!(RegisterId::from_raw(5).to_string(), "r5");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = FunctionId::from_raw(99);
        let json = serde_json::to_string(&id).unwrap();
        let restored: FunctionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
