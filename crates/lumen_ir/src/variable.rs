//! Variables: typed, scoped storage referenced through deref chains.

use crate::ids::{TypeId, VariableId};
use serde::{Deserialize, Serialize};

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    /// Uniform (read-only, per draw).
    Uniform,
    /// Stage input.
    Input,
    /// Stage output.
    Output,
    /// Workgroup-shared memory.
    Shared,
    /// Module-scope private storage.
    Global,
    /// A system value such as the invocation ID.
    SystemValue,
    /// Function-local storage.
    Local,
    /// A function parameter.
    Param,
    /// A function return slot.
    Return,
}

impl StorageClass {
    /// All storage classes, in discriminant order.
    pub const ALL: [StorageClass; 9] = [
        StorageClass::Uniform,
        StorageClass::Input,
        StorageClass::Output,
        StorageClass::Shared,
        StorageClass::Global,
        StorageClass::SystemValue,
        StorageClass::Local,
        StorageClass::Param,
        StorageClass::Return,
    ];

    /// The storage classes held in the program's global lists, in list order.
    pub const GLOBAL: [StorageClass; 6] = [
        StorageClass::Uniform,
        StorageClass::Input,
        StorageClass::Output,
        StorageClass::Shared,
        StorageClass::Global,
        StorageClass::SystemValue,
    ];

    /// Returns the class for a raw discriminant.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Returns the raw discriminant.
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Interpolation qualifier for stage inputs/outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Default (smooth) interpolation.
    #[default]
    Smooth,
    /// No interpolation.
    Flat,
    /// Linear interpolation without perspective correction.
    NoPerspective,
}

/// Fixed-layout metadata attached to every variable.
///
/// The serializer treats this as an opaque blob and copies it verbatim, so
/// every field must have a fixed encoded size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableData {
    /// API location (-1 when unassigned).
    pub location: i32,
    /// Descriptor binding.
    pub binding: u32,
    /// Descriptor set.
    pub descriptor_set: u32,
    /// Dual-source blend index.
    pub index: u32,
    /// Location assigned by the driver's I/O lowering.
    pub driver_location: u32,
    /// First component written/read within the location.
    pub location_frac: u8,
    /// Interpolation qualifier.
    pub interpolation: Interpolation,
    /// Precision qualifier (0 = none, 1 = high, 2 = medium, 3 = low).
    pub precision: u8,
    /// Read-only storage.
    pub read_only: bool,
    /// Centroid interpolation.
    pub centroid: bool,
    /// Per-sample interpolation.
    pub sample: bool,
    /// Per-patch I/O.
    pub patch: bool,
    /// `invariant` qualifier.
    pub invariant: bool,
}

/// A recursive constant initializer.
///
/// Scalars and vectors use the four raw lanes; aggregates (arrays, structs,
/// matrices by column) leave the lanes zero and hold one child per element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantTree {
    /// Raw lane bits (up to four 64-bit lanes).
    pub lanes: [u64; 4],
    /// Child constants for aggregate initializers.
    pub elements: Vec<ConstantTree>,
}

impl ConstantTree {
    /// A scalar or vector constant.
    pub fn lanes(lanes: [u64; 4]) -> Self {
        Self {
            lanes,
            elements: Vec::new(),
        }
    }

    /// An aggregate constant.
    pub fn aggregate(elements: Vec<ConstantTree>) -> Self {
        Self {
            lanes: [0; 4],
            elements,
        }
    }

    /// Counts this node and all its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.elements.iter().map(ConstantTree::node_count).sum::<usize>()
    }
}

/// A variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Optional source-level name.
    pub name: Option<String>,
    /// Storage class.
    pub storage: StorageClass,
    /// Declared type.
    pub ty: TypeId,
    /// Fixed-layout metadata.
    pub data: VariableData,
    /// Optional constant initializer.
    pub constant_initializer: Option<ConstantTree>,
    /// For members of interface blocks, the block's type.
    pub interface_type: Option<TypeId>,
}

impl Variable {
    /// Creates a variable with default metadata and no initializer.
    pub fn new(name: Option<&str>, storage: StorageClass, ty: TypeId) -> Self {
        Self {
            name: name.map(str::to_string),
            storage,
            ty,
            data: VariableData::default(),
            constant_initializer: None,
            interface_type: None,
        }
    }
}

/// The program's global variable lists, one per global storage class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariables {
    /// Uniforms.
    pub uniforms: Vec<VariableId>,
    /// Stage inputs.
    pub inputs: Vec<VariableId>,
    /// Stage outputs.
    pub outputs: Vec<VariableId>,
    /// Shared variables.
    pub shared: Vec<VariableId>,
    /// Module-scope private variables.
    pub globals: Vec<VariableId>,
    /// System values.
    pub system_values: Vec<VariableId>,
}

impl GlobalVariables {
    /// Returns the list for a global storage class, or `None` for
    /// function-scoped classes.
    pub fn list(&self, class: StorageClass) -> Option<&Vec<VariableId>> {
        match class {
            StorageClass::Uniform => Some(&self.uniforms),
            StorageClass::Input => Some(&self.inputs),
            StorageClass::Output => Some(&self.outputs),
            StorageClass::Shared => Some(&self.shared),
            StorageClass::Global => Some(&self.globals),
            StorageClass::SystemValue => Some(&self.system_values),
            StorageClass::Local | StorageClass::Param | StorageClass::Return => None,
        }
    }

    /// Mutable variant of [`list`](Self::list).
    pub fn list_mut(&mut self, class: StorageClass) -> Option<&mut Vec<VariableId>> {
        match class {
            StorageClass::Uniform => Some(&mut self.uniforms),
            StorageClass::Input => Some(&mut self.inputs),
            StorageClass::Output => Some(&mut self.outputs),
            StorageClass::Shared => Some(&mut self.shared),
            StorageClass::Global => Some(&mut self.globals),
            StorageClass::SystemValue => Some(&mut self.system_values),
            StorageClass::Local | StorageClass::Param | StorageClass::Return => None,
        }
    }

    /// Total number of global variables.
    pub fn len(&self) -> usize {
        StorageClass::GLOBAL
            .iter()
            .filter_map(|&c| self.list(c))
            .map(Vec::len)
            .sum()
    }

    /// Returns `true` if there are no global variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_class_raw_roundtrip() {
        for class in StorageClass::ALL {
            assert_eq!(StorageClass::from_raw(class.as_raw()), Some(class));
        }
        assert_eq!(StorageClass::from_raw(99), None);
    }

    #[test]
    fn function_classes_have_no_global_list() {
        let globals = GlobalVariables::default();
        assert!(globals.list(StorageClass::Local).is_none());
        assert!(globals.list(StorageClass::Uniform).is_some());
    }

    #[test]
    fn global_len_sums_lists() {
        let mut globals = GlobalVariables::default();
        globals.inputs.push(VariableId::from_raw(0));
        globals.outputs.push(VariableId::from_raw(1));
        assert_eq!(globals.len(), 2);
    }

    #[test]
    fn constant_tree_node_count() {
        let tree = ConstantTree::aggregate(vec![
            ConstantTree::lanes([1, 0, 0, 0]),
            ConstantTree::aggregate(vec![ConstantTree::lanes([2, 3, 0, 0])]),
        ]);
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn variable_data_serde_roundtrip() {
        let data = VariableData {
            location: -1,
            binding: 3,
            interpolation: Interpolation::Flat,
            invariant: true,
            ..VariableData::default()
        };
        let json = serde_json::to_string(&data).unwrap();
        let back: VariableData = serde_json::from_str(&json).unwrap();
        assert_eq!(data, back);
    }
}
