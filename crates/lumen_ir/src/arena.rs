//! Generic arena for dense, ID-indexed storage of IR nodes.
//!
//! Every function, block, instruction, value, variable and register of a
//! [`Program`](crate::program::Program) lives in one of its arenas, so the
//! whole graph is freed together when the program is dropped.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense, ID-indexed container for IR nodes.
///
/// Items are only ever appended, so IDs stay valid for the lifetime of the
/// arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns a reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the item with the given ID, or `None` if the ID does not
    /// belong to this arena.
    ///
    /// Used wherever a handle comes from outside the arena's owner, e.g. when
    /// walking a caller-built graph that may hold dangling handles.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Mutable variant of [`try_get`](Self::try_get).
    pub fn try_get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over references to items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BlockId, ValueId};

    #[test]
    fn alloc_and_get() {
        let mut arena: Arena<BlockId, String> = Arena::new();
        let id = arena.alloc("entry".to_string());
        assert_eq!(arena[id], "entry");
    }

    #[test]
    fn ids_are_dense() {
        let mut arena: Arena<ValueId, u32> = Arena::new();
        let a = arena.alloc(10);
        let b = arena.alloc(20);
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn try_get_out_of_range() {
        let mut arena: Arena<ValueId, u32> = Arena::new();
        arena.alloc(1);
        assert_eq!(arena.try_get(ValueId::from_raw(0)), Some(&1));
        assert!(arena.try_get(ValueId::from_raw(7)).is_none());
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<BlockId, Vec<u32>> = Arena::new();
        let id = arena.alloc(Vec::new());
        arena[id].push(3);
        assert_eq!(arena[id], vec![3]);
    }

    #[test]
    fn iter_pairs_ids_with_items() {
        let mut arena: Arena<BlockId, &str> = Arena::new();
        arena.alloc("a");
        arena.alloc("b");
        let collected: Vec<_> = arena.iter().map(|(id, v)| (id.as_raw(), *v)).collect();
        assert_eq!(collected, vec![(0, "a"), (1, "b")]);
    }

    #[test]
    fn default_is_empty() {
        let arena: Arena<BlockId, u32> = Arena::default();
        assert!(arena.is_empty());
    }
}
