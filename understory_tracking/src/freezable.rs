// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Containers that can be frozen but keep no change bookkeeping.
//!
//! These are for plain data held by freezable nodes where only immutability
//! matters: they refuse every mutation while frozen and are otherwise thin
//! wrappers over `Vec` and [`HashMap`].

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::error::{Operation, TrackingError};
use crate::freeze::{Freezable, FreezeState};
use crate::hook::Field;
use crate::trackable::Composite;

/// A freezable, ordered collection.
///
/// # Example
///
/// ```
/// use understory_tracking::{FreezableCollection, Freezer};
///
/// let mut names = FreezableCollection::from_vec(vec!["ada"]);
/// Freezer::new().freeze(&mut names).unwrap();
///
/// assert!(names.push("grace").unwrap_err().is_frozen());
/// assert_eq!(names.as_slice(), &["ada"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FreezableCollection<V> {
    items: Vec<V>,
    freeze: FreezeState,
}

impl<V: Composite> FreezableCollection<V> {
    /// Creates an empty, unfrozen collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            freeze: FreezeState::new(),
        }
    }

    /// Wraps existing elements.
    #[must_use]
    pub fn from_vec(items: Vec<V>) -> Self {
        Self {
            items,
            freeze: FreezeState::new(),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        self.items.get(index)
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> core::slice::Iter<'_, V> {
        self.items.iter()
    }

    /// Returns the elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[V] {
        &self.items
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn push(&mut self, value: V) -> Result<(), TrackingError> {
        self.freeze.check(Operation::Add)?;
        self.items.push(value);
        Ok(())
    }

    /// Inserts an element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index > len`.
    pub fn insert(&mut self, index: usize, value: V) -> Result<(), TrackingError> {
        self.freeze.check(Operation::Insert)?;
        if index > self.items.len() {
            return Err(TrackingError::IndexOutOfBounds {
                operation: Operation::Insert,
                index,
                len: self.items.len(),
            });
        }
        self.items.insert(index, value);
        Ok(())
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index >= len`.
    pub fn set(&mut self, index: usize, value: V) -> Result<V, TrackingError> {
        self.freeze.check(Operation::Set)?;
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(TrackingError::IndexOutOfBounds {
                operation: Operation::Set,
                index,
                len,
            })?;
        Ok(core::mem::replace(slot, value))
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove(&mut self, index: usize) -> Result<V, TrackingError> {
        self.freeze.check(Operation::Remove)?;
        if index >= self.items.len() {
            return Err(TrackingError::IndexOutOfBounds {
                operation: Operation::Remove,
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Removes and returns the last element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn pop(&mut self) -> Result<Option<V>, TrackingError> {
        self.freeze.check(Operation::Pop)?;
        Ok(self.items.pop())
    }

    /// Removes every element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.freeze.check(Operation::Clear)?;
        self.items.clear();
        Ok(())
    }

    /// Keeps only the elements for which `keep` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn retain<F>(&mut self, keep: F) -> Result<(), TrackingError>
    where
        F: FnMut(&V) -> bool,
    {
        self.freeze.check(Operation::Retain)?;
        self.items.retain(keep);
        Ok(())
    }

    /// Appends every element of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn extend<I>(&mut self, values: I) -> Result<(), TrackingError>
    where
        I: IntoIterator<Item = V>,
    {
        self.freeze.check(Operation::Extend)?;
        self.items.extend(values);
        Ok(())
    }
}

impl<V: Composite> Freezable for FreezableCollection<V> {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        let field = Field::element::<V>();
        self.items.for_each_freezable_mut(&mut |node| visitor(field, node));
    }
}

impl<V: Composite> Composite for FreezableCollection<V> {
    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        visitor(self);
    }
}

impl<V: Composite> FromIterator<V> for FreezableCollection<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, V> IntoIterator for &'a FreezableCollection<V> {
    type Item = &'a V;
    type IntoIter = core::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A freezable hash map.
///
/// # Example
///
/// ```
/// use understory_tracking::{FreezableMap, Freezer};
///
/// let mut env = FreezableMap::new();
/// env.insert("HOME", "/root").unwrap();
///
/// Freezer::new().freeze(&mut env).unwrap();
/// assert!(env.remove(&"HOME").unwrap_err().is_frozen());
/// assert_eq!(env.get(&"HOME"), Some(&"/root"));
/// ```
#[derive(Clone, Debug)]
pub struct FreezableMap<K, V> {
    items: HashMap<K, V>,
    freeze: FreezeState,
}

impl<K, V> Default for FreezableMap<K, V>
where
    K: Eq + Hash,
    V: Composite,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FreezableMap<K, V>
where
    K: Eq + Hash,
    V: Composite,
{
    /// Creates an empty, unfrozen map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Wraps existing entries.
    #[must_use]
    pub fn from_map(items: HashMap<K, V>) -> Self {
        Self {
            items,
            freeze: FreezeState::new(),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.items.get(key)
    }

    /// Returns `true` if `key` has a value.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.items.contains_key(key)
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> hashbrown::hash_map::Iter<'_, K, V> {
        self.items.iter()
    }

    /// Iterates over the keys.
    pub fn keys(&self) -> hashbrown::hash_map::Keys<'_, K, V> {
        self.items.keys()
    }

    /// Iterates over the values.
    pub fn values(&self) -> hashbrown::hash_map::Values<'_, K, V> {
        self.items.values()
    }

    /// Puts `value` under `key`, returning the value it replaces.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TrackingError> {
        self.freeze.check(Operation::Put)?;
        Ok(self.items.insert(key, value))
    }

    /// Removes `key`, returning its value.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, TrackingError> {
        self.freeze.check(Operation::Remove)?;
        Ok(self.items.remove(key))
    }

    /// Returns the value for `key` for in-place modification.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>, TrackingError> {
        self.freeze.check(Operation::Modify)?;
        Ok(self.items.get_mut(key))
    }

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.freeze.check(Operation::Clear)?;
        self.items.clear();
        Ok(())
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn retain<F>(&mut self, keep: F) -> Result<(), TrackingError>
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.freeze.check(Operation::Retain)?;
        self.items.retain(keep);
        Ok(())
    }

    /// Puts every entry of `entries`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn extend<I>(&mut self, entries: I) -> Result<(), TrackingError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.freeze.check(Operation::Extend)?;
        self.items.extend(entries);
        Ok(())
    }
}

impl<K, V> Freezable for FreezableMap<K, V>
where
    K: Eq + Hash,
    V: Composite,
{
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        let field = Field::element::<V>();
        for value in self.items.values_mut() {
            value.for_each_freezable_mut(&mut |node| visitor(field, node));
        }
    }
}

impl<K, V> Composite for FreezableMap<K, V>
where
    K: Eq + Hash,
    V: Composite,
{
    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        visitor(self);
    }
}

impl<K, V> FromIterator<(K, V)> for FreezableMap<K, V>
where
    K: Eq + Hash,
    V: Composite,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<'a, K, V> IntoIterator for &'a FreezableMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = hashbrown::hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
