// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracked map.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::changes::CollectionChangeTracker;
use crate::collection::TrackedCore;
use crate::error::{Operation, TrackingError};
use crate::freeze::{Freezable, FreezeState};
use crate::hook::Field;
use crate::status::{TrackingFlags, TrackingStatus};
use crate::trackable::{Composite, Trackable};

/// A tracked hash map.
///
/// Bookkeeping is by key: a key is new if it was absent at the last
/// checkpoint, removed if it was present and is gone. Replacing the value of
/// an existing key is a write, not an insertion, and always marks the map
/// dirty while tracking is enabled.
///
/// Keys are values and are not cascaded into. Values are: a value holding
/// trackable nodes is adopted on insert and visited by dirty queries, reset
/// and freezing.
///
/// # Example
///
/// ```
/// use understory_tracking::{TrackableExt, TrackedMap};
///
/// let mut prices: TrackedMap<&str, u32> = [("tea", 3)].into_iter().collect();
/// prices.reset_dirty().unwrap();
///
/// prices.insert("coffee", 4).unwrap();
/// assert_eq!(prices.insert("tea", 5).unwrap(), Some(3));
/// assert!(prices.new_entries().contains("coffee"));
/// assert!(prices.removed_entries().is_empty());
/// assert!(prices.is_node_dirty());
/// ```
#[derive(Clone, Debug)]
pub struct TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    items: HashMap<K, V>,
    core: TrackedCore<K>,
}

impl<K, V> Default for TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    /// Creates an empty map with default tracking flags.
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(TrackingFlags::default())
    }

    /// Creates an empty map with the given tracking flags.
    #[must_use]
    pub fn with_flags(flags: TrackingFlags) -> Self {
        Self {
            items: HashMap::new(),
            core: TrackedCore::new(flags),
        }
    }

    /// Wraps existing entries; their keys form the baseline and are not new.
    #[must_use]
    pub fn from_map(items: HashMap<K, V>) -> Self {
        Self {
            items,
            core: TrackedCore::new(TrackingFlags::default()),
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

    /// Returns the entries as a plain map.
    #[must_use]
    pub fn as_map(&self) -> &HashMap<K, V> {
        &self.items
    }

    /// Returns the key bookkeeping.
    #[must_use]
    pub fn changes(&self) -> &CollectionChangeTracker<K> {
        &self.core.changes
    }

    /// Keys inserted since the last checkpoint.
    #[must_use]
    pub fn new_entries(&self) -> &HashSet<K> {
        self.core.changes.new_entries()
    }

    /// Keys removed since the last checkpoint.
    #[must_use]
    pub fn removed_entries(&self) -> &HashSet<K> {
        self.core.changes.removed_entries()
    }

    /// Keys present at the last checkpoint and still present.
    pub fn not_new_or_removed_entries(&self) -> impl Iterator<Item = &K> + '_ {
        self.core.changes.not_new_or_removed(self.items.keys())
    }

    /// Returns `(keys ∩ original) ∪ new`.
    #[must_use]
    pub fn current_keys<I>(&self, original: I) -> HashSet<K>
    where
        I: IntoIterator<Item = K>,
    {
        self.core
            .changes
            .current_keys(|key| self.items.contains_key(key), original)
    }

    /// Puts `value` under `key`, returning the value it replaces.
    ///
    /// Values are not compared, so every put counts as a change even under
    /// compare-on-write; see [`insert_compared`](Self::insert_compared).
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TrackingError> {
        self.core.guard(Operation::Put)?;
        let old = self.insert_unchecked(key, value);
        self.core.status.record_mutation(true);
        Ok(old)
    }

    /// Removes `key`, returning its value.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, TrackingError> {
        self.core.guard(Operation::Remove)?;
        let old = self.items.remove(key);
        if old.is_some() {
            self.core.changes.record_remove(key, false);
        }
        self.core.status.record_mutation(old.is_some());
        Ok(old)
    }

    /// Returns the value for `key` for in-place modification.
    ///
    /// Handing out the value counts as a write: the map is marked dirty when
    /// the key exists.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>, TrackingError> {
        self.core.guard(Operation::Modify)?;
        let value = self.items.get_mut(key);
        self.core.status.record_mutation(value.is_some());
        Ok(value)
    }

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.core.guard(Operation::Clear)?;
        let changed = !self.items.is_empty();
        let items = core::mem::take(&mut self.items);
        self.core.record_removals(items.keys(), |_| false);
        self.core.status.record_mutation(changed);
        Ok(())
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<(), TrackingError>
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.core.guard(Operation::Retain)?;
        let mut dropped = Vec::new();
        self.items.retain(|key, value| {
            let kept = keep(key, value);
            if !kept {
                dropped.push(key.clone());
            }
            kept
        });
        self.core.record_removals(&dropped, |_| false);
        self.core.status.record_mutation(!dropped.is_empty());
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
        self.core.guard(Operation::Extend)?;
        let mut changed = false;
        for (key, value) in entries {
            self.insert_unchecked(key, value);
            changed = true;
        }
        self.core.status.record_mutation(changed);
        Ok(())
    }

    fn insert_unchecked(&mut self, key: K, mut value: V) -> Option<V> {
        self.core.adopt(&mut value);
        let present = self.items.contains_key(&key);
        self.core.changes.record_insert(&key, present);
        self.items.insert(key, value)
    }
}

impl<K, V> TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite + PartialEq,
{
    /// Like [`insert`](Self::insert), but putting a value equal to the one
    /// already stored is not a change under compare-on-write.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the map is frozen.
    pub fn insert_compared(&mut self, key: K, value: V) -> Result<Option<V>, TrackingError> {
        self.core.guard(Operation::Put)?;
        let changed = self.items.get(&key) != Some(&value);
        let old = self.insert_unchecked(key, value);
        self.core.status.record_mutation(changed);
        Ok(old)
    }
}

impl<K, V> Trackable for TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    fn tracking_status(&self) -> &TrackingStatus {
        &self.core.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.core.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        for value in self.items.values() {
            value.for_each_trackable(visitor);
        }
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        for value in self.items.values_mut() {
            value.for_each_trackable_mut(visitor);
        }
    }

    fn reset_changes(&mut self) {
        self.core.changes.reset();
    }

    fn check_changes(&self) -> Result<(), TrackingError> {
        self.core.changes.check(|key| self.items.contains_key(key))
    }
}

impl<K, V> Freezable for TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    fn freeze_state(&self) -> &FreezeState {
        &self.core.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.core.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        let field = Field::element::<V>();
        for value in self.items.values_mut() {
            value.for_each_freezable_mut(&mut |node| visitor(field, node));
        }
    }
}

impl<K, V> Composite for TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        visitor(self);
    }

    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        visitor(self);
    }

    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        visitor(self);
    }
}

impl<K, V> FromIterator<(K, V)> for TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Composite,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<'a, K, V> IntoIterator for &'a TrackedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = hashbrown::hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
