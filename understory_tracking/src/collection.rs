// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracked unordered collection, and the state shared by all tracked
//! containers.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::changes::CollectionChangeTracker;
use crate::error::{Operation, TrackingError};
use crate::freeze::{Freezable, FreezeState};
use crate::hook::Field;
use crate::status::{TrackingFlags, TrackingStatus};
use crate::trackable::{Composite, Trackable, align_flags};

/// Status, freeze flag and change bookkeeping of one tracked container.
#[derive(Clone, Debug)]
pub(crate) struct TrackedCore<K>
where
    K: Eq + Hash,
{
    pub(crate) status: TrackingStatus,
    pub(crate) freeze: FreezeState,
    pub(crate) changes: CollectionChangeTracker<K>,
}

impl<K> TrackedCore<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(flags: TrackingFlags) -> Self {
        Self {
            status: TrackingStatus::with_flags(flags),
            freeze: FreezeState::new(),
            changes: CollectionChangeTracker::new(),
        }
    }

    pub(crate) fn guard(&self, operation: Operation) -> Result<(), TrackingError> {
        self.freeze.check(operation)
    }

    /// Forces the nodes inside an incoming value to this container's flags.
    pub(crate) fn adopt<V: Composite + ?Sized>(&self, value: &mut V) {
        let flags = self.status.flags();
        if flags.enabled {
            value.for_each_trackable_mut(&mut |node| {
                align_flags(flags, node);
            });
        }
    }

    /// Records removal of every distinct entry in `entries`.
    ///
    /// `is_live` reports whether a copy remains in the container.
    pub(crate) fn record_removals<'a, I, F>(&mut self, entries: I, is_live: F)
    where
        K: 'a,
        I: IntoIterator<Item = &'a K>,
        F: Fn(&K) -> bool,
    {
        let mut seen = HashSet::new();
        for entry in entries {
            if seen.insert(entry) {
                self.changes.record_remove(entry, is_live(entry));
            }
        }
    }
}

/// A tracked, unordered collection that may hold duplicates.
///
/// Every mutator performs the mutation, updates the
/// [`CollectionChangeTracker`], and marks the collection dirty (subject to its
/// tracking flags). Mutators fail without side effects while the collection
/// is frozen. Read-only accessors go straight to the elements.
///
/// Elements are their own bookkeeping keys, so their `Eq` and `Hash` must not
/// depend on tracking or freeze state.
///
/// # Example
///
/// ```
/// use understory_tracking::{TrackableExt, TrackedCollection};
///
/// let mut bag = TrackedCollection::from_vec(vec![1, 2]);
/// bag.add(3).unwrap();
/// bag.remove(&1).unwrap();
///
/// assert!(bag.new_entries().contains(&3));
/// assert!(bag.removed_entries().contains(&1));
/// assert!(bag.is_node_dirty());
/// ```
#[derive(Clone, Debug)]
pub struct TrackedCollection<V>
where
    V: Eq + Hash + Clone,
{
    pub(crate) items: Vec<V>,
    pub(crate) core: TrackedCore<V>,
}

impl<V> Default for TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    /// Creates an empty collection with default tracking flags.
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(TrackingFlags::default())
    }

    /// Creates an empty collection with the given tracking flags.
    #[must_use]
    pub fn with_flags(flags: TrackingFlags) -> Self {
        Self {
            items: Vec::new(),
            core: TrackedCore::new(flags),
        }
    }

    /// Wraps existing elements; they form the baseline and are not new.
    #[must_use]
    pub fn from_vec(items: Vec<V>) -> Self {
        Self {
            items,
            core: TrackedCore::new(TrackingFlags::default()),
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

    /// Returns `true` if `value` is an element.
    #[must_use]
    pub fn contains(&self, value: &V) -> bool {
        self.items.contains(value)
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

    /// Returns the change bookkeeping.
    #[must_use]
    pub fn changes(&self) -> &CollectionChangeTracker<V> {
        &self.core.changes
    }

    /// Elements inserted since the last checkpoint.
    #[must_use]
    pub fn new_entries(&self) -> &HashSet<V> {
        self.core.changes.new_entries()
    }

    /// Elements removed since the last checkpoint.
    #[must_use]
    pub fn removed_entries(&self) -> &HashSet<V> {
        self.core.changes.removed_entries()
    }

    /// Elements present at the last checkpoint and still present.
    pub fn not_new_or_removed_entries(&self) -> impl Iterator<Item = &V> + '_ {
        self.core.changes.not_new_or_removed(&self.items)
    }

    /// Adds an element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn add(&mut self, value: V) -> Result<(), TrackingError> {
        self.core.guard(Operation::Add)?;
        self.push_unchecked(value);
        self.core.status.record_mutation(true);
        Ok(())
    }

    /// Removes one occurrence of `value`.
    ///
    /// Returns `true` if an element was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn remove(&mut self, value: &V) -> Result<bool, TrackingError> {
        self.core.guard(Operation::Remove)?;
        let Some(index) = self.items.iter().position(|item| item == value) else {
            self.core.status.record_mutation(false);
            return Ok(false);
        };
        self.remove_index_unchecked(index);
        self.core.status.record_mutation(true);
        Ok(true)
    }

    /// Removes every element, recording each as removed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.core.guard(Operation::Clear)?;
        let changed = !self.items.is_empty();
        let items = core::mem::take(&mut self.items);
        self.core.record_removals(&items, |_| false);
        self.core.status.record_mutation(changed);
        Ok(())
    }

    /// Keeps only the elements for which `keep` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<(), TrackingError>
    where
        F: FnMut(&V) -> bool,
    {
        self.core.guard(Operation::Retain)?;
        let mut dropped = Vec::new();
        self.items.retain(|item| {
            let kept = keep(item);
            if !kept {
                dropped.push(item.clone());
            }
            kept
        });
        let items = &self.items;
        self.core.record_removals(&dropped, |entry| items.contains(entry));
        self.core.status.record_mutation(!dropped.is_empty());
        Ok(())
    }

    /// Adds every element of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the collection is frozen.
    pub fn extend<I>(&mut self, values: I) -> Result<(), TrackingError>
    where
        I: IntoIterator<Item = V>,
    {
        self.core.guard(Operation::Extend)?;
        let before = self.items.len();
        for value in values {
            self.push_unchecked(value);
        }
        self.core.status.record_mutation(self.items.len() != before);
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, index: usize, mut value: V) {
        self.core.adopt(&mut value);
        let present = self.items.contains(&value);
        self.core.changes.record_insert(&value, present);
        self.items.insert(index, value);
    }

    fn push_unchecked(&mut self, value: V) {
        self.insert_unchecked(self.items.len(), value);
    }

    pub(crate) fn remove_index_unchecked(&mut self, index: usize) -> V {
        let value = self.items.remove(index);
        let still_present = self.items.contains(&value);
        self.core.changes.record_remove(&value, still_present);
        value
    }
}

impl<V> Trackable for TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn tracking_status(&self) -> &TrackingStatus {
        &self.core.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.core.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        self.items.for_each_trackable(visitor);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        self.items.for_each_trackable_mut(visitor);
    }

    fn reset_changes(&mut self) {
        self.core.changes.reset();
    }

    fn check_changes(&self) -> Result<(), TrackingError> {
        self.core.changes.check(|entry| self.items.contains(entry))
    }
}

impl<V> Freezable for TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn freeze_state(&self) -> &FreezeState {
        &self.core.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.core.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        let field = Field::element::<V>();
        self.items.for_each_freezable_mut(&mut |node| visitor(field, node));
    }
}

impl<V> Composite for TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
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

impl<V> FromIterator<V> for TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, V> IntoIterator for &'a TrackedCollection<V>
where
    V: Eq + Hash + Clone + Composite,
{
    type Item = &'a V;
    type IntoIter = core::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
