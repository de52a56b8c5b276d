// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracked list.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::changes::CollectionChangeTracker;
use crate::collection::TrackedCollection;
use crate::error::{Operation, TrackingError};
use crate::freeze::{Freezable, FreezeState};
use crate::hook::Field;
use crate::status::{TrackingFlags, TrackingStatus};
use crate::trackable::{Composite, Trackable};

/// A tracked, ordered list.
///
/// Adds positional mutators to [`TrackedCollection`]. A positional write is
/// bookkept as removal of the displaced element followed by insertion of the
/// new one; replacing an element with an equal one therefore leaves no trace
/// in the change sets. Indices are validated before anything is touched.
///
/// There is no in-place element access: elements are their own bookkeeping
/// keys, so editing one where it stands would corrupt the change sets. Nodes
/// that are edited after insertion belong behind [`Shared`](crate::Shared)
/// handles, whose writes the list's dirty queries see through the handle.
///
/// # Example
///
/// ```
/// use understory_tracking::{TrackableExt, TrackedList};
///
/// let mut list = TrackedList::new();
/// list.push("a").unwrap();
/// list.push("b").unwrap();
/// assert_eq!(list.new_entries().len(), 2);
///
/// list.reset_dirty().unwrap();
/// assert!(list.new_entries().is_empty());
///
/// list.remove_item(&"a").unwrap();
/// assert!(list.removed_entries().contains(&"a"));
/// assert_eq!(list.as_slice(), &["b"]);
/// ```
#[derive(Clone, Debug)]
pub struct TrackedList<V>
where
    V: Eq + Hash + Clone,
{
    inner: TrackedCollection<V>,
}

impl<V> Default for TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    /// Creates an empty list with default tracking flags.
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(TrackingFlags::default())
    }

    /// Creates an empty list with the given tracking flags.
    #[must_use]
    pub fn with_flags(flags: TrackingFlags) -> Self {
        Self {
            inner: TrackedCollection::with_flags(flags),
        }
    }

    /// Wraps existing elements; they form the baseline and are not new.
    #[must_use]
    pub fn from_vec(items: Vec<V>) -> Self {
        Self {
            inner: TrackedCollection::from_vec(items),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        self.inner.items.get(index)
    }

    /// Returns `true` if `value` is an element.
    #[must_use]
    pub fn contains(&self, value: &V) -> bool {
        self.inner.contains(value)
    }

    /// Returns the index of the first element equal to `value`.
    #[must_use]
    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.inner.items.iter().position(|item| item == value)
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> core::slice::Iter<'_, V> {
        self.inner.iter()
    }

    /// Returns the elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[V] {
        self.inner.as_slice()
    }

    /// Returns the change bookkeeping.
    #[must_use]
    pub fn changes(&self) -> &CollectionChangeTracker<V> {
        self.inner.changes()
    }

    /// Elements inserted since the last checkpoint.
    #[must_use]
    pub fn new_entries(&self) -> &HashSet<V> {
        self.inner.new_entries()
    }

    /// Elements removed since the last checkpoint.
    #[must_use]
    pub fn removed_entries(&self) -> &HashSet<V> {
        self.inner.removed_entries()
    }

    /// Elements present at the last checkpoint and still present, in order.
    pub fn not_new_or_removed_entries(&self) -> impl Iterator<Item = &V> + '_ {
        self.inner.not_new_or_removed_entries()
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn push(&mut self, value: V) -> Result<(), TrackingError> {
        self.inner.add(value)
    }

    /// Inserts an element at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index > len`.
    pub fn insert(&mut self, index: usize, value: V) -> Result<(), TrackingError> {
        self.inner.core.guard(Operation::Insert)?;
        self.check_index(Operation::Insert, index, self.len() + 1)?;
        self.inner.insert_unchecked(index, value);
        self.inner.core.status.record_mutation(true);
        Ok(())
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index >= len`.
    pub fn set(&mut self, index: usize, value: V) -> Result<V, TrackingError> {
        self.inner.core.guard(Operation::Set)?;
        self.check_index(Operation::Set, index, self.len())?;
        let changed = self.inner.items[index] != value;
        let old = self.inner.remove_index_unchecked(index);
        self.inner.insert_unchecked(index, value);
        self.inner.core.status.record_mutation(changed);
        Ok(old)
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen, or
    /// [`TrackingError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove(&mut self, index: usize) -> Result<V, TrackingError> {
        self.inner.core.guard(Operation::Remove)?;
        self.check_index(Operation::Remove, index, self.len())?;
        let old = self.inner.remove_index_unchecked(index);
        self.inner.core.status.record_mutation(true);
        Ok(old)
    }

    /// Removes the first element equal to `value`.
    ///
    /// Returns `true` if an element was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn remove_item(&mut self, value: &V) -> Result<bool, TrackingError> {
        self.inner.remove(value)
    }

    /// Removes and returns the last element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn pop(&mut self) -> Result<Option<V>, TrackingError> {
        self.inner.core.guard(Operation::Pop)?;
        let popped = match self.len() {
            0 => None,
            len => Some(self.inner.remove_index_unchecked(len - 1)),
        };
        self.inner.core.status.record_mutation(popped.is_some());
        Ok(popped)
    }

    /// Removes every element past `len`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn truncate(&mut self, len: usize) -> Result<(), TrackingError> {
        self.inner.core.guard(Operation::Truncate)?;
        let changed = len < self.len();
        while let Some(last) = self.len().checked_sub(1).filter(|last| *last >= len) {
            self.inner.remove_index_unchecked(last);
        }
        self.inner.core.status.record_mutation(changed);
        Ok(())
    }

    /// Removes every element.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.inner.clear()
    }

    /// Keeps only the elements for which `keep` returns `true`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn retain<F>(&mut self, keep: F) -> Result<(), TrackingError>
    where
        F: FnMut(&V) -> bool,
    {
        self.inner.retain(keep)
    }

    /// Appends every element of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the list is frozen.
    pub fn extend<I>(&mut self, values: I) -> Result<(), TrackingError>
    where
        I: IntoIterator<Item = V>,
    {
        self.inner.extend(values)
    }

    fn check_index(
        &self,
        operation: Operation,
        index: usize,
        bound: usize,
    ) -> Result<(), TrackingError> {
        if index < bound {
            Ok(())
        } else {
            Err(TrackingError::IndexOutOfBounds {
                operation,
                index,
                len: self.len(),
            })
        }
    }
}

impl<V> Trackable for TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn tracking_status(&self) -> &TrackingStatus {
        self.inner.tracking_status()
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        self.inner.tracking_status_mut()
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        self.inner.visit_children(visitor);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        self.inner.visit_children_mut(visitor);
    }

    fn reset_changes(&mut self) {
        self.inner.reset_changes();
    }

    fn check_changes(&self) -> Result<(), TrackingError> {
        self.inner.check_changes()
    }
}

impl<V> Freezable for TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn freeze_state(&self) -> &FreezeState {
        self.inner.freeze_state()
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        self.inner.freeze_state_mut()
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        self.inner.visit_freezable_mut(visitor);
    }
}

impl<V> Composite for TrackedList<V>
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

impl<V> FromIterator<V> for TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, V> IntoIterator for &'a TrackedList<V>
where
    V: Eq + Hash + Clone + Composite,
{
    type Item = &'a V;
    type IntoIter = core::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
