// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracked set.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::changes::CollectionChangeTracker;
use crate::collection::TrackedCore;
use crate::error::{Operation, TrackingError};
use crate::freeze::{Freezable, FreezeState};
use crate::status::{TrackingFlags, TrackingStatus};
use crate::trackable::{Composite, Trackable};

/// A tracked hash set.
///
/// Members are values: they cannot be mutated in place, so cascades
/// (dirty queries, reset, tracking switches, freezing) do not enter them.
/// Classification of a member as new, removed or kept is O(1).
///
/// # Example
///
/// ```
/// use understory_tracking::{TrackableExt, TrackedSet};
///
/// let mut tags: TrackedSet<&str> = ["red", "blue"].into_iter().collect();
/// tags.insert("green").unwrap();
/// tags.remove(&"red").unwrap();
///
/// let keys = tags.current_keys(["red", "blue"]);
/// assert_eq!(keys.len(), 2);
/// assert!(keys.contains("green"));
/// assert!(tags.is_node_dirty());
/// ```
#[derive(Clone, Debug)]
pub struct TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    items: HashSet<V>,
    core: TrackedCore<V>,
}

impl<V> Default for TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    /// Creates an empty set with default tracking flags.
    #[must_use]
    pub fn new() -> Self {
        Self::with_flags(TrackingFlags::default())
    }

    /// Creates an empty set with the given tracking flags.
    #[must_use]
    pub fn with_flags(flags: TrackingFlags) -> Self {
        Self {
            items: HashSet::new(),
            core: TrackedCore::new(flags),
        }
    }

    /// Wraps existing members; they form the baseline and are not new.
    #[must_use]
    pub fn from_set(items: HashSet<V>) -> Self {
        Self {
            items,
            core: TrackedCore::new(TrackingFlags::default()),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if `value` is a member.
    #[must_use]
    pub fn contains(&self, value: &V) -> bool {
        self.items.contains(value)
    }

    /// Iterates over the members.
    pub fn iter(&self) -> hashbrown::hash_set::Iter<'_, V> {
        self.items.iter()
    }

    /// Returns the members as a plain set.
    #[must_use]
    pub fn as_set(&self) -> &HashSet<V> {
        &self.items
    }

    /// Returns the change bookkeeping.
    #[must_use]
    pub fn changes(&self) -> &CollectionChangeTracker<V> {
        &self.core.changes
    }

    /// Members inserted since the last checkpoint.
    #[must_use]
    pub fn new_entries(&self) -> &HashSet<V> {
        self.core.changes.new_entries()
    }

    /// Members removed since the last checkpoint.
    #[must_use]
    pub fn removed_entries(&self) -> &HashSet<V> {
        self.core.changes.removed_entries()
    }

    /// Members present at the last checkpoint and still present.
    pub fn not_new_or_removed_entries(&self) -> impl Iterator<Item = &V> + '_ {
        self.core.changes.not_new_or_removed(&self.items)
    }

    /// Returns `(members ∩ original) ∪ new`.
    #[must_use]
    pub fn current_keys<I>(&self, original: I) -> HashSet<V>
    where
        I: IntoIterator<Item = V>,
    {
        self.core
            .changes
            .current_keys(|key| self.items.contains(key), original)
    }

    /// Adds a member.
    ///
    /// Returns `true` if `value` was not already a member.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the set is frozen.
    pub fn insert(&mut self, value: V) -> Result<bool, TrackingError> {
        self.core.guard(Operation::Add)?;
        let added = self.insert_unchecked(value);
        self.core.status.record_mutation(added);
        Ok(added)
    }

    /// Removes a member.
    ///
    /// Returns `true` if `value` was a member.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the set is frozen.
    pub fn remove(&mut self, value: &V) -> Result<bool, TrackingError> {
        self.core.guard(Operation::Remove)?;
        let removed = self.items.remove(value);
        if removed {
            self.core.changes.record_remove(value, false);
        }
        self.core.status.record_mutation(removed);
        Ok(removed)
    }

    /// Removes every member.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the set is frozen.
    pub fn clear(&mut self) -> Result<(), TrackingError> {
        self.core.guard(Operation::Clear)?;
        let changed = !self.items.is_empty();
        let items = core::mem::take(&mut self.items);
        self.core.record_removals(&items, |_| false);
        self.core.status.record_mutation(changed);
        Ok(())
    }

    /// Keeps only the members for which `keep` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the set is frozen.
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
        self.core.record_removals(&dropped, |_| false);
        self.core.status.record_mutation(!dropped.is_empty());
        Ok(())
    }

    /// Adds every member of `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] if the set is frozen.
    pub fn extend<I>(&mut self, values: I) -> Result<(), TrackingError>
    where
        I: IntoIterator<Item = V>,
    {
        self.core.guard(Operation::Extend)?;
        let mut changed = false;
        for value in values {
            changed |= self.insert_unchecked(value);
        }
        self.core.status.record_mutation(changed);
        Ok(())
    }

    fn insert_unchecked(&mut self, value: V) -> bool {
        if self.items.contains(&value) {
            return false;
        }
        self.core.changes.record_insert(&value, false);
        self.items.insert(value)
    }
}

impl<V> Trackable for TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    fn tracking_status(&self) -> &TrackingStatus {
        &self.core.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.core.status
    }

    fn reset_changes(&mut self) {
        self.core.changes.reset();
    }

    fn check_changes(&self) -> Result<(), TrackingError> {
        self.core.changes.check(|entry| self.items.contains(entry))
    }
}

impl<V> Freezable for TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    fn freeze_state(&self) -> &FreezeState {
        &self.core.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.core.freeze
    }
}

impl<V> Composite for TrackedSet<V>
where
    V: Eq + Hash + Clone,
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

impl<V> FromIterator<V> for TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}

impl<'a, V> IntoIterator for &'a TrackedSet<V>
where
    V: Eq + Hash + Clone,
{
    type Item = &'a V;
    type IntoIter = hashbrown::hash_set::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Freezer, TrackableExt};

    fn checkpointed() -> TrackedSet<u8> {
        let mut set: TrackedSet<u8> = [1, 2, 3].into_iter().collect();
        set.reset_dirty().unwrap();
        set
    }

    #[test]
    fn classification_after_mixed_changes() {
        let mut set = checkpointed();
        set.insert(4).unwrap();
        set.remove(&1).unwrap();

        assert!(set.new_entries().contains(&4));
        assert!(set.removed_entries().contains(&1));
        let mut kept: Vec<_> = set.not_new_or_removed_entries().copied().collect();
        kept.sort_unstable();
        assert_eq!(kept, [2, 3]);
    }

    #[test]
    fn duplicate_insert_is_not_new() {
        let mut set = checkpointed();
        assert!(!set.insert(2).unwrap());
        assert!(set.new_entries().is_empty());
    }

    #[test]
    fn compare_on_write_skips_no_ops() {
        let mut set = TrackedSet::with_flags(TrackingFlags::COMPARE_ON_WRITE);
        set.extend([1_u8, 2]).unwrap();
        set.reset_dirty().unwrap();

        set.insert(1).unwrap();
        set.remove(&9).unwrap();
        assert!(!set.is_node_dirty());

        set.remove(&1).unwrap();
        assert!(set.is_node_dirty());
    }

    #[test]
    fn clear_and_retain_record_removals() {
        let mut set = checkpointed();
        set.insert(7).unwrap();
        set.retain(|v| *v != 2).unwrap();
        assert!(set.removed_entries().contains(&2));

        set.clear().unwrap();
        assert!(set.new_entries().is_empty());
        assert_eq!(set.removed_entries().len(), 3);
        assert!(set.check_graph().is_ok());
    }

    #[test]
    fn frozen_set_rejects_insert() {
        let mut set = checkpointed();
        Freezer::new().freeze(&mut set).unwrap();
        assert!(set.insert(9).unwrap_err().is_frozen());
        assert!(!set.contains(&9));
        assert!(set.new_entries().is_empty());
    }
}
