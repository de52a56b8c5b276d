// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insert/remove bookkeeping for tracked containers.

use core::hash::Hash;

use hashbrown::HashSet;

use crate::error::{Inconsistency, TrackingError};

/// Records which entries of a container were inserted or removed since the
/// last checkpoint.
///
/// The tracker holds only the two change sets; the live entries stay in the
/// container that owns the tracker, which reports whether an entry is present
/// around each mutation. For lists and bags the entry is the element, for maps
/// it is the key.
///
/// Invariants, checked by [`check`](Self::check):
///
/// - a removed entry is not live;
/// - a new entry is live.
///
/// Inserting an entry that was removed since the checkpoint cancels the
/// removal, and removing an entry that is new cancels its insertion, so a
/// round trip within one session leaves no trace.
///
/// # Example
///
/// ```
/// use understory_tracking::CollectionChangeTracker;
///
/// let mut changes = CollectionChangeTracker::new();
///
/// // "a" existed at the checkpoint and is removed.
/// changes.record_remove(&"a", false);
/// assert!(changes.is_removed(&"a"));
///
/// // "b" is inserted, then removed again.
/// changes.record_insert(&"b", false);
/// changes.record_remove(&"b", false);
/// assert!(changes.new_entries().is_empty());
/// assert_eq!(changes.removed_entries().len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct CollectionChangeTracker<K>
where
    K: Eq + Hash,
{
    new_entries: HashSet<K>,
    removed_entries: HashSet<K>,
}

impl<K> Default for CollectionChangeTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> CollectionChangeTracker<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a tracker with no recorded changes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            new_entries: HashSet::new(),
            removed_entries: HashSet::new(),
        }
    }

    /// Entries inserted since the last checkpoint.
    #[must_use]
    pub fn new_entries(&self) -> &HashSet<K> {
        &self.new_entries
    }

    /// Entries that existed at the last checkpoint and have been removed.
    #[must_use]
    pub fn removed_entries(&self) -> &HashSet<K> {
        &self.removed_entries
    }

    /// Returns `true` if `entry` was inserted since the last checkpoint.
    #[must_use]
    pub fn is_new(&self, entry: &K) -> bool {
        self.new_entries.contains(entry)
    }

    /// Returns `true` if `entry` was removed since the last checkpoint.
    #[must_use]
    pub fn is_removed(&self, entry: &K) -> bool {
        self.removed_entries.contains(entry)
    }

    /// Returns `true` if any insertion or removal is recorded.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_entries.is_empty() || !self.removed_entries.is_empty()
    }

    /// Records that `entry` is being inserted.
    ///
    /// `present_before` tells whether the container already held `entry`
    /// before this insertion; a duplicate insertion is not a new entry.
    pub fn record_insert(&mut self, entry: &K, present_before: bool) {
        if self.removed_entries.remove(entry) || present_before {
            return;
        }
        self.new_entries.insert(entry.clone());
    }

    /// Records that `entry` was removed.
    ///
    /// `still_present` tells whether the container still holds another copy
    /// of `entry` after the removal, in which case nothing is recorded.
    pub fn record_remove(&mut self, entry: &K, still_present: bool) {
        if still_present || self.new_entries.remove(entry) {
            return;
        }
        self.removed_entries.insert(entry.clone());
    }

    /// Returns the live entries that are neither new nor removed.
    ///
    /// `current` yields the container's live entries.
    pub fn not_new_or_removed<'a, I>(&'a self, current: I) -> impl Iterator<Item = &'a K> + 'a
    where
        I: IntoIterator<Item = &'a K>,
        I::IntoIter: 'a,
    {
        current
            .into_iter()
            .filter(move |entry| !self.new_entries.contains(*entry))
    }

    /// Computes `(live ∩ original) ∪ new` for a container keyed by identity.
    ///
    /// `is_current` tests whether an entry is live; `original` yields the
    /// entries known at the checkpoint.
    pub fn current_keys<F, I>(&self, is_current: F, original: I) -> HashSet<K>
    where
        F: Fn(&K) -> bool,
        I: IntoIterator<Item = K>,
    {
        let mut keys: HashSet<K> = original.into_iter().filter(|k| is_current(k)).collect();
        keys.extend(self.new_entries.iter().cloned());
        keys
    }

    /// Verifies the bookkeeping against the live entries.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Inconsistent`] if a removed entry is live or
    /// a new entry is not.
    pub fn check<F>(&self, is_current: F) -> Result<(), TrackingError>
    where
        F: Fn(&K) -> bool,
    {
        if self.removed_entries.iter().any(&is_current) {
            return Err(TrackingError::Inconsistent {
                reason: Inconsistency::RemovedStillPresent,
            });
        }
        if !self.new_entries.iter().all(&is_current) {
            return Err(TrackingError::Inconsistent {
                reason: Inconsistency::NewNotPresent,
            });
        }
        Ok(())
    }

    /// Forgets all recorded changes.
    pub fn reset(&mut self) {
        self.new_entries.clear();
        self.removed_entries.clear();
    }
}
