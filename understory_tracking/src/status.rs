// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node tracking status.

/// The tracking gate and change-detection policy of a node.
///
/// Flags are compared when a subtree is attached to a parent: a child whose
/// flags differ from its new parent's is forced to match before anything else
/// touches it. See [`TrackableExt::adopt`](crate::TrackableExt::adopt).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingFlags {
    /// Whether mutation signals have any effect.
    pub enabled: bool,
    /// If `true`, a write is dirty only when the new value differs from the
    /// old one. If `false`, every write is dirty.
    pub compare_on_write: bool,
}

impl TrackingFlags {
    /// Tracking enabled; every write marks dirty.
    pub const WRITE_IMPLIES_DIRTY: Self = Self {
        enabled: true,
        compare_on_write: false,
    };

    /// Tracking enabled; only value-changing writes mark dirty.
    pub const COMPARE_ON_WRITE: Self = Self {
        enabled: true,
        compare_on_write: true,
    };

    /// Tracking disabled; all mutation signals are ignored.
    pub const DISABLED: Self = Self {
        enabled: false,
        compare_on_write: false,
    };
}

impl Default for TrackingFlags {
    fn default() -> Self {
        Self::WRITE_IMPLIES_DIRTY
    }
}

/// Dirty/new state of a single graph node.
///
/// Every node in a tracked graph owns exactly one `TrackingStatus`. The status
/// only records what happened to its own node; cascading questions ("is
/// anything below me dirty?") are answered by
/// [`TrackableExt`](crate::TrackableExt), which walks the graph.
///
/// A fresh status is new, clean, and tracking with
/// [`TrackingFlags::WRITE_IMPLIES_DIRTY`].
///
/// # Example
///
/// ```
/// use understory_tracking::TrackingStatus;
///
/// let mut status = TrackingStatus::new();
/// assert!(status.is_new());
///
/// status.after_write();
/// assert!(status.is_dirty());
///
/// status.reset();
/// assert!(!status.is_new());
/// assert!(!status.is_dirty());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingStatus {
    new: bool,
    dirty: bool,
    tracking_enabled: bool,
    compare_on_write: bool,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingStatus {
    /// Creates the status of a freshly created node.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_flags(TrackingFlags::WRITE_IMPLIES_DIRTY)
    }

    /// Creates the status of a freshly created node with the given flags.
    #[must_use]
    pub const fn with_flags(flags: TrackingFlags) -> Self {
        Self {
            new: true,
            dirty: false,
            tracking_enabled: flags.enabled,
            compare_on_write: flags.compare_on_write,
        }
    }

    /// Returns `true` until the node is reset.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Sets the new flag.
    pub fn set_new(&mut self, new: bool) {
        self.new = new;
    }

    /// Returns the node's own dirty flag, ignoring the tracking gate.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Returns `true` if mutation signals currently have an effect.
    #[must_use]
    pub fn is_tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    /// Sets the tracking gate.
    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracking_enabled = enabled;
    }

    /// Returns `true` if writes are compared against the previous value.
    #[must_use]
    pub fn is_compare_on_write(&self) -> bool {
        self.compare_on_write
    }

    /// Sets the change-detection policy.
    pub fn set_compare_on_write(&mut self, compare_on_write: bool) {
        self.compare_on_write = compare_on_write;
    }

    /// Returns the tracking gate and policy as one value.
    #[must_use]
    pub fn flags(&self) -> TrackingFlags {
        TrackingFlags {
            enabled: self.tracking_enabled,
            compare_on_write: self.compare_on_write,
        }
    }

    /// Replaces the tracking gate and policy.
    pub fn set_flags(&mut self, flags: TrackingFlags) {
        self.tracking_enabled = flags.enabled;
        self.compare_on_write = flags.compare_on_write;
    }

    /// Returns `true` if tracking is enabled and the node is dirty.
    ///
    /// This is how a node answers when a parent asks whether it is dirty.
    #[must_use]
    pub fn reports_dirty(&self) -> bool {
        self.tracking_enabled && self.dirty
    }

    /// Marks the node dirty if tracking is enabled.
    ///
    /// Returns `true` if the mark was applied.
    pub fn mark_dirty(&mut self) -> bool {
        if self.tracking_enabled {
            self.dirty = true;
        }
        self.tracking_enabled
    }

    /// Clears the new and dirty flags, establishing a checkpoint.
    ///
    /// The tracking gate and policy are left alone.
    pub fn reset(&mut self) {
        self.new = false;
        self.dirty = false;
    }

    /// Handles the signal sent before a field write.
    ///
    /// Only acts when tracking is enabled and the policy is compare-on-write.
    /// `current` is the value still stored in the field and `new` the value
    /// about to replace it; `None` stands for an absent value. The node is
    /// marked dirty when exactly one side is absent or both are present and
    /// unequal. An existing dirty mark is never cleared.
    ///
    /// Returns `true` if the write was judged a change.
    pub fn before_write<T>(&mut self, current: Option<&T>, new: Option<&T>) -> bool
    where
        T: PartialEq + ?Sized,
    {
        if !(self.tracking_enabled && self.compare_on_write) {
            return false;
        }
        let changed = match (current, new) {
            (None, None) => false,
            (Some(current), Some(new)) => current != new,
            _ => true,
        };
        self.compared_write(changed)
    }

    /// Applies the outcome of a compare-on-write check done by the caller.
    ///
    /// Same gating as [`before_write`](Self::before_write). Returns `true` if
    /// the node was marked.
    pub fn compared_write(&mut self, changed: bool) -> bool {
        if !(self.tracking_enabled && self.compare_on_write) || !changed {
            return false;
        }
        self.dirty = true;
        true
    }

    /// Handles the signal sent after a field write.
    ///
    /// Only acts when tracking is enabled and the policy is write-implies-dirty,
    /// in which case the node is marked dirty without looking at values.
    ///
    /// Returns `true` if the node was marked.
    pub fn after_write(&mut self) -> bool {
        if !self.tracking_enabled || self.compare_on_write {
            return false;
        }
        self.dirty = true;
        true
    }

    /// Records a container mutation.
    ///
    /// Under compare-on-write only calls that `changed` the container mark
    /// dirty; otherwise every call does.
    pub(crate) fn record_mutation(&mut self, changed: bool) {
        if changed || !self.compare_on_write {
            self.mark_dirty();
        }
    }
}
