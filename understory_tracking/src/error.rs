// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for tracked and freezable containers.

use core::fmt;

/// A mutating operation, as named in errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Appending or adding an entry.
    Add,
    /// Inserting an entry at a position.
    Insert,
    /// Replacing the entry at a position.
    Set,
    /// Inserting or replacing a map entry.
    Put,
    /// Removing an entry.
    Remove,
    /// Removing the last entry of a list.
    Pop,
    /// Removing every entry.
    Clear,
    /// Removing the entries rejected by a predicate.
    Retain,
    /// Adding several entries at once.
    Extend,
    /// Shortening a list.
    Truncate,
    /// Borrowing a stored value mutably.
    Modify,
    /// Writing a field of a node.
    Write,
}

impl Operation {
    /// Returns the lowercase name of this operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Insert => "insert",
            Self::Set => "set",
            Self::Put => "put",
            Self::Remove => "remove",
            Self::Pop => "pop",
            Self::Clear => "clear",
            Self::Retain => "retain",
            Self::Extend => "extend",
            Self::Truncate => "truncate",
            Self::Modify => "modify",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broken bookkeeping invariant found by a consistency check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Inconsistency {
    /// An entry recorded as removed is still among the live entries.
    RemovedStillPresent,
    /// An entry recorded as new is no longer among the live entries.
    NewNotPresent,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemovedStillPresent => f.write_str("a removed entry is still present"),
            Self::NewNotPresent => f.write_str("a new entry is no longer present"),
        }
    }
}

/// Error returned by tracked and freezable operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingError {
    /// A mutation was attempted on a frozen node or container.
    Frozen {
        /// The rejected operation.
        operation: Operation,
    },
    /// A positional mutation referenced an index past the end of a list.
    IndexOutOfBounds {
        /// The rejected operation.
        operation: Operation,
        /// The requested index.
        index: usize,
        /// The list length at the time of the call.
        len: usize,
    },
    /// Change bookkeeping no longer matches the live entries.
    Inconsistent {
        /// Which invariant is broken.
        reason: Inconsistency,
    },
    /// A cascade reached a [`Shared`](crate::Shared) node that is borrowed
    /// outside the walk.
    ///
    /// Nothing was changed; release the borrow and retry.
    Borrowed,
}

impl TrackingError {
    /// Returns `true` if this is a frozen-mutation error.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen { .. })
    }

    /// Returns `true` if a cascade was blocked by an outstanding borrow.
    #[must_use]
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Self::Borrowed)
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen { operation } => write!(
                f,
                "cannot {operation}: the containing object is frozen"
            ),
            Self::IndexOutOfBounds {
                operation,
                index,
                len,
            } => write!(f, "cannot {operation} at index {index}: length is {len}"),
            Self::Inconsistent { reason } => {
                write!(f, "inconsistent change bookkeeping: {reason}")
            }
            Self::Borrowed => f.write_str("a reachable shared node is borrowed elsewhere"),
        }
    }
}

impl core::error::Error for TrackingError {}
