// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable visited-set storage for graph walks.

use core::ptr;

use hashbrown::HashSet;

use crate::error::TrackingError;

/// Reusable scratch storage for cascading walks.
///
/// Every cascade (reset, tracking on/off, freeze/unfreeze, graph-wide dirty
/// queries) records the nodes it has processed so that shared children and
/// back-references are handled once per call. A node is identified by the
/// address of the flag it owns ([`TrackingStatus`](crate::TrackingStatus) or
/// [`FreezeState`](crate::FreezeState)), which is unique among live nodes.
///
/// The walk also remembers where each node it entered lives. A
/// [`Shared`](crate::Shared) node the walk cannot borrow is accepted only if
/// the walk itself holds it (a back-reference to a node on the current path);
/// anything else is a borrow held elsewhere and fails the walk with
/// [`TrackingError::Borrowed`].
///
/// The sets retain capacity across calls. Callers walking large graphs
/// repeatedly can keep one scratch per thread and pass it to the `*_with`
/// entry points.
#[derive(Debug, Default)]
pub struct WalkScratch {
    visited: HashSet<usize>,
    entered: HashSet<usize>,
}

impl WalkScratch {
    /// Creates an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
            entered: HashSet::new(),
        }
    }

    /// Creates an empty scratch buffer with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            visited: HashSet::with_capacity(capacity),
            entered: HashSet::with_capacity(capacity),
        }
    }

    /// Returns the number of nodes visited by the last walk.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    pub(crate) fn reset(&mut self) {
        self.visited.clear();
        self.entered.clear();
    }

    /// Records `node`, which owns `flag`, as visited; returns `false` if it
    /// already was.
    pub(crate) fn first_visit<N: ?Sized, T>(&mut self, node: &N, flag: &T) -> bool {
        self.entered.insert(node_addr(node));
        self.visited.insert(ptr::from_ref(flag).addr())
    }

    /// Resolves a shared node at `addr` that the walk could not borrow.
    pub(crate) fn unborrowable(&self, addr: usize) -> Result<(), TrackingError> {
        if self.entered.contains(&addr) {
            return Ok(());
        }
        tracing::warn!("cascade blocked by a shared node borrowed elsewhere");
        Err(TrackingError::Borrowed)
    }
}

/// Address of the value `node` points at, without pointer metadata.
pub(crate) fn node_addr<N: ?Sized>(node: &N) -> usize {
    ptr::from_ref(node).cast::<()>().addr()
}
