// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The trackable capability and its cascading operations.
//!
//! A node participates in tracking by implementing [`Trackable`]: it exposes
//! its [`TrackingStatus`] and enumerates the trackable children it composes.
//! [`TrackableExt`] builds every cascading operation (dirty queries, reset,
//! start/stop tracking) on top of that enumeration, so callers never propagate
//! state by hand.
//!
//! Values stored in fields or containers are reached through [`Composite`],
//! which plain data types implement as leaves and node types implement by
//! yielding themselves.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};
use core::hash::{Hash, Hasher};

use crate::error::TrackingError;
use crate::freeze::{Freezable, FreezeState};
use crate::scratch::{WalkScratch, node_addr};
use crate::status::{TrackingFlags, TrackingStatus};

/// A node of a tracked object graph.
///
/// Implementors own one [`TrackingStatus`] and list the trackable values they
/// compose (fields, tracked containers, shared handles). Children are only
/// observed; listing a child does not imply ownership.
///
/// # Example
///
/// ```
/// use understory_tracking::{Trackable, TrackableExt, TrackedList, TrackingStatus};
///
/// struct Playlist {
///     status: TrackingStatus,
///     songs: TrackedList<String>,
/// }
///
/// impl Trackable for Playlist {
///     fn tracking_status(&self) -> &TrackingStatus {
///         &self.status
///     }
///
///     fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
///         &mut self.status
///     }
///
///     fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
///         visitor(&self.songs);
///     }
///
///     fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
///         visitor(&mut self.songs);
///     }
/// }
///
/// let mut playlist = Playlist {
///     status: TrackingStatus::new(),
///     songs: TrackedList::new(),
/// };
/// playlist.reset_dirty().unwrap();
///
/// playlist.songs.push("intro".to_string()).unwrap();
/// assert!(playlist.is_node_dirty());
/// assert!(!playlist.tracking_status().is_dirty());
/// ```
pub trait Trackable {
    /// Returns the node's status.
    fn tracking_status(&self) -> &TrackingStatus;

    /// Returns the node's status mutably.
    fn tracking_status_mut(&mut self) -> &mut TrackingStatus;

    /// Calls `visitor` once for each directly composed trackable child.
    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        let _ = visitor;
    }

    /// Mutable counterpart of [`visit_children`](Self::visit_children).
    ///
    /// Must yield the same children.
    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        let _ = visitor;
    }

    /// Clears bookkeeping the node keeps beyond its status.
    ///
    /// Called by [`TrackableExt::reset_dirty`] after the status is reset.
    /// Tracked containers clear their new/removed entry sets here.
    fn reset_changes(&mut self) {}

    /// Verifies bookkeeping the node keeps beyond its status.
    fn check_changes(&self) -> Result<(), TrackingError> {
        Ok(())
    }

    /// Address of the [`Shared`] node this stands in for, if the handle could
    /// not be borrowed. Only that stand-in overrides this.
    #[doc(hidden)]
    fn borrowed_shared(&self) -> Option<usize> {
        None
    }
}

/// A value that may contain trackable or freezable nodes.
///
/// Tracked containers use this to reach into their elements. Plain data types
/// are leaves and keep the default (empty) methods; node types yield
/// themselves:
///
/// ```
/// use understory_tracking::{Composite, Trackable, TrackingStatus};
///
/// struct Note {
///     status: TrackingStatus,
/// }
///
/// impl Trackable for Note {
///     fn tracking_status(&self) -> &TrackingStatus {
///         &self.status
///     }
///
///     fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
///         &mut self.status
///     }
/// }
///
/// impl Composite for Note {
///     fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
///         visitor(self);
///     }
///
///     fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
///         visitor(self);
///     }
/// }
/// ```
pub trait Composite {
    /// Calls `visitor` for each trackable node contained in this value.
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        let _ = visitor;
    }

    /// Mutable counterpart of [`for_each_trackable`](Self::for_each_trackable).
    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        let _ = visitor;
    }

    /// Calls `visitor` for each freezable node contained in this value.
    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        let _ = visitor;
    }
}

macro_rules! leaf_composite {
    ($($ty:ty),* $(,)?) => {
        $(impl Composite for $ty {})*
    };
}

leaf_composite!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &str,
);

impl<T: Composite> Composite for Option<T> {
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        if let Some(value) = self {
            value.for_each_trackable(visitor);
        }
    }

    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        if let Some(value) = self {
            value.for_each_trackable_mut(visitor);
        }
    }

    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        if let Some(value) = self {
            value.for_each_freezable_mut(visitor);
        }
    }
}

impl<T: Composite + ?Sized> Composite for Box<T> {
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        (**self).for_each_trackable(visitor);
    }

    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        (**self).for_each_trackable_mut(visitor);
    }

    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        (**self).for_each_freezable_mut(visitor);
    }
}

impl<T: Composite> Composite for Vec<T> {
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        for value in self {
            value.for_each_trackable(visitor);
        }
    }

    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        for value in self {
            value.for_each_trackable_mut(visitor);
        }
    }

    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        for value in self {
            value.for_each_freezable_mut(visitor);
        }
    }
}

/// A shared, interior-mutable handle to a node.
///
/// Use this for back-references (a child pointing at its parent) and for
/// nodes reachable from more than one place. Cascades visit the node behind
/// the handle at most once per call. The handle should hold a node that
/// yields itself from [`Composite`], so a back-reference to a node the walk
/// is already inside is recognised.
///
/// A cascade that reaches a handle borrowed outside the walk fails with
/// [`TrackingError::Borrowed`] and changes nothing; only flag adoption on
/// attach leaves such nodes as they are.
///
/// Equality and hashing use the identity of the allocation, not the value.
#[derive(Debug)]
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    /// Wraps `value` in a new shared handle.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Borrows the node.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed mutably.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Borrows the node mutably.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the node, matching the address cascades record for it.
    fn addr(&self) -> usize {
        self.0.as_ptr().cast::<()>().addr()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Shared<T> {}

impl<T> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl<T: Composite> Composite for Shared<T> {
    fn for_each_trackable(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        match self.0.try_borrow() {
            Ok(node) => node.for_each_trackable(visitor),
            Err(_) => visitor(&BorrowedNode::new(self.addr())),
        }
    }

    fn for_each_trackable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        let addr = self.addr();
        match self.0.try_borrow_mut() {
            Ok(mut node) => node.for_each_trackable_mut(visitor),
            Err(_) => visitor(&mut BorrowedNode::new(addr)),
        }
    }

    fn for_each_freezable_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Freezable)) {
        let addr = self.addr();
        match self.0.try_borrow_mut() {
            Ok(mut node) => node.for_each_freezable_mut(visitor),
            Err(_) => visitor(&mut BorrowedNode::new(addr)),
        }
    }
}

/// Stand-in yielded for a [`Shared`] node that cannot be borrowed.
struct BorrowedNode {
    addr: usize,
    status: TrackingStatus,
    freeze: FreezeState,
}

impl BorrowedNode {
    fn new(addr: usize) -> Self {
        Self {
            addr,
            status: TrackingStatus::new(),
            freeze: FreezeState::new(),
        }
    }
}

impl Trackable for BorrowedNode {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }

    fn borrowed_shared(&self) -> Option<usize> {
        Some(self.addr)
    }
}

impl Freezable for BorrowedNode {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn borrowed_shared(&self) -> Option<usize> {
        Some(self.addr)
    }
}

/// Cascading operations for every [`Trackable`] node.
///
/// Cascades that reach a [`Shared`] node borrowed outside the walk fail with
/// [`TrackingError::Borrowed`]. Those that change state walk the graph once
/// without changing anything first, so a failure leaves every node as it was.
pub trait TrackableExt: Trackable {
    /// Returns `true` if tracking is enabled and this node or one of its
    /// direct children reports dirty.
    ///
    /// Children are asked for their own flag only; grandchildren are not
    /// consulted. Use [`is_graph_dirty`](Self::is_graph_dirty) for the whole
    /// subtree. A child that is borrowed mutably elsewhere cannot be read and
    /// counts as dirty.
    #[must_use]
    fn is_node_dirty(&self) -> bool {
        let status = self.tracking_status();
        if !status.is_tracking_enabled() {
            return false;
        }
        if status.is_dirty() {
            return true;
        }
        let this = node_addr(self);
        let mut dirty = false;
        self.visit_children(&mut |child| {
            dirty = dirty
                || match child.borrowed_shared() {
                    Some(addr) => addr != this,
                    None => child.tracking_status().reports_dirty(),
                };
        });
        dirty
    }

    /// Returns `true` if tracking is enabled and anything reachable from
    /// this node is dirty.
    ///
    /// A child with tracking disabled answers `false` for its whole subtree.
    /// A reachable node that is borrowed mutably elsewhere cannot be read, so
    /// the graph counts as dirty; use
    /// [`try_is_graph_dirty`](Self::try_is_graph_dirty) to tell the cases
    /// apart.
    #[must_use]
    fn is_graph_dirty(&self) -> bool {
        self.is_graph_dirty_with(&mut WalkScratch::new())
    }

    /// Like [`is_graph_dirty`](Self::is_graph_dirty), reusing `scratch`.
    fn is_graph_dirty_with(&self, scratch: &mut WalkScratch) -> bool {
        self.try_is_graph_dirty_with(scratch).unwrap_or(true)
    }

    /// Like [`is_graph_dirty`](Self::is_graph_dirty), but reports nodes it
    /// cannot read.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Borrowed`] if a reachable shared node is
    /// borrowed mutably elsewhere and nothing read so far was dirty.
    fn try_is_graph_dirty(&self) -> Result<bool, TrackingError> {
        self.try_is_graph_dirty_with(&mut WalkScratch::new())
    }

    /// Like [`try_is_graph_dirty`](Self::try_is_graph_dirty), reusing
    /// `scratch`.
    ///
    /// # Errors
    ///
    /// See [`try_is_graph_dirty`](Self::try_is_graph_dirty).
    fn try_is_graph_dirty_with(&self, scratch: &mut WalkScratch) -> Result<bool, TrackingError> {
        scratch.reset();
        graph_dirty(self, scratch)
    }

    /// Verifies the change bookkeeping of every node reachable from this one.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Inconsistent`] for the first broken invariant,
    /// or [`TrackingError::Borrowed`] if a reachable shared node is borrowed
    /// mutably elsewhere.
    fn check_graph(&self) -> Result<(), TrackingError> {
        let mut scratch = WalkScratch::new();
        check_walk(self, &mut scratch)
    }

    /// Establishes a checkpoint for this node and everything reachable from it.
    ///
    /// Clears the new and dirty flags and every container's new/removed entry
    /// sets. The graph is checked first; nothing is reset if the check fails.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Inconsistent`] if the bookkeeping of some node
    /// is broken, or [`TrackingError::Borrowed`] if a reachable shared node is
    /// borrowed elsewhere.
    fn reset_dirty(&mut self) -> Result<(), TrackingError> {
        self.reset_dirty_with(&mut WalkScratch::new())
    }

    /// Like [`reset_dirty`](Self::reset_dirty), reusing `scratch`.
    ///
    /// # Errors
    ///
    /// See [`reset_dirty`](Self::reset_dirty).
    fn reset_dirty_with(&mut self, scratch: &mut WalkScratch) -> Result<(), TrackingError> {
        guarded_walk(self, Pass::Check, Pass::Reset, scratch)?;
        tracing::trace!(nodes = scratch.visited(), "reset tracked graph");
        Ok(())
    }

    /// Enables tracking with the given policy.
    ///
    /// With `cascade`, every node reachable from this one is switched too.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Borrowed`] if a cascade reaches a shared node
    /// borrowed elsewhere. Without `cascade` this cannot fail.
    fn start_tracking(
        &mut self,
        cascade: bool,
        compare_on_write: bool,
    ) -> Result<(), TrackingError> {
        let flags = TrackingFlags {
            enabled: true,
            compare_on_write,
        };
        if !cascade {
            self.tracking_status_mut().set_flags(flags);
            return Ok(());
        }
        let mut scratch = WalkScratch::new();
        guarded_walk(self, Pass::Reach, Pass::Flags(flags), &mut scratch)?;
        tracing::trace!(nodes = scratch.visited(), compare_on_write, "started tracking");
        Ok(())
    }

    /// Disables tracking, leaving the policy as it was.
    ///
    /// With `cascade`, every node reachable from this one is switched too.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Borrowed`] if a cascade reaches a shared node
    /// borrowed elsewhere. Without `cascade` this cannot fail.
    fn stop_tracking(&mut self, cascade: bool) -> Result<(), TrackingError> {
        if !cascade {
            self.tracking_status_mut().set_tracking_enabled(false);
            return Ok(());
        }
        let mut scratch = WalkScratch::new();
        guarded_walk(self, Pass::Reach, Pass::Disable, &mut scratch)?;
        tracing::trace!(nodes = scratch.visited(), "stopped tracking");
        Ok(())
    }

    /// Forces `child`'s subtree to use this node's tracking flags.
    ///
    /// Call this whenever a subtree is attached under this node. Nothing
    /// happens if the child already matches. Shared nodes borrowed elsewhere,
    /// typically the ancestors being mutated, are left as they are.
    ///
    /// Returns `true` if the child's flags were changed.
    fn adopt<C>(&self, child: &mut C) -> bool
    where
        C: Trackable + ?Sized,
    {
        align_flags(self.tracking_status().flags(), child)
    }
}

impl<T: Trackable + ?Sized> TrackableExt for T {}

/// Forces `node`'s subtree to `flags` if `node` does not already match.
pub(crate) fn align_flags<N>(flags: TrackingFlags, node: &mut N) -> bool
where
    N: Trackable + ?Sized,
{
    if node.tracking_status().flags() == flags {
        return false;
    }
    let mut scratch = WalkScratch::new();
    // Adoption never reports borrowed nodes, so this walk cannot fail.
    let _ = walk_mut(node, Pass::Adopt(flags), &mut scratch);
    true
}

/// What a mutable walk does at each node.
#[derive(Copy, Clone, Debug)]
enum Pass {
    /// Nothing; only proves every node can be borrowed.
    Reach,
    /// Verifies change bookkeeping.
    Check,
    /// Clears status and change bookkeeping.
    Reset,
    /// Enables tracking with the given policy.
    Flags(TrackingFlags),
    /// Disables tracking.
    Disable,
    /// Like `Flags`, skipping nodes borrowed elsewhere.
    Adopt(TrackingFlags),
}

/// Runs `dry` over the graph, then `apply` if it succeeded.
fn guarded_walk<N>(
    node: &mut N,
    dry: Pass,
    apply: Pass,
    scratch: &mut WalkScratch,
) -> Result<(), TrackingError>
where
    N: Trackable + ?Sized,
{
    scratch.reset();
    walk_mut(node, dry, scratch)?;
    scratch.reset();
    walk_mut(node, apply, scratch)
}

fn walk_mut<N>(node: &mut N, pass: Pass, scratch: &mut WalkScratch) -> Result<(), TrackingError>
where
    N: Trackable + ?Sized,
{
    if let Some(addr) = node.borrowed_shared() {
        return match pass {
            Pass::Adopt(_) => Ok(()),
            _ => scratch.unborrowable(addr),
        };
    }
    if !scratch.first_visit(&*node, node.tracking_status()) {
        return Ok(());
    }
    match pass {
        Pass::Reach => {}
        Pass::Check => {
            if let Err(err) = node.check_changes() {
                tracing::warn!("change bookkeeping check failed: {err}");
                return Err(err);
            }
        }
        Pass::Reset => {
            node.tracking_status_mut().reset();
            node.reset_changes();
        }
        Pass::Flags(flags) | Pass::Adopt(flags) => node.tracking_status_mut().set_flags(flags),
        Pass::Disable => node.tracking_status_mut().set_tracking_enabled(false),
    }
    let mut result = Ok(());
    node.visit_children_mut(&mut |child| {
        if result.is_ok() {
            result = walk_mut(child, pass, scratch);
        }
    });
    result
}

fn graph_dirty<N>(node: &N, scratch: &mut WalkScratch) -> Result<bool, TrackingError>
where
    N: Trackable + ?Sized,
{
    if let Some(addr) = node.borrowed_shared() {
        scratch.unborrowable(addr)?;
        return Ok(false);
    }
    let status = node.tracking_status();
    if !scratch.first_visit(node, status) || !status.is_tracking_enabled() {
        return Ok(false);
    }
    if status.is_dirty() {
        return Ok(true);
    }
    let mut result = Ok(false);
    node.visit_children(&mut |child| {
        if result == Ok(false) {
            result = graph_dirty(child, scratch);
        }
    });
    result
}

fn check_walk<N>(node: &N, scratch: &mut WalkScratch) -> Result<(), TrackingError>
where
    N: Trackable + ?Sized,
{
    if let Some(addr) = node.borrowed_shared() {
        return scratch.unborrowable(addr);
    }
    if !scratch.first_visit(node, node.tracking_status()) {
        return Ok(());
    }
    if let Err(err) = node.check_changes() {
        tracing::warn!("change bookkeeping check failed: {err}");
        return Err(err);
    }
    let mut result = Ok(());
    node.visit_children(&mut |child| {
        if result.is_ok() {
            result = check_walk(child, scratch);
        }
    });
    result
}
