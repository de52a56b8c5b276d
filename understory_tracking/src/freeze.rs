// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cascading immutability.
//!
//! A [`Freezable`] node owns a [`FreezeState`]; while it is set, every
//! mutator of the node (or of the containers built on it) fails with
//! [`TrackingError::Frozen`]. The [`Freezer`] sets or clears the flag on a
//! root and on everything reachable from it through accepted fields.
//!
//! Freezing is independent of dirty tracking: it neither reads nor changes
//! any [`TrackingStatus`](crate::TrackingStatus), and dirty queries keep
//! working on frozen nodes.

use crate::error::{Operation, TrackingError};
use crate::hook::{Field, FieldRole};
use crate::scratch::WalkScratch;

/// The frozen flag of a node or container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FreezeState {
    frozen: bool,
}

impl FreezeState {
    /// Creates an unfrozen state.
    #[must_use]
    pub const fn new() -> Self {
        Self { frozen: false }
    }

    /// Returns `true` if mutation is refused.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Sets the flag.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Fails if frozen; call before performing `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Frozen`] naming `operation`.
    pub fn check(&self, operation: Operation) -> Result<(), TrackingError> {
        if self.frozen {
            tracing::debug!(%operation, "rejected mutation of frozen object");
            return Err(TrackingError::Frozen { operation });
        }
        Ok(())
    }
}

/// A node or container that can be frozen.
///
/// Implementors own one [`FreezeState`] and list the freezable values they
/// compose, each tagged with the [`Field`] it lives in so the [`Freezer`]'s
/// filter can skip it.
pub trait Freezable {
    /// Returns the frozen flag.
    fn freeze_state(&self) -> &FreezeState;

    /// Returns the frozen flag mutably.
    fn freeze_state_mut(&mut self) -> &mut FreezeState;

    /// Calls `visitor` for each directly composed freezable child.
    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        let _ = visitor;
    }

    /// Returns `true` if the node is frozen.
    fn is_frozen(&self) -> bool {
        self.freeze_state().is_frozen()
    }

    /// Address of the [`Shared`](crate::Shared) node this stands in for, if
    /// the handle could not be borrowed. Only that stand-in overrides this.
    #[doc(hidden)]
    fn borrowed_shared(&self) -> Option<usize> {
        None
    }
}

/// Decides which fields a [`Freezer`] descends into.
///
/// Any `Fn(&Field) -> bool` closure is a filter.
pub trait FieldFilter {
    /// Returns `true` if the freeze cascade should enter `field`.
    fn accept(&self, field: &Field) -> bool;
}

impl<F> FieldFilter for F
where
    F: Fn(&Field) -> bool,
{
    fn accept(&self, field: &Field) -> bool {
        self(field)
    }
}

/// The default filter: descends into every field except
/// [`FieldRole::Internal`] ones.
#[derive(Copy, Clone, Debug, Default)]
pub struct SkipInternal;

impl FieldFilter for SkipInternal {
    fn accept(&self, field: &Field) -> bool {
        field.role() != FieldRole::Internal
    }
}

/// Freezes and unfreezes subtrees.
///
/// The walk is eager: the flag is written on the root and on every node
/// reached through fields the filter accepts. Each node is processed once per
/// call, so graphs with back-references (see [`Shared`](crate::Shared)) are
/// fine. The graph is walked once without changes first, so a walk blocked by
/// a borrowed shared node leaves every flag as it was.
///
/// # Example
///
/// ```
/// use understory_tracking::{Freezable, Freezer, TrackedMap};
///
/// let mut map = TrackedMap::new();
/// map.insert("k", "v").unwrap();
///
/// Freezer::new().freeze(&mut map).unwrap();
/// assert!(map.insert("k2", "v2").unwrap_err().is_frozen());
/// assert_eq!(map.len(), 1);
///
/// Freezer::new().unfreeze(&mut map).unwrap();
/// assert!(map.insert("k2", "v2").is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Freezer<F = SkipInternal> {
    filter: F,
}

impl Freezer {
    /// Creates a freezer with the [`SkipInternal`] filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: SkipInternal,
        }
    }
}

impl<F: FieldFilter> Freezer<F> {
    /// Creates a freezer with a custom field filter.
    #[must_use]
    pub fn with_filter(filter: F) -> Self {
        Self { filter }
    }

    /// Returns the field filter.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Freezes `root` and every accepted node reachable from it.
    ///
    /// Returns the number of nodes processed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Borrowed`] if the walk reaches a shared node
    /// borrowed elsewhere; nothing is frozen then.
    pub fn freeze<N>(&self, root: &mut N) -> Result<usize, TrackingError>
    where
        N: Freezable + ?Sized,
    {
        self.freeze_with(root, &mut WalkScratch::new())
    }

    /// Unfreezes `root` and every accepted node reachable from it.
    ///
    /// Returns the number of nodes processed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Borrowed`] if the walk reaches a shared node
    /// borrowed elsewhere; nothing is unfrozen then.
    pub fn unfreeze<N>(&self, root: &mut N) -> Result<usize, TrackingError>
    where
        N: Freezable + ?Sized,
    {
        self.unfreeze_with(root, &mut WalkScratch::new())
    }

    /// Like [`freeze`](Self::freeze), reusing `scratch`.
    ///
    /// # Errors
    ///
    /// See [`freeze`](Self::freeze).
    pub fn freeze_with<N>(
        &self,
        root: &mut N,
        scratch: &mut WalkScratch,
    ) -> Result<usize, TrackingError>
    where
        N: Freezable + ?Sized,
    {
        self.apply(root, true, scratch)
    }

    /// Like [`unfreeze`](Self::unfreeze), reusing `scratch`.
    ///
    /// # Errors
    ///
    /// See [`unfreeze`](Self::unfreeze).
    pub fn unfreeze_with<N>(
        &self,
        root: &mut N,
        scratch: &mut WalkScratch,
    ) -> Result<usize, TrackingError>
    where
        N: Freezable + ?Sized,
    {
        self.apply(root, false, scratch)
    }

    fn apply<N>(
        &self,
        root: &mut N,
        frozen: bool,
        scratch: &mut WalkScratch,
    ) -> Result<usize, TrackingError>
    where
        N: Freezable + ?Sized,
    {
        scratch.reset();
        set_frozen(root, None, &self.filter, scratch)?;
        scratch.reset();
        set_frozen(root, Some(frozen), &self.filter, scratch)?;
        tracing::trace!(nodes = scratch.visited(), frozen, "applied freeze state");
        Ok(scratch.visited())
    }
}

/// Writes `frozen` on every accepted node; `None` only reaches them.
fn set_frozen<N>(
    node: &mut N,
    frozen: Option<bool>,
    filter: &dyn FieldFilter,
    scratch: &mut WalkScratch,
) -> Result<(), TrackingError>
where
    N: Freezable + ?Sized,
{
    if let Some(addr) = node.borrowed_shared() {
        return scratch.unborrowable(addr);
    }
    if !scratch.first_visit(&*node, node.freeze_state()) {
        return Ok(());
    }
    if let Some(frozen) = frozen {
        node.freeze_state_mut().set_frozen(frozen);
    }
    let mut result = Ok(());
    node.visit_freezable_mut(&mut |field, child| {
        if result.is_ok() && filter.accept(&field) {
            result = set_frozen(child, frozen, filter, scratch);
        }
    });
    result
}
