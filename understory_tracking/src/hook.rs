// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The field-write interception contract.
//!
//! This crate does not intercept writes itself. Whatever does (hand-written
//! setters, generated accessors) implements [`MutationHook`] to decide which
//! fields are observed, and routes each observed write through
//! [`write_field`] or [`try_write_field`]. Those drive the two signals of
//! [`TrackingStatus`](crate::TrackingStatus) in the required order: the
//! compare-on-write check sees the old value before the slot is overwritten,
//! and the write-implies-dirty mark follows the write.

use crate::error::{Operation, TrackingError};
use crate::freeze::Freezable;
use crate::trackable::{Composite, Trackable, align_flags};

/// How a field takes part in tracking and freezing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Ordinary state: writes are tracked and freezing cascades through it.
    #[default]
    Tracked,
    /// Derived or cached state: writes never reach the tracking hooks.
    Transient,
    /// Infrastructure (back-pointers into framework objects, caches of
    /// foreign types): never tracked and skipped by the default freeze filter.
    Internal,
}

/// Describes a field of a node.
///
/// Fields are passed to [`MutationHook::intercepts`] on writes and to a
/// [`FieldFilter`](crate::FieldFilter) while freezing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    name: &'static str,
    type_name: &'static str,
    role: FieldRole,
}

impl Field {
    /// Name used for the elements of a container.
    pub const ELEMENT: &'static str = "[element]";

    /// Describes a tracked field without recording its type.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            type_name: "",
            role: FieldRole::Tracked,
        }
    }

    /// Describes a tracked field holding a `T`.
    #[must_use]
    pub fn of<T: ?Sized>(name: &'static str) -> Self {
        Self {
            name,
            type_name: core::any::type_name::<T>(),
            role: FieldRole::Tracked,
        }
    }

    /// Describes the element slot of a container of `T`.
    #[must_use]
    pub fn element<T: ?Sized>() -> Self {
        Self::of::<T>(Self::ELEMENT)
    }

    /// Returns this field with the [`FieldRole::Transient`] role.
    #[must_use]
    pub const fn transient(self) -> Self {
        self.with_role(FieldRole::Transient)
    }

    /// Returns this field with the [`FieldRole::Internal`] role.
    #[must_use]
    pub const fn internal(self) -> Self {
        self.with_role(FieldRole::Internal)
    }

    /// Returns this field with the given role.
    #[must_use]
    pub const fn with_role(self, role: FieldRole) -> Self {
        Self { role, ..self }
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name recorded by [`Field::of`], or `""`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the field role.
    #[must_use]
    pub const fn role(&self) -> FieldRole {
        self.role
    }

    /// Returns `true` if writes to this field are tracked.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self.role, FieldRole::Tracked)
    }
}

/// The interceptor side of the write contract.
///
/// An interceptor decides which field writes reach the tracking layer.
/// The default observes exactly the fields whose role is
/// [`FieldRole::Tracked`].
pub trait MutationHook {
    /// Returns `true` if writes to `field` should be tracked.
    fn intercepts(&self, field: &Field) -> bool {
        field.is_tracked()
    }
}

/// A [`MutationHook`] that observes every tracked field.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultHook;

impl MutationHook for DefaultHook {}

/// Writes `value` into the slot selected by `slot`, signalling `node`'s status.
///
/// If `hook` does not intercept `field`, this is a plain write. Otherwise:
///
/// 1. the before-write signal compares the stored value with `value`
///    (compare-on-write policy only);
/// 2. trackable nodes inside `value` are forced to `node`'s tracking flags if
///    `node` is tracking;
/// 3. the slot is overwritten;
/// 4. the after-write signal marks the node (write-implies-dirty policy only).
///
/// Returns the previous value of the slot.
///
/// # Example
///
/// ```
/// use understory_tracking::{DefaultHook, Field, Trackable, TrackingStatus, write_field};
///
/// struct Counter {
///     status: TrackingStatus,
///     value: u32,
/// }
///
/// impl Trackable for Counter {
///     fn tracking_status(&self) -> &TrackingStatus {
///         &self.status
///     }
///
///     fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
///         &mut self.status
///     }
/// }
///
/// const VALUE: Field = Field::new("value");
///
/// let mut counter = Counter { status: TrackingStatus::new(), value: 0 };
/// let old = write_field(&DefaultHook, &mut counter, &VALUE, |c| &mut c.value, 5);
/// assert_eq!(old, 0);
/// assert!(counter.status.is_dirty());
/// ```
pub fn write_field<H, N, T, S>(hook: &H, node: &mut N, field: &Field, slot: S, mut value: T) -> T
where
    H: MutationHook + ?Sized,
    N: Trackable + ?Sized,
    T: PartialEq + Composite,
    S: Fn(&mut N) -> &mut T,
{
    if !hook.intercepts(field) {
        return core::mem::replace(slot(node), value);
    }
    let flags = node.tracking_status().flags();
    if flags.enabled && flags.compare_on_write {
        let changed = *slot(node) != value;
        node.tracking_status_mut().compared_write(changed);
    }
    if flags.enabled {
        value.for_each_trackable_mut(&mut |child| {
            align_flags(flags, child);
        });
    }
    let old = core::mem::replace(slot(node), value);
    node.tracking_status_mut().after_write();
    old
}

/// Like [`write_field`], but fails if `node` is frozen.
///
/// # Errors
///
/// Returns [`TrackingError::Frozen`] with [`Operation::Write`] if the node is
/// frozen; the slot and status are left untouched.
pub fn try_write_field<H, N, T, S>(
    hook: &H,
    node: &mut N,
    field: &Field,
    slot: S,
    value: T,
) -> Result<T, TrackingError>
where
    H: MutationHook + ?Sized,
    N: Trackable + Freezable + ?Sized,
    T: PartialEq + Composite,
    S: Fn(&mut N) -> &mut T,
{
    node.freeze_state().check(Operation::Write)?;
    Ok(write_field(hook, node, field, slot, value))
}
