// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Tracking: mutation tracking and freezing for object graphs.
//!
//! This crate lets an application find out what changed in a graph of model
//! objects since a checkpoint, and lock parts of that graph against further
//! change. It is built from:
//!
//! - **Status** ([`TrackingStatus`], [`TrackingFlags`]): per-node `new` and
//!   `dirty` flags plus the tracking policy.
//! - **Graph capability** ([`Trackable`], [`TrackableExt`], [`Composite`]):
//!   nodes enumerate their children; dirty queries, reset and tracking
//!   switches cascade through that enumeration.
//! - **Write hooks** ([`MutationHook`], [`write_field`], [`try_write_field`]):
//!   field writes mark the owning node dirty under the node's policy.
//! - **Tracked containers** ([`TrackedCollection`], [`TrackedList`],
//!   [`TrackedSet`], [`TrackedMap`]): record inserted and removed entries in
//!   a [`CollectionChangeTracker`].
//! - **Freezing** ([`Freezer`], [`Freezable`], [`FreezableCollection`],
//!   [`FreezableMap`]): cascading immutability with a field filter.
//! - **Shared nodes** ([`Shared`]): handles for back-references; every
//!   cascade visits each node at most once.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_tracking::{
//!     Field, Freezable, FreezeState, Freezer, Trackable, TrackableExt, TrackedList,
//!     TrackingStatus,
//! };
//!
//! struct Order {
//!     status: TrackingStatus,
//!     freeze: FreezeState,
//!     lines: TrackedList<String>,
//! }
//!
//! impl Trackable for Order {
//!     fn tracking_status(&self) -> &TrackingStatus {
//!         &self.status
//!     }
//!
//!     fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
//!         &mut self.status
//!     }
//!
//!     fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
//!         visitor(&self.lines);
//!     }
//!
//!     fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
//!         visitor(&mut self.lines);
//!     }
//! }
//!
//! impl Freezable for Order {
//!     fn freeze_state(&self) -> &FreezeState {
//!         &self.freeze
//!     }
//!
//!     fn freeze_state_mut(&mut self) -> &mut FreezeState {
//!         &mut self.freeze
//!     }
//!
//!     fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
//!         visitor(Field::new("lines"), &mut self.lines);
//!     }
//! }
//!
//! let mut order = Order {
//!     status: TrackingStatus::new(),
//!     freeze: FreezeState::new(),
//!     lines: TrackedList::new(),
//! };
//! order.lines.push("tea".to_string()).unwrap();
//! assert!(order.is_node_dirty());
//!
//! // Checkpoint: everything is clean and nothing is new.
//! order.reset_dirty().unwrap();
//! assert!(!order.is_graph_dirty());
//!
//! order.lines.push("cake".to_string()).unwrap();
//! assert!(order.lines.new_entries().contains("cake"));
//!
//! // Lock the order and everything it holds.
//! Freezer::new().freeze(&mut order).unwrap();
//! assert!(order.lines.push("jam".to_string()).unwrap_err().is_frozen());
//! ```
//!
//! ## Tracking Policy
//!
//! Each node carries two policy flags, set together through
//! [`TrackingFlags`]:
//!
//! - **Write implies dirty** (the default): every write, and every container
//!   mutator call, marks the node dirty.
//! - **Compare on write**: a write marks the node dirty only if the value
//!   actually changes; container mutators mark only if the contents change.
//!
//! With tracking disabled nodes never become dirty and dirty queries answer
//! `false`, but containers keep recording inserted and removed entries.
//! [`TrackableExt::start_tracking`] and [`TrackableExt::stop_tracking`] switch
//! a node or a whole subtree; containers and [`TrackableExt::adopt`] align
//! newly attached subtrees to their parent's flags.
//!
//! ## Checkpoints
//!
//! [`TrackableExt::reset_dirty`] first verifies the bookkeeping of the whole
//! reachable graph ([`TrackableExt::check_graph`]) and only then clears the
//! flags and change sets, so a failed check leaves the graph untouched.
//!
//! ## Shared Nodes
//!
//! Back-references and nodes reachable from several places live behind
//! [`Shared`] handles. A cascade that reaches a handle borrowed outside the
//! walk fails with [`TrackingError::Borrowed`] instead of skipping the node;
//! cascades that change state check reachability before touching anything.
//! Dirty queries that cannot read such a node answer `true`.
//!
//! ## Performance Notes
//!
//! Cascading walks allocate a visited set. In hot loops reuse a
//! [`WalkScratch`] with [`TrackableExt::is_graph_dirty_with`],
//! [`TrackableExt::reset_dirty_with`] and [`Freezer::freeze_with`].
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.
//!
//! ## Features
//!
//! - `std`: lets the `tracing` facade use `std`.
//! - `serde`: derives `Serialize`/`Deserialize` for [`TrackingStatus`],
//!   [`TrackingFlags`] and [`FreezeState`].
//!
//! ## Logging
//!
//! Cascades emit `trace` events with the number of nodes visited, rejected
//! mutations of frozen objects emit a `debug` event, and failed bookkeeping
//! checks or cascades blocked by a borrow emit a `warn` event. Install any
//! `tracing` subscriber to see them.

#![no_std]

extern crate alloc;

mod changes;
mod collection;
mod error;
mod freezable;
mod freeze;
mod hook;
mod list;
mod map;
mod scratch;
mod set;
mod status;
mod trackable;

pub use changes::CollectionChangeTracker;
pub use collection::TrackedCollection;
pub use error::{Inconsistency, Operation, TrackingError};
pub use freezable::{FreezableCollection, FreezableMap};
pub use freeze::{FieldFilter, Freezable, FreezeState, Freezer, SkipInternal};
pub use hook::{DefaultHook, Field, FieldRole, MutationHook, try_write_field, write_field};
pub use list::TrackedList;
pub use map::TrackedMap;
pub use scratch::WalkScratch;
pub use set::TrackedSet;
pub use status::{TrackingFlags, TrackingStatus};
pub use trackable::{Composite, Shared, Trackable, TrackableExt};
