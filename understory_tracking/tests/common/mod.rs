// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small customer/order/item model shared by the integration tests.

#![allow(
    missing_docs,
    reason = "Integration-test helper module; not part of the public API."
)]
#![allow(
    dead_code,
    reason = "Each test binary uses a different subset of the model."
)]

use understory_tracking::{
    Composite, DefaultHook, Field, Freezable, FreezeState, Shared, Trackable, TrackableExt,
    TrackedList, TrackedMap, TrackingError, TrackingFlags, TrackingStatus, try_write_field,
};

pub(crate) const QTY: Field = Field::new("qty");
pub(crate) const NOTE: Field = Field::new("note");
pub(crate) const NAME: Field = Field::new("name");

#[derive(Debug)]
pub(crate) struct Item {
    pub(crate) status: TrackingStatus,
    pub(crate) freeze: FreezeState,
    pub(crate) qty: u32,
}

impl Item {
    pub(crate) fn new(qty: u32) -> Self {
        Self {
            status: TrackingStatus::new(),
            freeze: FreezeState::new(),
            qty,
        }
    }

    pub(crate) fn set_qty(&mut self, qty: u32) -> Result<u32, TrackingError> {
        try_write_field(&DefaultHook, self, &QTY, |item| &mut item.qty, qty)
    }
}

impl Trackable for Item {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }
}

impl Freezable for Item {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }
}

impl Composite for Item {
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

pub(crate) struct Order {
    pub(crate) status: TrackingStatus,
    pub(crate) freeze: FreezeState,
    pub(crate) note: String,
    pub(crate) items: TrackedMap<u32, Item>,
    /// Back-reference to the owning customer.
    pub(crate) customer: Option<Shared<Customer>>,
}

impl Order {
    pub(crate) fn new() -> Self {
        Self {
            status: TrackingStatus::new(),
            freeze: FreezeState::new(),
            note: String::new(),
            items: TrackedMap::new(),
            customer: None,
        }
    }

    pub(crate) fn set_note(&mut self, note: &str) -> Result<String, TrackingError> {
        try_write_field(&DefaultHook, self, &NOTE, |order| &mut order.note, note.to_owned())
    }
}

impl Trackable for Order {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        visitor(&self.items);
        self.customer.for_each_trackable(visitor);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        visitor(&mut self.items);
        self.customer.for_each_trackable_mut(visitor);
    }
}

impl Freezable for Order {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        visitor(Field::new("items"), &mut self.items);
        self.customer.for_each_freezable_mut(&mut |node| {
            visitor(Field::of::<Customer>("customer").internal(), node);
        });
    }
}

impl Composite for Order {
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

pub(crate) struct Customer {
    pub(crate) status: TrackingStatus,
    pub(crate) freeze: FreezeState,
    pub(crate) name: String,
    pub(crate) orders: TrackedList<Shared<Order>>,
}

impl Customer {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            status: TrackingStatus::new(),
            freeze: FreezeState::new(),
            name: name.to_owned(),
            orders: TrackedList::new(),
        }
    }

    pub(crate) fn set_name(&mut self, name: &str) -> Result<String, TrackingError> {
        try_write_field(&DefaultHook, self, &NAME, |c| &mut c.name, name.to_owned())
    }
}

impl Trackable for Customer {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        visitor(&self.orders);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        visitor(&mut self.orders);
    }
}

impl Freezable for Customer {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        visitor(Field::new("orders"), &mut self.orders);
    }
}

impl Composite for Customer {
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

/// Builds a customer with one order holding items `1 -> 2` and `2 -> 5`,
/// linked both ways, and checkpoints it.
pub(crate) fn checkpointed_customer(flags: TrackingFlags) -> (Shared<Customer>, Shared<Order>) {
    let customer = Shared::new(Customer::new("ada"));
    let order = Shared::new(Order::new());
    {
        let mut order = order.borrow_mut();
        order.items.insert(1, Item::new(2)).unwrap();
        order.items.insert(2, Item::new(5)).unwrap();
        order.customer = Some(customer.clone());
    }
    {
        let mut customer = customer.borrow_mut();
        customer.orders.push(order.clone()).unwrap();
        customer.start_tracking(true, flags.compare_on_write).unwrap();
        if !flags.enabled {
            customer.stop_tracking(true).unwrap();
        }
        customer.reset_dirty().unwrap();
    }
    (customer, order)
}
