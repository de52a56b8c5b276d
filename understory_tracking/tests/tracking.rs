// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `understory_tracking` crate.
//!
//! These exercise dirty tracking across a composed customer/order/item graph,
//! including back-references and tracked containers at several levels.

mod common;

use common::{Customer, Item, Order, checkpointed_customer};
use understory_tracking::{
    Inconsistency, Shared, Trackable, TrackableExt, TrackedList, TrackedMap, TrackingError,
    TrackingFlags, TrackingStatus,
};

#[test]
fn dirty_stays_set_until_reset() {
    let (customer, order) = checkpointed_customer(TrackingFlags::COMPARE_ON_WRITE);
    let mut order = order.borrow_mut();

    order.set_note("rush").unwrap();
    assert!(order.status.is_dirty());

    // Writing the same value again, or putting the old one back, does not
    // clean the node.
    order.set_note("rush").unwrap();
    order.set_note("").unwrap();
    assert!(order.status.is_dirty());
    drop(order);

    customer.borrow_mut().reset_dirty().unwrap();
    assert!(!customer.borrow().is_graph_dirty());
}

#[test]
fn child_mutation_is_visible_from_parent() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    order
        .borrow_mut()
        .items
        .get_mut(&1)
        .unwrap()
        .unwrap()
        .set_qty(3)
        .unwrap();

    let order_ref = order.borrow();
    assert!(!order_ref.status.is_dirty());
    assert!(order_ref.is_node_dirty());
    drop(order_ref);

    // The order is a grandchild of the customer: only the graph query sees it.
    let customer = customer.borrow();
    assert!(!customer.is_node_dirty());
    assert!(customer.is_graph_dirty());
}

#[test]
fn compare_on_write_only_marks_real_changes() {
    let (_customer, order) = checkpointed_customer(TrackingFlags::COMPARE_ON_WRITE);
    let mut order = order.borrow_mut();
    let item = order.items.get_mut(&2).unwrap().unwrap();

    assert_eq!(item.set_qty(5).unwrap(), 5);
    assert!(!item.status.is_dirty());
    item.set_qty(6).unwrap();
    assert!(item.status.is_dirty());
}

#[test]
fn write_implies_dirty_marks_every_write() {
    let (customer, _order) = checkpointed_customer(TrackingFlags::WRITE_IMPLIES_DIRTY);
    let mut customer = customer.borrow_mut();
    customer.set_name("ada").unwrap();
    assert!(customer.status.is_dirty());
}

#[test]
fn insert_then_remove_is_net_zero() {
    let (_customer, order) = checkpointed_customer(TrackingFlags::default());
    let mut order = order.borrow_mut();

    order.items.insert(9, Item::new(1)).unwrap();
    order.items.remove(&9).unwrap();
    assert!(order.items.new_entries().is_empty());
    assert!(order.items.removed_entries().is_empty());

    order.items.remove(&1).unwrap();
    assert!(order.items.removed_entries().contains(&1));
    assert!(!order.items.new_entries().contains(&1));
    assert!(!order.items.current_keys([1, 2]).contains(&1));
}

#[test]
fn reset_clears_every_level() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    let extra = Shared::new(Order::new());
    {
        let mut customer = customer.borrow_mut();
        customer.set_name("grace").unwrap();
        customer.orders.push(extra.clone()).unwrap();
    }
    {
        let mut order = order.borrow_mut();
        order.items.insert(3, Item::new(1)).unwrap();
        order.items.remove(&1).unwrap();
        order.set_note("gift").unwrap();
    }
    assert!(extra.borrow().status.is_new());

    customer.borrow_mut().reset_dirty().unwrap();

    let customer = customer.borrow();
    assert!(!customer.status.is_new());
    assert!(!customer.status.is_dirty());
    assert!(customer.orders.new_entries().is_empty());
    assert!(!extra.borrow().status.is_new());

    let order = order.borrow();
    assert!(!order.status.is_dirty());
    assert!(order.items.new_entries().is_empty());
    assert!(order.items.removed_entries().is_empty());
    assert!(!order.items.get(&3).unwrap().status.is_new());
    assert!(!customer.is_graph_dirty());
}

#[test]
fn list_scenario() {
    let mut list = TrackedList::new();
    list.push("a").unwrap();
    list.push("b").unwrap();
    assert_eq!(list.new_entries().len(), 2);
    assert!(list.new_entries().contains(&"a"));
    assert!(list.new_entries().contains(&"b"));
    assert!(list.tracking_status().is_dirty());

    list.reset_dirty().unwrap();
    assert!(list.new_entries().is_empty());
    assert!(!list.tracking_status().is_dirty());

    list.remove_item(&"a").unwrap();
    assert_eq!(list.removed_entries().len(), 1);
    assert!(list.removed_entries().contains(&"a"));
    assert!(list.tracking_status().is_dirty());
    assert_eq!(list.as_slice(), &["b"]);
}

#[test]
fn list_elements_are_edited_through_their_handles() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    let handle = customer.borrow().orders.get(0).cloned().unwrap();
    assert!(handle.ptr_eq(&order));
    handle.borrow_mut().set_note("gift").unwrap();

    let customer = customer.borrow();
    assert!(customer.orders.is_node_dirty());
    assert!(!customer.orders.tracking_status().is_dirty());
    assert!(customer.orders.new_entries().is_empty());
    assert!(customer.is_graph_dirty());
}

#[test]
fn back_references_do_not_loop() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());

    // Walk from the order: it reaches the customer through the back-reference
    // and the customer leads back to the order, which is already visited.
    customer.borrow_mut().set_name("grace").unwrap();
    assert!(order.borrow().is_graph_dirty());

    order.borrow_mut().reset_dirty().unwrap();
    assert!(!order.borrow().is_graph_dirty());
    assert!(!customer.borrow().status.is_dirty());
}

#[test]
fn stop_tracking_cascades_through_shared_nodes() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    customer.borrow_mut().stop_tracking(true).unwrap();

    let mut order = order.borrow_mut();
    assert!(!order.status.is_tracking_enabled());
    order.set_note("quiet").unwrap();
    order.items.insert(4, Item::new(1)).unwrap();
    assert!(!order.is_node_dirty());
    assert!(order.items.new_entries().contains(&4));
    drop(order);

    customer.borrow_mut().start_tracking(true, false).unwrap();
    assert!(!customer.borrow().is_graph_dirty());
}

#[test]
fn attached_subtrees_take_the_parent_flags() {
    let (customer, _order) = checkpointed_customer(TrackingFlags::COMPARE_ON_WRITE);

    let mut detached = Order::new();
    detached.stop_tracking(true).unwrap();
    let detached = Shared::new(detached);
    customer.borrow_mut().orders.push(detached.clone()).unwrap();

    let detached = detached.borrow();
    assert_eq!(detached.status.flags(), TrackingFlags::COMPARE_ON_WRITE);
    assert_eq!(
        detached.items.tracking_status().flags(),
        TrackingFlags::COMPARE_ON_WRITE
    );
}

#[test]
fn disabled_graph_reports_clean() {
    let (customer, order) = checkpointed_customer(TrackingFlags::DISABLED);
    order.borrow_mut().set_note("x").unwrap();
    customer.borrow_mut().orders.pop().unwrap();

    let customer = customer.borrow();
    assert!(!customer.is_node_dirty());
    assert!(!customer.is_graph_dirty());
    assert_eq!(customer.orders.removed_entries().len(), 1);
}

#[test]
fn reset_refuses_a_graph_with_a_node_borrowed_elsewhere() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    order.borrow_mut().set_note("rush").unwrap();
    customer.borrow_mut().set_name("grace").unwrap();

    let held = order.borrow();
    assert_eq!(customer.borrow_mut().reset_dirty(), Err(TrackingError::Borrowed));
    assert!(held.status.is_dirty());
    drop(held);
    assert!(customer.borrow().status.is_dirty());

    customer.borrow_mut().reset_dirty().unwrap();
    assert!(!order.borrow().status.is_dirty());
    assert!(!customer.borrow().is_graph_dirty());
}

#[test]
fn tracking_switch_is_all_or_nothing() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());

    let held = order.borrow();
    assert_eq!(
        customer.borrow_mut().stop_tracking(true),
        Err(TrackingError::Borrowed)
    );
    assert!(held.status.is_tracking_enabled());
    drop(held);
    assert!(customer.borrow().status.is_tracking_enabled());
    assert!(customer.borrow().orders.tracking_status().is_tracking_enabled());
}

#[test]
fn mutably_borrowed_node_keeps_the_graph_dirty() {
    let (customer, order) = checkpointed_customer(TrackingFlags::default());
    let mut held = order.borrow_mut();
    held.set_note("x").unwrap();

    let customer = customer.borrow();
    assert!(customer.is_graph_dirty());
    assert_eq!(customer.try_is_graph_dirty(), Err(TrackingError::Borrowed));
    assert_eq!(customer.check_graph(), Err(TrackingError::Borrowed));

    drop(held);
    assert_eq!(customer.try_is_graph_dirty(), Ok(true));
}

struct Ledger {
    status: TrackingStatus,
    broken: bool,
    entries: TrackedMap<u32, Item>,
}

impl Trackable for Ledger {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        visitor(&self.entries);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        visitor(&mut self.entries);
    }

    fn check_changes(&self) -> Result<(), TrackingError> {
        if self.broken {
            return Err(TrackingError::Inconsistent {
                reason: Inconsistency::NewNotPresent,
            });
        }
        Ok(())
    }
}

#[test]
fn failed_check_leaves_graph_untouched() {
    let mut ledger = Ledger {
        status: TrackingStatus::new(),
        broken: true,
        entries: TrackedMap::new(),
    };
    ledger.entries.insert(1, Item::new(1)).unwrap();

    assert_eq!(
        ledger.reset_dirty(),
        Err(TrackingError::Inconsistent {
            reason: Inconsistency::NewNotPresent
        })
    );
    assert!(ledger.status.is_new());
    assert!(ledger.entries.new_entries().contains(&1));
    assert!(ledger.is_node_dirty());

    ledger.broken = false;
    assert!(ledger.check_graph().is_ok());
    ledger.reset_dirty().unwrap();
    assert!(!ledger.is_graph_dirty());
}

#[test]
fn customer_defaults() {
    let customer = Customer::new("ada");
    assert!(customer.status.is_new());
    assert!(!customer.is_graph_dirty());
    assert_eq!(customer.name, "ada");
}
