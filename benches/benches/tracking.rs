// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_tracking::{
    Composite, DefaultHook, Field, Freezable, FreezeState, Freezer, Trackable, TrackableExt,
    TrackedList, TrackedMap, TrackingStatus, WalkScratch, write_field,
};

const VALUE: Field = Field::new("value");

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }
}

struct Node {
    status: TrackingStatus,
    freeze: FreezeState,
    value: u32,
    children: TrackedMap<u32, Node>,
}

impl Node {
    fn new(value: u32) -> Self {
        Self {
            status: TrackingStatus::new(),
            freeze: FreezeState::new(),
            value,
            children: TrackedMap::new(),
        }
    }

    fn set_value(&mut self, value: u32) {
        write_field(&DefaultHook, self, &VALUE, |node| &mut node.value, value);
    }
}

impl Trackable for Node {
    fn tracking_status(&self) -> &TrackingStatus {
        &self.status
    }

    fn tracking_status_mut(&mut self) -> &mut TrackingStatus {
        &mut self.status
    }

    fn visit_children(&self, visitor: &mut dyn FnMut(&dyn Trackable)) {
        visitor(&self.children);
    }

    fn visit_children_mut(&mut self, visitor: &mut dyn FnMut(&mut dyn Trackable)) {
        visitor(&mut self.children);
    }
}

impl Freezable for Node {
    fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    fn freeze_state_mut(&mut self) -> &mut FreezeState {
        &mut self.freeze
    }

    fn visit_freezable_mut(&mut self, visitor: &mut dyn FnMut(Field, &mut dyn Freezable)) {
        visitor(Field::new("children"), &mut self.children);
    }
}

impl Composite for Node {
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

/// Builds a complete tree with `fanout` children per node, checkpointed.
fn build_tree(depth: u32, fanout: u32) -> Node {
    fn grow(node: &mut Node, depth: u32, fanout: u32) {
        if depth == 0 {
            return;
        }
        for key in 0..fanout {
            let mut child = Node::new(key);
            grow(&mut child, depth - 1, fanout);
            node.children.insert(key, child).unwrap();
        }
    }

    let mut root = Node::new(0);
    grow(&mut root, depth, fanout);
    root.reset_dirty().unwrap();
    root
}

/// Follows the last child at every level and dirties the leaf.
fn dirty_deepest(node: &mut Node, fanout: u32) {
    if let Ok(Some(child)) = node.children.get_mut(&(fanout - 1)) {
        dirty_deepest(child, fanout);
        return;
    }
    node.set_value(u32::MAX);
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_tracking");
    group.sample_size(50);

    for &(depth, fanout) in &[(4_u32, 4_u32), (6_u32, 4_u32), (3_u32, 16_u32)] {
        group.bench_function(format!("graph_dirty_clean(d={depth},f={fanout})"), |b| {
            let root = build_tree(depth, fanout);
            b.iter(|| black_box(root.is_graph_dirty()));
        });

        group.bench_function(
            format!("graph_dirty_clean_with_scratch(d={depth},f={fanout})"),
            |b| {
                let root = build_tree(depth, fanout);
                let mut scratch = WalkScratch::with_capacity(1024);
                b.iter(|| black_box(root.is_graph_dirty_with(&mut scratch)));
            },
        );

        group.bench_function(format!("dirty_leaf_then_reset(d={depth},f={fanout})"), |b| {
            b.iter_batched(
                || build_tree(depth, fanout),
                |mut root| {
                    dirty_deepest(&mut root, fanout);
                    let dirty = root.is_graph_dirty();
                    root.reset_dirty().unwrap();
                    black_box((dirty, root));
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("freeze_unfreeze(d={depth},f={fanout})"), |b| {
            let mut root = build_tree(depth, fanout);
            let freezer = Freezer::new();
            let mut scratch = WalkScratch::new();
            b.iter(|| {
                let frozen = freezer.freeze_with(&mut root, &mut scratch).unwrap();
                let thawed = freezer.unfreeze_with(&mut root, &mut scratch).unwrap();
                black_box(frozen + thawed);
            });
        });
    }

    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_tracking_containers");
    group.sample_size(50);

    for &ops in &[256_u32, 4_096_u32] {
        group.bench_function(format!("map_churn(ops={ops})"), |b| {
            b.iter_batched(
                || {
                    let map: TrackedMap<u32, u32> = (0..ops).map(|k| (k, k)).collect();
                    (map, Lcg::new(0x7A3C_0000_0000_0001))
                },
                |(mut map, mut rng)| {
                    for _ in 0..ops {
                        let key = rng.next_u32() % (ops * 2);
                        if rng.next_u32() % 2 == 0 {
                            map.insert(key, key).unwrap();
                        } else {
                            map.remove(&key).unwrap();
                        }
                    }
                    black_box(map.new_entries().len() + map.removed_entries().len());
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("list_push_pop(ops={ops})"), |b| {
            b.iter_batched(
                || (TrackedList::<u32>::new(), Lcg::new(0x7A3C_0000_0000_0002)),
                |(mut list, mut rng)| {
                    for _ in 0..ops {
                        if rng.next_u32() % 3 == 0 {
                            list.pop().unwrap();
                        } else {
                            list.push(rng.next_u32() % 512).unwrap();
                        }
                    }
                    let kept = list.not_new_or_removed_entries().count();
                    black_box((kept, list.len()));
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_graph, bench_containers);
criterion_main!(benches);
