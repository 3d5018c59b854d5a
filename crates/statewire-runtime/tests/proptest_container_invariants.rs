//! Property-based invariant tests for observable containers.
//!
//! **Container:**
//! 1. After `set(f, v)`, `get(f)` returns `v`.
//! 2. Every `set` invokes each live subscriber exactly once before returning.
//! 3. A child mutation invokes each parent subscriber exactly once.
//! 4. Unsubscribed observers are never invoked again.
//! 5. Nested value-type mutation fires exactly one notification.
//! 6. Version equals the number of delivered notifications.
//!
//! **Forwarding graphs:**
//! 7. In any embedding chain, a leaf mutation reaches every ancestor once.
//! 8. Arbitrary (possibly cyclic) embedding graphs terminate: a mutation
//!    fires every container that can reach the mutated one through embed
//!    edges exactly once, and no other container at all.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use statewire_runtime::{ObservableContainer, Record, Subscription, Value};
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::TRACE)
        .try_init();
}

// ── Strategies ────────────────────────────────────────────────────────────

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["count", "label", "flag", "ratio"]).prop_map(str::to_owned)
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        "[a-z]{0,8}".prop_map(Value::Text),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        Just(Value::Unit),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Set(String, Value),
    NestedSet(i64),
    ChildSet(i64),
    Unsubscribe(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (field_name(), value_strategy()).prop_map(|(f, v)| Op::Set(f, v)),
        any::<i64>().prop_map(Op::NestedSet),
        any::<i64>().prop_map(Op::ChildSet),
        (0usize..4).prop_map(Op::Unsubscribe),
    ]
}

fn counter(container: &ObservableContainer) -> (Rc<Cell<u64>>, Subscription) {
    let count = Rc::new(Cell::new(0u64));
    let count_clone = Rc::clone(&count);
    let sub = container.subscribe(move || count_clone.set(count_clone.get() + 1));
    (count, sub)
}

/// Nodes notified when `start` fires: `start` plus every node embedding an
/// already-notified node.
fn notified_by(size: usize, edges: &[(usize, usize)], start: usize) -> Vec<bool> {
    let mut reached = vec![false; size];
    reached[start] = true;
    let mut changed = true;
    while changed {
        changed = false;
        for &(from, to) in edges {
            if from != to && reached[to] && !reached[from] {
                reached[from] = true;
                changed = true;
            }
        }
    }
    reached
}

// ── Container invariants ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn set_then_get_roundtrips(name in field_name(), value in value_strategy()) {
        let c = ObservableContainer::new();
        c.set(&name, value.clone());
        prop_assert_eq!(c.get(&name), Some(value));
        prop_assert_eq!(c.version(), 1);
    }

    #[test]
    fn op_sequences_notify_exactly_once_per_mutation(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let child = ObservableContainer::with_fields([("count", 0)]);
        let parent = ObservableContainer::builder()
            .field("model", Record::new().with("count", 0))
            .embed("child", &child)
            .build();

        let mut subs: Vec<Option<(Rc<Cell<u64>>, Subscription)>> =
            (0..4).map(|_| Some(counter(&parent))).collect();
        let mut dropped: Vec<(Rc<Cell<u64>>, u64)> = Vec::new();
        let mut expected = 0u64;

        for op in ops {
            match op {
                Op::Set(name, value) => {
                    parent.set(&name, value.clone());
                    prop_assert_eq!(parent.get(&name), Some(value));
                    expected += 1;
                }
                Op::NestedSet(n) => {
                    parent.set_path("model.count", n).unwrap();
                    prop_assert_eq!(parent.get_path("model.count"), Some(Value::Int(n)));
                    expected += 1;
                }
                Op::ChildSet(n) => {
                    child.set("count", n);
                    prop_assert_eq!(parent.get_path("child.count"), Some(Value::Int(n)));
                    expected += 1;
                }
                Op::Unsubscribe(i) => {
                    if let Some((count, sub)) = subs[i].take() {
                        sub.unsubscribe();
                        let frozen = count.get();
                        dropped.push((count, frozen));
                    }
                }
            }
            for (count, _) in subs.iter().flatten() {
                prop_assert_eq!(count.get(), expected);
            }
        }

        for (count, frozen) in &dropped {
            prop_assert_eq!(count.get(), *frozen);
        }
        prop_assert_eq!(parent.version(), expected);
    }

    #[test]
    fn chain_forwards_to_every_ancestor_once(depth in 1usize..12, value in any::<i64>()) {
        let leaf = ObservableContainer::with_fields([("count", 0)]);
        let mut chain = vec![leaf.clone()];
        for _ in 0..depth {
            let parent = ObservableContainer::builder()
                .embed("inner", chain.last().unwrap())
                .build();
            chain.push(parent);
        }
        let counters: Vec<_> = chain.iter().map(counter).collect();

        leaf.set("count", value);
        for (count, _) in &counters {
            prop_assert_eq!(count.get(), 1);
        }
    }

    #[test]
    fn arbitrary_graphs_terminate(
        size in 2usize..8,
        edges in prop::collection::vec((0usize..8, 0usize..8), 0..24),
        start in 0usize..8,
    ) {
        let edges: Vec<(usize, usize)> =
            edges.iter().map(|&(from, to)| (from % size, to % size)).collect();
        let start = start % size;
        let nodes: Vec<ObservableContainer> = (0..size).map(|_| ObservableContainer::new()).collect();
        for (i, &(from, to)) in edges.iter().enumerate() {
            nodes[from].embed(&format!("edge{i}"), &nodes[to]);
        }
        let counters: Vec<_> = nodes.iter().map(counter).collect();

        nodes[start].set("n", 1);
        let reached = notified_by(size, &edges, start);
        for (node, (count, _)) in counters.iter().enumerate() {
            prop_assert_eq!(count.get(), u64::from(reached[node]), "node {}", node);
        }
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────

#[test]
fn embedded_child_scenario() {
    init_tracing();
    let a = ObservableContainer::with_fields([("count", 0)]);
    let b = ObservableContainer::with_fields([("count", 0)]);
    a.embed("b", &b);
    let (observed, _sub) = counter(&a);

    b.set("count", 5);

    assert_eq!(observed.get(), 1);
    assert_eq!(a.get("count"), Some(Value::Int(0)));
    assert_eq!(b.get("count"), Some(Value::Int(5)));
}

#[test]
fn child_observer_write_back_scenario() {
    init_tracing();
    let child = ObservableContainer::with_fields([("count", 0)]);
    let parent = ObservableContainer::builder()
        .field("total", 0)
        .embed("child", &child)
        .build();

    let totals = Rc::new(RefCell::new(Vec::new()));
    let totals_clone = Rc::clone(&totals);
    let reader = parent.clone();
    let _parent_sub = parent.subscribe(move || {
        totals_clone.borrow_mut().push(reader.get_int("total"));
    });
    let writer = parent.clone();
    let source = child.clone();
    let _child_sub = child.subscribe(move || {
        writer.set("total", source.get_int("count").unwrap_or_default() * 10);
    });

    for n in 1..=3 {
        child.set("count", n);
        assert_eq!(totals.borrow().last(), Some(&Some(n * 10)));
    }
    assert_eq!(parent.get_int("total"), Some(30));
    assert_eq!(totals.borrow().len(), 6);
}
