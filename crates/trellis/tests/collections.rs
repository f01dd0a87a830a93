//! Integration tests for observable lists and their derived views.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::Varying;
use trellis::collection::{CattedList, FlattenedList, List, ListEvent, ObservableList};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn expected_flat(outer: &List<List<i32>>) -> Vec<i32> {
    outer.items().iter().flat_map(|inner| inner.items()).collect()
}

#[test]
fn flattened_follows_inner_and_outer_mutations() {
    init_tracing();
    let first = List::from_vec(vec![1, 2]);
    let second = List::from_vec(vec![3]);
    let outer = List::from_vec(vec![first.clone(), second.clone()]);
    let flat = FlattenedList::new(outer.clone());
    assert_eq!(flat.items(), vec![1, 2, 3]);

    second.add(4, Some(0));
    assert_eq!(flat.items(), vec![1, 2, 4, 3]);

    outer.remove_at(0);
    assert_eq!(flat.items(), vec![4, 3]);

    // Detached lists no longer contribute.
    first.push(9);
    assert_eq!(flat.items(), vec![4, 3]);
}

#[test]
fn flattened_matches_concatenation_after_every_step() {
    init_tracing();
    let a = List::from_vec(vec![1]);
    let b = List::<i32>::new();
    let c = List::from_vec(vec![5, 6]);
    let outer = List::from_vec(vec![a.clone(), b.clone()]);
    let flat = FlattenedList::new(outer.clone());

    let steps: Vec<Box<dyn Fn() + '_>> = vec![
        Box::new(|| {
            b.push(2);
        }),
        Box::new(|| {
            outer.add(c.clone(), Some(1));
        }),
        Box::new(|| {
            a.add(0, Some(0));
        }),
        Box::new(|| {
            c.remove_at(1);
        }),
        Box::new(|| {
            outer.remove(&a);
        }),
        Box::new(|| {
            b.clear();
        }),
        Box::new(|| {
            outer.push(a.clone());
        }),
        Box::new(|| {
            outer.clear();
        }),
    ];
    for step in steps {
        step();
        assert_eq!(flat.items(), expected_flat(&outer));
        assert_eq!(flat.len(), flat.items().len());
    }
    assert!(flat.is_empty());
}

#[test]
fn flattened_events_carry_flat_indices() {
    let inner = List::from_vec(vec![10, 20]);
    let outer = List::from_vec(vec![List::from_vec(vec![1]), inner.clone()]);
    let flat = FlattenedList::new(outer);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    flat.on(ListEvent::Added, move |(element, idx)| s.lock().push(("added", *element, *idx)));
    let s = seen.clone();
    flat.on(ListEvent::Removed, move |(element, idx)| s.lock().push(("removed", *element, *idx)));

    inner.add(15, Some(1));
    inner.remove_at(0);
    assert_eq!(*seen.lock(), vec![("added", 15, 2), ("removed", 10, 1)]);
}

#[test]
fn chained_views_stay_consistent() {
    let inner = List::from_vec(vec![1, 2, 3]);
    let outer = List::from_vec(vec![inner.clone()]);
    let labels = FlattenedList::new(outer.clone())
        .filter(|n| n % 2 == 1)
        .map(|n| format!("#{n}"));
    assert_eq!(labels.items(), vec!["#1", "#3"]);

    outer.push(List::from_vec(vec![5, 6]));
    assert_eq!(labels.items(), vec!["#1", "#3", "#5"]);

    inner.remove_at(0);
    assert_eq!(labels.items(), vec!["#3", "#5"]);

    let length = labels.watch_length();
    outer.remove_at(0);
    assert_eq!(length.get(), 1);
}

#[test]
fn dropping_a_chain_releases_every_source_listener() {
    let inner = List::from_vec(vec![1, 2]);
    let outer = List::from_vec(vec![inner.clone()]);
    {
        let chain = FlattenedList::new(outer.clone()).filter(|n| *n > 1).map(|n| n * 10).uniq();
        assert_eq!(chain.items(), vec![20]);
        assert!(outer.events().total_listener_count() > 0);
        assert!(inner.events().total_listener_count() > 0);
    }
    assert_eq!(outer.events().total_listener_count(), 0);
    assert_eq!(inner.events().total_listener_count(), 0);
}

#[test]
fn reactive_predicate_moves_elements_in_and_out() {
    let flags: Vec<Varying<bool>> = (0..3).map(|i| Varying::new(i != 1)).collect();
    let source = List::from_vec(vec![0usize, 1, 2]);
    let lookup = flags.clone();
    let visible = source.filter_varying(move |i: &usize| lookup[*i].clone());
    assert_eq!(visible.items(), vec![0, 2]);

    flags[1].set_value(true);
    assert_eq!(visible.items(), vec![0, 1, 2]);

    flags[0].set_value(false);
    assert_eq!(visible.items(), vec![1, 2]);

    source.remove_at(2);
    flags[2].set_value(false);
    assert_eq!(visible.items(), vec![1]);
}

#[test]
fn catted_lists_concatenate_live() {
    let head = List::from_vec(vec![1]);
    let tail = List::from_vec(vec![3]);
    let catted = CattedList::new([head.clone(), tail.clone()]);

    head.push(2);
    tail.push(4);
    assert_eq!(catted.items(), vec![1, 2, 3, 4]);
    assert_eq!(catted.lists(), vec![head, tail]);
}

#[test]
fn off_stops_delivery() {
    let list = List::new();
    let count = Arc::new(Mutex::new(0));
    let c = count.clone();
    let listener = list.on(ListEvent::Added, move |_| *c.lock() += 1);

    list.push(1);
    assert!(list.off(&listener));
    list.push(2);
    assert_eq!(*count.lock(), 1);
}
