//! Integration tests for wiring varyings to event buses.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{EventBus, KeyPath, Varying, VaryingEvent};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Channel {
    Changed(KeyPath),
    AnyChanged,
}

#[test]
fn watched_cell_follows_keyed_channel() {
    let bus = EventBus::<Channel, i64>::new();
    let cell = Varying::new(0i64);
    let weak = cell.downgrade();
    cell.listen_to(&bus, Channel::Changed(KeyPath::from_segments(["a"])), move |v: &i64| {
        if let Some(cell) = weak.upgrade() {
            cell.set_value(*v);
        }
    });

    bus.emit(&Channel::Changed(KeyPath::from_segments(["b"])), 1);
    assert_eq!(cell.get(), 0);
    bus.emit(&Channel::Changed(KeyPath::from_segments(["a"])), 2);
    assert_eq!(cell.get(), 2);
}

#[test]
fn dropping_cell_removes_bus_listeners() {
    let bus = EventBus::<Channel, i64>::new();
    {
        let cell = Varying::new(0i64);
        cell.listen_to(&bus, Channel::AnyChanged, |_: &i64| {});
        assert_eq!(bus.listener_count(&Channel::AnyChanged), 1);
    }
    assert_eq!(bus.listener_count(&Channel::AnyChanged), 0);
}

#[test]
fn cell_listening_to_cell_can_be_detached() {
    let upstream = Varying::new(false);
    let downstream = Varying::new(0u32);
    let weak = downstream.downgrade();
    downstream.listen_to(&upstream, VaryingEvent::Changed, move |_: &bool| {
        if let Some(d) = weak.upgrade() {
            let next = d.get() + 1;
            d.set_value(next);
        }
    });

    upstream.set_value(true);
    upstream.set_value(false);
    assert_eq!(downstream.get(), 2);

    assert_eq!(downstream.unlisten_to(&upstream), 1);
    upstream.set_value(true);
    assert_eq!(downstream.get(), 2);
}

#[test]
fn reentrant_propagation_is_depth_first() {
    let a = Varying::new(0);
    let b = a.map(|n| n * 10);
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = log.clone();
    let a2 = a.clone();
    a.react(move |n| {
        l.lock().push(format!("a={n}"));
        if *n == 1 {
            a2.set_value(2);
        }
    });
    let l = log.clone();
    b.react(move |n| l.lock().push(format!("b={n}")));

    a.set_value(1);

    // b subscribed to a first (via map), so it sees 1 before the nested set.
    assert_eq!(b.get(), 20);
    assert_eq!(
        *log.lock(),
        vec!["b=10", "a=1", "b=20", "a=2"]
    );
}
