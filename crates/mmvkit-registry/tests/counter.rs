#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use mmvkit_core::{CountUnit, MetricSemantics, MetricType, MetricUnit};
use mmvkit_registry::{Counter, Metric, Registry};

#[test]
fn counter_is_a_preconfigured_singleton() {
    let c = Counter::new(0, "requests", &["served requests"]).unwrap();
    assert_eq!(c.metric_type(), MetricType::Int64);
    assert_eq!(c.semantics(), MetricSemantics::Counter);
    assert_eq!(c.unit(), MetricUnit::Count(CountUnit::One));
    assert_eq!(c.val(), 0);
}

#[test]
fn inc_dec_up_down() {
    let c = Counter::new(5, "requests", &[]).unwrap();
    c.inc(10).unwrap();
    assert_eq!(c.val(), 15);
    c.dec(3).unwrap();
    assert_eq!(c.val(), 12);
    c.up();
    c.up();
    c.down();
    assert_eq!(c.val(), 13);
    c.must_inc(7);
    c.must_dec(20);
    assert_eq!(c.val(), 0);
    c.set(42).unwrap();
    assert_eq!(c.val(), 42);
}

#[test]
fn concurrent_ups_are_not_lost() {
    let c = Arc::new(Counter::new(0, "requests", &[]).unwrap());
    let workers: Vec<_> = (0..10)
        .map(|_| {
            let c = Arc::clone(&c);
            thread::spawn(move || c.up())
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(c.val(), 10);
}

#[test]
fn concurrent_ups_on_a_live_counter() {
    let reg = Registry::in_memory("counters").unwrap();
    let c = reg.new_counter(0, "requests", &[]).unwrap();
    reg.start().unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for _ in 0..250 {
                    c.up();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(c.val(), 2000);

    let snap = mmvkit_core::protocol::Snapshot::decode(&reg.region_bytes().unwrap()).unwrap();
    assert_eq!(
        snap.value("requests", None),
        Some(&mmvkit_core::Value::Int64(2000))
    );
}
