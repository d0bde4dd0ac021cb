//! Type compatibility, resolution and unit encoding.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;

use mmvkit_core::{CountUnit, MetricSemantics, MetricType, MetricUnit, SpaceUnit, TimeUnit, Value};

fn sample_values() -> Vec<Value> {
    vec![
        Value::Int32(-7),
        Value::Uint32(7),
        Value::Int64(i64::MIN),
        Value::Uint64(u64::MAX),
        Value::Float(1.5),
        Value::Double(2.5),
        Value::Double(f64::MAX),
        Value::Double(f64::NAN),
        Value::String("up".into()),
        Value::Int(0),
        Value::Int(-1),
        Value::Int(5),
        Value::Int(i32::MAX as isize),
        Value::Int(i32::MIN as isize),
        Value::Int(isize::MAX),
        Value::Int(isize::MIN),
        Value::Uint(0),
        Value::Uint(u32::MAX as usize),
        Value::Uint(usize::MAX),
    ]
}

#[test]
fn fixed_width_values_match_exactly() {
    assert!(MetricType::Int32.is_compatible(&Value::Int32(1)));
    assert!(!MetricType::Int64.is_compatible(&Value::Int32(1)));
    assert!(MetricType::Uint64.is_compatible(&Value::Uint64(1)));
    assert!(!MetricType::Uint32.is_compatible(&Value::Uint64(1)));
    assert!(MetricType::Float.is_compatible(&Value::Float(1.0)));
    assert!(!MetricType::Double.is_compatible(&Value::Float(1.0)));
    assert!(MetricType::String.is_compatible(&Value::from("x")));
    assert!(!MetricType::Int32.is_compatible(&Value::from("x")));
}

#[test]
fn machine_word_integers_are_range_checked() {
    let small = Value::Int(5);
    assert!(MetricType::Int32.is_compatible(&small));
    assert!(MetricType::Int64.is_compatible(&small));
    assert!(MetricType::Uint32.is_compatible(&small));
    assert!(MetricType::Uint64.is_compatible(&small));
    assert!(!MetricType::Float.is_compatible(&small));
    assert!(!MetricType::String.is_compatible(&small));

    let negative = Value::Int(-1);
    assert!(MetricType::Int32.is_compatible(&negative));
    assert!(!MetricType::Uint32.is_compatible(&negative));
    assert!(!MetricType::Uint64.is_compatible(&negative));

    let in_u32 = Value::Uint(u32::MAX as usize);
    assert!(MetricType::Uint32.is_compatible(&in_u32));
    assert!(MetricType::Uint64.is_compatible(&in_u32));
    assert!(!MetricType::Int64.is_compatible(&in_u32));
}

#[cfg(target_pointer_width = "64")]
#[test]
fn wide_machine_words_need_64_bit_targets() {
    let big = Value::Uint(u32::MAX as usize + 1);
    assert!(!MetricType::Uint32.is_compatible(&big));
    assert!(MetricType::Uint64.is_compatible(&big));

    let big_int = Value::Int(i32::MAX as isize + 1);
    assert!(!MetricType::Int32.is_compatible(&big_int));
    assert!(MetricType::Int64.is_compatible(&big_int));
    assert!(MetricType::Uint32.is_compatible(&big_int));
}

#[test]
fn doubles_fit_float_only_in_range() {
    assert!(MetricType::Float.is_compatible(&Value::Double(3.25)));
    assert!(MetricType::Double.is_compatible(&Value::Double(3.25)));
    assert!(!MetricType::Float.is_compatible(&Value::Double(f64::MAX)));
    assert!(MetricType::Double.is_compatible(&Value::Double(f64::MAX)));
}

#[test]
fn resolve_narrows_to_exact_width() {
    assert_eq!(MetricType::Int32.resolve(Value::Int(5)), Value::Int32(5));
    assert_eq!(MetricType::Int64.resolve(Value::Int(5)), Value::Int64(5));
    assert_eq!(MetricType::Uint32.resolve(Value::Int(5)), Value::Uint32(5));
    assert_eq!(MetricType::Uint64.resolve(Value::Uint(5)), Value::Uint64(5));
    assert_eq!(MetricType::Uint32.resolve(Value::Uint(5)), Value::Uint32(5));
    assert_eq!(MetricType::Float.resolve(Value::Double(0.5)), Value::Float(0.5));
    assert_eq!(MetricType::Double.resolve(Value::Double(0.5)), Value::Double(0.5));
}

#[test]
fn resolve_is_idempotent_and_preserves_compatibility() {
    for ty in MetricType::ALL {
        for v in sample_values() {
            let once = ty.resolve(v.clone());
            let twice = ty.resolve(once.clone());
            // NaN never equals itself; compare the encoding instead
            assert_eq!(format!("{once:?}"), format!("{twice:?}"), "ty={ty} v={v}");
            assert_eq!(
                ty.is_compatible(&v),
                ty.is_compatible(&once),
                "ty={ty} v={v} resolved={once}"
            );
            if ty.is_compatible(&v) {
                assert_eq!(once.exact_type(), Some(ty), "ty={ty} v={v}");
            }
        }
    }
}

#[test]
fn type_and_semantics_codes_round_trip() {
    for ty in MetricType::ALL {
        assert_eq!(MetricType::from_code(ty.code()), Some(ty));
    }
    assert_eq!(MetricType::String.code(), 6);
    assert_eq!(MetricSemantics::Counter.code(), 1);
    assert_eq!(MetricSemantics::Instant.code(), 3);
    assert_eq!(MetricSemantics::from_code(2), None);
}

#[test]
fn unit_encodings_match_pmunits_layout() {
    assert_eq!(SpaceUnit::Byte.pmapi(), 0x1000_0000);
    assert_eq!(SpaceUnit::Kilobyte.pmapi(), 0x1001_0000);
    assert_eq!(SpaceUnit::Exabyte.pmapi(), 0x1006_0000);
    assert_eq!(TimeUnit::Nanosecond.pmapi(), 0x0100_0000);
    assert_eq!(TimeUnit::Second.pmapi(), 0x0100_3000);
    assert_eq!(TimeUnit::Hour.pmapi(), 0x0100_5000);
    assert_eq!(CountUnit::One.pmapi(), 0x0010_0000);
}

#[test]
fn unit_families_never_collide() {
    let all: Vec<MetricUnit> = SpaceUnit::ALL
        .into_iter()
        .map(MetricUnit::from)
        .chain(TimeUnit::ALL.into_iter().map(MetricUnit::from))
        .chain([MetricUnit::from(CountUnit::One)])
        .collect();

    let codes: HashSet<u32> = all.iter().map(|u| u.pmapi()).collect();
    assert_eq!(codes.len(), all.len());

    for u in &all {
        assert_eq!(MetricUnit::from_pmapi(u.pmapi()), Some(*u));
    }
}
