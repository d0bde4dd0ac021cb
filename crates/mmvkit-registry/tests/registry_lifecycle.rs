//! Start/stop, layout and write-through, read back with the core decoder.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use mmvkit_core::protocol::{Poller, Snapshot, TocKind, GEN1_OFFSET};
use mmvkit_core::{hash, CountUnit, MetricSemantics, MetricType, MmvError, SpaceUnit, Value};
use mmvkit_registry::config::RegistrySection;
use mmvkit_registry::region::read_file;
use mmvkit_registry::{InstanceDomain, InstanceMetric, Instances, Registry, SingletonMetric};

struct Fixture {
    reg: Registry,
    disk: Arc<InstanceDomain>,
    bytes: Arc<InstanceMetric>,
    state: Arc<SingletonMetric>,
}

/// One domain with two instances, an instance metric over it, and a string
/// singleton with a short help text.
fn fixture(reg: Registry) -> Fixture {
    let disk = reg.new_instance_domain("disk", "", "").unwrap();
    disk.add_instance("sda").unwrap();
    disk.add_instance("sdb").unwrap();

    let mut values = Instances::new();
    values.insert("sda".into(), Value::Uint64(10));
    values.insert("sdb".into(), Value::Uint64(20));
    let bytes = reg
        .new_instance_metric(
            values,
            "disk.bytes",
            &disk,
            MetricType::Uint64,
            MetricSemantics::Counter,
            SpaceUnit::Byte,
            &[],
        )
        .unwrap();

    let state = reg
        .new_singleton_metric(
            "starting",
            "state",
            MetricType::String,
            MetricSemantics::Discrete,
            CountUnit::One,
            &["current state"],
        )
        .unwrap();

    Fixture {
        reg,
        disk,
        bytes,
        state,
    }
}

fn snapshot(reg: &Registry) -> Snapshot {
    Snapshot::decode(&reg.region_bytes().expect("live")).unwrap()
}

#[test]
fn layout_of_a_started_registry() {
    let f = fixture(Registry::in_memory("layout").unwrap());
    assert_eq!(f.reg.value_count(), 3);
    f.reg.start().unwrap();

    let bytes = f.reg.region_bytes().unwrap();
    // header + 5 toc + 1 indom + 2 instances + 2 metrics + 3 values + 2 strings
    assert_eq!(bytes.len(), 40 + 5 * 16 + 32 + 2 * 80 + 2 * 104 + 3 * 32 + 2 * 256);

    let snap = Snapshot::decode(&bytes).unwrap();
    assert_eq!(snap.header.gen1, snap.header.gen2);
    assert_eq!(Some(snap.generation()), f.reg.generation());
    assert_eq!(snap.header.pid, std::process::id() as i32);
    assert_eq!(snap.header.flags, 0x2);
    assert_eq!(snap.header.cluster, hash("layout", 12));

    let kinds: Vec<_> = snap.toc.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TocKind::Indoms,
            TocKind::Instances,
            TocKind::Metrics,
            TocKind::Values,
            TocKind::Strings
        ]
    );

    assert_eq!(snap.indoms.len(), 1);
    assert_eq!(snap.indoms[0].id, f.disk.id());
    let names: Vec<_> = snap.indoms[0].instances.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["sda", "sdb"]);

    let bytes_view = snap.metric("disk.bytes").unwrap();
    assert_eq!(bytes_view.id, hash("disk.bytes", 10));
    assert_eq!(bytes_view.indom, Some(f.disk.id()));
    assert_eq!(bytes_view.unit, SpaceUnit::Byte.pmapi());

    let state_view = snap.metric("state").unwrap();
    assert_eq!(state_view.indom, None);
    assert_eq!(state_view.short_help.as_deref(), Some("current state"));

    assert_eq!(snap.value("disk.bytes", Some("sda")), Some(&Value::Uint64(10)));
    assert_eq!(snap.value("disk.bytes", Some("sdb")), Some(&Value::Uint64(20)));
    assert_eq!(snap.value("state", None), Some(&Value::from("starting")));
}

#[test]
fn metric_only_region_has_two_sections() {
    let reg = Registry::in_memory("plain").unwrap();
    reg.new_singleton_metric(
        42u64,
        "requests",
        MetricType::Uint64,
        MetricSemantics::Counter,
        CountUnit::One,
        &[],
    )
    .unwrap();
    reg.start().unwrap();

    let bytes = reg.region_bytes().unwrap();
    assert_eq!(bytes.len(), 40 + 2 * 16 + 104 + 32);
    let snap = Snapshot::decode(&bytes).unwrap();
    assert_eq!(snap.header.toc_count, 2);
    assert_eq!(snap.value("requests", None), Some(&Value::Uint64(42)));
}

#[test]
fn updates_write_through_without_a_new_generation() {
    let f = fixture(Registry::in_memory("updates").unwrap());
    f.reg.start().unwrap();
    let before = snapshot(&f.reg).generation();

    f.bytes.set_instance("sdb", 25u64).unwrap();
    f.state.set("ready").unwrap();

    let snap = snapshot(&f.reg);
    assert_eq!(snap.generation(), before);
    assert_eq!(snap.value("disk.bytes", Some("sdb")), Some(&Value::Uint64(25)));
    assert_eq!(snap.value("disk.bytes", Some("sda")), Some(&Value::Uint64(10)));
    assert_eq!(snap.value("state", None), Some(&Value::from("ready")));

    // a long string is refused and the previous one stays published
    let err = f.state.set("x".repeat(300)).expect_err("too long");
    assert_eq!(err.code().as_str(), "STRING_TOO_LONG");
    assert_eq!(f.state.get(), Value::from("ready"));
    assert_eq!(snapshot(&f.reg).value("state", None), Some(&Value::from("ready")));
}

#[test]
fn structural_changes_after_start_are_refused() {
    let f = fixture(Registry::in_memory("frozen").unwrap());
    f.reg.start().unwrap();

    let err = f.reg.start().expect_err("twice");
    assert!(matches!(err, MmvError::AlreadyStarted));

    let err = f
        .reg
        .new_counter(0, "requests", &[])
        .expect_err("registration after start");
    assert_eq!(err.code().as_str(), "ALREADY_STARTED");
    assert_eq!(f.reg.metric_count(), 2);
}

#[test]
fn colliding_metric_ids_are_rejected() {
    assert_eq!(hash("metric.3", 10), hash("metric.6", 10));

    let reg = Registry::in_memory("collide").unwrap();
    reg.new_counter(0, "metric.3", &[]).unwrap();
    let err = reg.new_counter(0, "metric.6", &[]).expect_err("collision");
    match err {
        MmvError::IdCollision { name, existing, id } => {
            assert_eq!(name, "metric.6");
            assert_eq!(existing, "metric.3");
            assert_eq!(id, 266);
        }
        other => panic!("unexpected error: {other}"),
    }

    // the same container twice is fine
    let c = reg.new_counter(0, "requests", &[]).unwrap();
    reg.register(&c).unwrap();
    assert_eq!(reg.metric_count(), 2);
}

#[test]
fn restart_bumps_generation_and_readers_notice() {
    let f = fixture(Registry::in_memory("restart").unwrap());
    f.reg.start().unwrap();

    let mut poller = Poller::new();
    let first = poller.poll(&f.reg.region_bytes().unwrap()).unwrap();

    f.reg.stop().unwrap();
    assert!(!f.reg.is_started());
    assert!(f.reg.region_bytes().is_none());

    // accepting again: the domain can grow before the rebuild
    f.disk.add_instance("sdc").unwrap();
    f.reg.start().unwrap();

    let bytes = f.reg.region_bytes().unwrap();
    let err = poller.poll(&bytes).expect_err("rebuilt");
    match err {
        MmvError::Regenerated { previous, current } => {
            assert_eq!(previous, first.generation());
            assert!(current > previous);
        }
        other => panic!("unexpected error: {other}"),
    }
    let snap = poller.poll(&bytes).unwrap();
    assert_eq!(snap.indoms[0].instances.len(), 3);
    // the metric was built before sdc existed and carries no value for it
    assert_eq!(snap.value("disk.bytes", Some("sdc")), None);

    f.reg.restart().unwrap();
    assert!(f.reg.generation().unwrap() > snap.generation());
}

#[test]
fn mid_build_copy_is_rejected() {
    let f = fixture(Registry::in_memory("midbuild").unwrap());
    f.reg.start().unwrap();

    let mut bytes = f.reg.region_bytes().unwrap();
    let generation = f.reg.generation().unwrap();
    bytes[GEN1_OFFSET..GEN1_OFFSET + 8].copy_from_slice(&(generation + 1).to_le_bytes());

    let err = Snapshot::decode(&bytes).expect_err("inconsistent");
    assert!(err.is_retryable());
    assert_eq!(err.code().as_str(), "INCONSISTENT");
}

#[test]
fn oversized_values_fail_the_build() {
    let reg = Registry::in_memory("oversized").unwrap();
    let label = reg
        .new_singleton_metric(
            "y".repeat(256),
            "label",
            MetricType::String,
            MetricSemantics::Discrete,
            CountUnit::One,
            &[],
        )
        .unwrap();

    let err = reg.start().expect_err("string does not fit");
    assert_eq!(err.code().as_str(), "REGION_BUILD");
    assert!(!reg.is_started());
    assert!(!label.is_attached());

    label.set("fits").unwrap();
    reg.start().unwrap();
    assert_eq!(snapshot(&reg).value("label", None), Some(&Value::from("fits")));
}

#[test]
fn oversized_help_fails_the_build() {
    let reg = Registry::in_memory("help").unwrap();
    let long = "h".repeat(256);
    reg.new_singleton_metric(
        1i32,
        "hits",
        MetricType::Int32,
        MetricSemantics::Counter,
        CountUnit::One,
        &[long.as_str()],
    )
    .unwrap();
    let err = reg.start().expect_err("help does not fit");
    assert_eq!(err.code().as_str(), "REGION_BUILD");
}

#[test]
fn file_backed_region_is_published_and_withdrawn() {
    let dir = tempfile::tempdir().unwrap();
    let mut section = RegistrySection::new("filed");
    section.dir = Some(dir.path().to_path_buf());
    section.cluster_id = Some(9);

    let f = fixture(Registry::new(section).unwrap());
    let path = f.reg.path().unwrap();
    assert_eq!(path, dir.path().join("filed"));
    assert!(!path.exists());

    f.reg.start().unwrap();
    assert!(path.exists());

    f.state.set("ready").unwrap();
    let snap = Snapshot::decode(&read_file(&path).unwrap()).unwrap();
    assert_eq!(snap.header.cluster, 9);
    assert_eq!(snap.value("state", None), Some(&Value::from("ready")));

    f.reg.stop().unwrap();
    assert!(!path.exists());
}

#[test]
fn kept_region_survives_stop_and_drop_stops() {
    let dir = tempfile::tempdir().unwrap();
    let mut section = RegistrySection::new("kept");
    section.dir = Some(dir.path().to_path_buf());
    section.remove_on_stop = false;

    let reg = Registry::new(section.clone()).unwrap();
    reg.new_counter(3, "requests", &[]).unwrap();
    reg.start().unwrap();
    reg.stop().unwrap();

    let path = section.path();
    let snap = Snapshot::decode(&read_file(&path).unwrap()).unwrap();
    assert_eq!(snap.value("requests", None), Some(&Value::Int64(3)));

    let mut section = RegistrySection::new("dropped");
    section.dir = Some(dir.path().to_path_buf());
    let path = section.path();
    {
        let reg = Registry::new(section).unwrap();
        reg.new_counter(0, "requests", &[]).unwrap();
        reg.start().unwrap();
        assert!(path.exists());
    }
    assert!(!path.exists());
}

fn kept_section(dir: &std::path::Path, name: &str) -> RegistrySection {
    let mut section = RegistrySection::new(name);
    section.dir = Some(dir.to_path_buf());
    section.remove_on_stop = false;
    section
}

#[test]
fn readers_of_a_kept_file_survive_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let section = kept_section(dir.path(), "busy");
    let path = section.path();

    let reg = Registry::new(section).unwrap();
    let requests = reg.new_counter(0, "requests", &[]).unwrap();
    reg.start().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        let path = path.clone();
        thread::spawn(move || {
            let (mut accepted, mut retried) = (0u32, 0u32);
            while !done.load(Ordering::Relaxed) {
                match read_file(&path).and_then(|b| Snapshot::decode(&b)) {
                    Ok(snap) => {
                        assert!(snap.value("requests", None).is_some());
                        accepted += 1;
                    }
                    Err(e) if e.is_retryable() => retried += 1,
                    Err(e) => panic!("reader saw a broken region: {e}"),
                }
            }
            (accepted, retried)
        })
    };

    for _ in 0..200 {
        requests.up();
        reg.restart().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    let (accepted, _) = reader.join().unwrap();
    assert!(accepted > 0);

    let snap = Snapshot::decode(&read_file(&path).unwrap()).unwrap();
    assert_eq!(snap.value("requests", None), Some(&Value::Int64(200)));

    reg.stop().unwrap();
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n != "busy")
        .collect();
    assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
}

#[test]
fn restart_replaces_the_file_and_old_mappings_keep_their_generation() {
    let dir = tempfile::tempdir().unwrap();
    let section = kept_section(dir.path(), "swap");
    let path = section.path();

    let reg = Registry::new(section).unwrap();
    let requests = reg.new_counter(1, "requests", &[]).unwrap();
    reg.start().unwrap();
    let first = reg.generation().unwrap();

    let old_file = std::fs::File::open(&path).unwrap();
    let old_map = unsafe { memmap2::Mmap::map(&old_file) }.unwrap();

    reg.restart().unwrap();
    requests.set(2).unwrap();

    let old = Snapshot::decode(&old_map).unwrap();
    assert_eq!(old.generation(), first);
    assert_eq!(old.value("requests", None), Some(&Value::Int64(1)));

    let new = Snapshot::decode(&read_file(&path).unwrap()).unwrap();
    assert!(new.generation() > first);
    assert_eq!(new.value("requests", None), Some(&Value::Int64(2)));
}

#[test]
fn setters_on_different_metrics_write_through_concurrently() {
    let reg = Registry::in_memory("parallel").unwrap();
    let gauges: Vec<Arc<SingletonMetric>> = (0..8)
        .map(|i| {
            reg.new_singleton_metric(
                0u64,
                &format!("worker{i}.done"),
                MetricType::Uint64,
                MetricSemantics::Instant,
                CountUnit::One,
                &[],
            )
            .unwrap()
        })
        .collect();
    reg.start().unwrap();

    let workers: Vec<_> = gauges
        .iter()
        .map(|g| {
            let g = Arc::clone(g);
            thread::spawn(move || {
                for n in 1..=1000u64 {
                    g.set(n).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let snap = snapshot(&reg);
    for i in 0..8 {
        let name = format!("worker{i}.done");
        assert_eq!(snap.value(&name, None), Some(&Value::Uint64(1000)));
    }
}
