#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::path::PathBuf;

use mmvkit_registry::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
registry:
  name: "myapp"
  flagz: { sentinel: true } # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
registry:
  name: "myapp"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.registry.name, "myapp");
    assert!(cfg.registry.remove_on_stop);
    assert_eq!(cfg.registry.flags.bits(), 0x2);
    assert_eq!(cfg.registry.cluster(), 2846);
    assert_eq!(cfg.publisher.update_interval_ms, 1000);
}

#[test]
fn explicit_placement_and_flags() {
    let ok = r#"
version: 1
registry:
  name: "myapp"
  dir: "/var/tmp/mmv-test"
  cluster_id: 7
  remove_on_stop: false
  flags: { no_prefix: true, process: false, sentinel: true }
publisher:
  update_interval_ms: 250
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.registry.path(), PathBuf::from("/var/tmp/mmv-test/myapp"));
    assert_eq!(cfg.registry.cluster(), 7);
    assert!(!cfg.registry.remove_on_stop);
    assert_eq!(cfg.registry.flags.bits(), 0x1 | 0x4);
    assert_eq!(cfg.publisher.update_interval_ms, 250);
}

#[test]
fn out_of_range_values_are_rejected() {
    let cases = [
        "version: 2\nregistry: { name: myapp }\n",
        "version: 1\nregistry: { name: \"\" }\n",
        "version: 1\nregistry: { name: \"a/b\" }\n",
        "version: 1\nregistry: { name: myapp, cluster_id: 4096 }\n",
        "version: 1\nregistry: { name: myapp }\npublisher: { update_interval_ms: 50 }\n",
        "version: 1\nregistry: { name: myapp }\npublisher: { update_interval_ms: 60001 }\n",
    ];
    for yaml in cases {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.code().as_str(), "CONFIG", "{yaml}");
    }
}

#[test]
fn missing_file_is_a_config_error() {
    let err = config::load_from_file("/nonexistent/mmvkit.yaml").expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}
