//! End-to-end checks of the initialization pipeline against API-server shaped payloads

use lxcfs_initializer::config::InitializerConfig;
use lxcfs_initializer::initializer::{initialize, mutate, Outcome};
use lxcfs_initializer::policy::MutationPolicy;
use lxcfs_initializer::workload::WorkloadObject;
use lxcfs_initializer::{DEFAULT_ANNOTATION, DEFAULT_INITIALIZER_NAME};
use serde_json::{json, Value};

const LXCFS_FILES: [&str; 6] = ["cpuinfo", "meminfo", "diskstats", "stat", "swaps", "uptime"];

/// A Deployment as returned by `GET ...?includeUninitialized=true`
fn deployment(gates: &[&str], annotated: bool) -> WorkloadObject {
    let mut annotations = serde_json::Map::new();
    annotations.insert("team".into(), json!("payments"));
    if annotated {
        annotations.insert(DEFAULT_ANNOTATION.into(), json!("true"));
    }
    let pending: Vec<Value> = gates.iter().map(|g| json!({ "name": g })).collect();

    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": "checkout",
            "namespace": "shop",
            "uid": "6f1d4a2c-0000-4000-8000-000000000001",
            "resourceVersion": "5512",
            "generation": 1,
            "creationTimestamp": "2026-03-01T10:00:00Z",
            "labels": { "app": "checkout" },
            "annotations": annotations,
            "initializers": { "pending": pending }
        },
        "spec": {
            "replicas": 2,
            "selector": { "matchLabels": { "app": "checkout" } },
            "template": {
                "metadata": { "labels": { "app": "checkout" } },
                "spec": {
                    "containers": [
                        {
                            "name": "api",
                            "image": "registry.local/checkout:3.2",
                            "volumeMounts": [{ "name": "config", "mountPath": "/etc/checkout" }]
                        },
                        { "name": "sidecar", "image": "registry.local/proxy:1.0" }
                    ],
                    "volumes": [{ "name": "config", "configMap": { "name": "checkout" } }]
                }
            }
        }
    }))
    .expect("fixture decodes")
}

fn config() -> InitializerConfig {
    InitializerConfig::default()
}

fn apply_patch(workload: &WorkloadObject, outcome: Outcome) -> Value {
    let Outcome::Patch(patch) = outcome else {
        panic!("expected a patch, got {outcome:?}");
    };
    let mut doc = serde_json::to_value(workload).unwrap();
    json_patch::patch(&mut doc, &patch).unwrap();
    doc
}

fn mount_names(container: &Value) -> Vec<String> {
    container["volumeMounts"]
        .as_array()
        .map(|mounts| {
            mounts
                .iter()
                .map(|m| m["name"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn opted_out_deployment_is_only_degated() {
    let workload = deployment(&[DEFAULT_INITIALIZER_NAME, "quota.example.com"], false);

    let Outcome::PassThrough(candidate) = initialize(&workload, &config()).unwrap() else {
        panic!("expected pass-through");
    };

    assert_eq!(candidate.pending_initializers().len(), 1);
    assert_eq!(candidate.pending_initializers()[0].name, "quota.example.com");
    assert_eq!(candidate.spec, workload.spec);
    assert_eq!(candidate.metadata.annotations, workload.metadata.annotations);
    assert_eq!(candidate.metadata.other, workload.metadata.other);
}

#[test]
fn remaining_queue_keeps_its_order() {
    let workload = deployment(
        &[DEFAULT_INITIALIZER_NAME, "b.example.com", "c.example.com"],
        true,
    );
    let doc = apply_patch(&workload, initialize(&workload, &config()).unwrap());

    assert_eq!(
        doc["metadata"]["initializers"]["pending"],
        json!([{ "name": "b.example.com" }, { "name": "c.example.com" }])
    );
}

#[test]
fn last_gate_removes_the_queue() {
    let workload = deployment(&[DEFAULT_INITIALIZER_NAME], true);
    let doc = apply_patch(&workload, initialize(&workload, &config()).unwrap());

    assert!(doc["metadata"].get("initializers").is_none());
}

#[test]
fn other_initializer_at_head_defers() {
    let workload = deployment(&["quota.example.com", DEFAULT_INITIALIZER_NAME], true);

    assert_eq!(
        initialize(&workload, &config()).unwrap(),
        Outcome::Deferred {
            next: "quota.example.com".to_string()
        }
    );
}

#[test]
fn every_container_gets_the_lxcfs_mounts() {
    let workload = deployment(&[DEFAULT_INITIALIZER_NAME], true);
    let doc = apply_patch(&workload, initialize(&workload, &config()).unwrap());
    let pod = &doc["spec"]["template"]["spec"];
    let expected: Vec<String> = LXCFS_FILES
        .iter()
        .map(|f| format!("lxcfs-proc-{f}"))
        .collect();

    let api = mount_names(&pod["containers"][0]);
    assert_eq!(api.len(), 1 + LXCFS_FILES.len());
    assert_eq!(api[0], "config");
    assert_eq!(api[1..], expected[..]);

    let sidecar = mount_names(&pod["containers"][1]);
    assert_eq!(sidecar, expected);

    for (mount, file) in pod["containers"][1]["volumeMounts"]
        .as_array()
        .unwrap()
        .iter()
        .zip(LXCFS_FILES)
    {
        assert_eq!(mount["mountPath"], format!("/proc/{file}"));
    }

    let volumes = pod["volumes"].as_array().unwrap();
    assert_eq!(volumes.len(), 1 + LXCFS_FILES.len());
    assert_eq!(volumes[0]["name"], "config");
    for (volume, file) in volumes[1..].iter().zip(LXCFS_FILES) {
        assert_eq!(volume["name"], format!("lxcfs-proc-{file}"));
        assert_eq!(
            volume["hostPath"]["path"],
            format!("/var/lib/lxcfs/proc/{file}")
        );
    }
}

#[test]
fn annotation_not_required_injects_anyway() {
    let workload = deployment(&[DEFAULT_INITIALIZER_NAME], false);
    let config = InitializerConfig::new(
        DEFAULT_INITIALIZER_NAME,
        DEFAULT_ANNOTATION,
        false,
        MutationPolicy::lxcfs(),
    )
    .unwrap();

    assert!(matches!(
        initialize(&workload, &config).unwrap(),
        Outcome::Patch(_)
    ));
}

#[test]
fn mutation_is_deterministic() {
    let workload = deployment(&[], true);
    let policy = MutationPolicy::lxcfs();

    let mut first = workload.clone();
    mutate::apply(&mut first, &policy);
    let mut second = workload.clone();
    mutate::apply(&mut second, &policy);

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn patch_touches_only_gate_mounts_and_volumes() {
    let workload = deployment(&[DEFAULT_INITIALIZER_NAME, "b.example.com"], true);
    let outcome = initialize(&workload, &config()).unwrap();
    let Outcome::Patch(patch) = &outcome else {
        panic!("expected a patch");
    };

    let ops = serde_json::to_value(patch).unwrap();
    for op in ops.as_array().unwrap() {
        let path = op["path"].as_str().unwrap();
        let allowed = path.starts_with("/metadata/initializers/pending/")
            || (path.starts_with("/spec/template/spec/containers/")
                && path.contains("/volumeMounts"))
            || path.starts_with("/spec/template/spec/volumes");
        assert!(allowed, "unexpected patch path {path}");
        assert_ne!(op["op"], "replace", "unexpected replace at {path}");
    }

    let mut expected = workload.clone();
    lxcfs_initializer::initializer::gate::release(&mut expected);
    mutate::apply(&mut expected, &config().policy);
    assert_eq!(
        apply_patch(&workload, outcome),
        serde_json::to_value(&expected).unwrap()
    );
}
