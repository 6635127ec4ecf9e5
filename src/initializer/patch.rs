//! Minimal patch synthesis
//!
//! Serializes the original and candidate objects and emits an RFC 6902 JSON Patch naming
//! only the fields that changed. Arrays are diffed around their common prefix and suffix,
//! so removing the head of the initializer queue becomes a single `remove` and appended
//! mounts become `add` operations at the `-` index.

use json_patch::{
    AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation, TestOperation,
};
use jsonptr::PointerBuf;
use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// Compute the patch that turns `original` into `candidate`
pub fn synthesize<T: Serialize>(original: &T, candidate: &T) -> Result<Patch> {
    let before = serde_json::to_value(original)?;
    let after = serde_json::to_value(candidate)?;

    let mut ops = Vec::new();
    diff(&mut Vec::new(), &before, &after, &mut ops);
    Ok(Patch(ops))
}

/// Prefix `patch` with a `test` on `/metadata/resourceVersion`
///
/// The API server then rejects the patch if the object changed since it was observed,
/// instead of applying index-based operations to a different array.
pub fn guard_resource_version(patch: Patch, resource_version: Option<&str>) -> Patch {
    let Some(version) = resource_version else {
        return patch;
    };

    let mut ops = Vec::with_capacity(patch.0.len() + 1);
    ops.push(PatchOperation::Test(TestOperation {
        path: PointerBuf::from_tokens(["metadata", "resourceVersion"]),
        value: Value::String(version.to_string()),
    }));
    ops.extend(patch.0);
    Patch(ops)
}

fn pointer(path: &[String]) -> PointerBuf {
    PointerBuf::from_tokens(path.iter().map(String::as_str))
}

fn diff(path: &mut Vec<String>, before: &Value, after: &Value, ops: &mut Vec<PatchOperation>) {
    if before == after {
        return;
    }

    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for key in old.keys().filter(|k| !new.contains_key(*k)) {
                path.push(key.clone());
                ops.push(PatchOperation::Remove(RemoveOperation {
                    path: pointer(path),
                }));
                path.pop();
            }
            for (key, value) in new {
                path.push(key.clone());
                match old.get(key) {
                    Some(prev) => diff(path, prev, value, ops),
                    None => ops.push(PatchOperation::Add(AddOperation {
                        path: pointer(path),
                        value: value.clone(),
                    })),
                }
                path.pop();
            }
        }
        (Value::Array(old), Value::Array(new)) => diff_array(path, old, new, ops),
        _ => ops.push(PatchOperation::Replace(ReplaceOperation {
            path: pointer(path),
            value: after.clone(),
        })),
    }
}

fn diff_array(path: &mut Vec<String>, old: &[Value], new: &[Value], ops: &mut Vec<PatchOperation>) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    if old_mid.len() == new_mid.len() {
        for (offset, (a, b)) in old_mid.iter().zip(new_mid).enumerate() {
            path.push((prefix + offset).to_string());
            diff(path, a, b, ops);
            path.pop();
        }
        return;
    }

    // each removal shifts the next element into `prefix`
    path.push(prefix.to_string());
    for _ in old_mid {
        ops.push(PatchOperation::Remove(RemoveOperation {
            path: pointer(path),
        }));
    }
    path.pop();

    for (offset, value) in new_mid.iter().enumerate() {
        let index = if suffix == 0 {
            "-".to_string()
        } else {
            (prefix + offset).to_string()
        };
        path.push(index);
        ops.push(PatchOperation::Add(AddOperation {
            path: pointer(path),
            value: value.clone(),
        }));
        path.pop();
    }
}
