//! Content fingerprints for drift detection.
//!
//! A fingerprint is the hex SHA-256 of an object's canonical JSON form.
//! Object keys are written in sorted order so field order never changes the
//! result, and metadata the API server generates is left out so that the same
//! desired object hashes identically whether or not it has been stored.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Metadata fields excluded from fingerprints.
const VOLATILE_METADATA: &[&str] = &[
    "creationTimestamp",
    "deletionGracePeriodSeconds",
    "deletionTimestamp",
    "generation",
    "managedFields",
    "ownerReferences",
    "resourceVersion",
    "selfLink",
    "uid",
];

/// Object could not be turned into JSON.
#[derive(Debug, Error)]
#[error("cannot serialize object for fingerprinting: {0}")]
pub struct FingerprintError(#[from] serde_json::Error);

/// Computes the fingerprint of `object`.
pub fn fingerprint<T: Serialize>(object: &T) -> Result<String, FingerprintError> {
    let mut value = serde_json::to_value(object)?;
    strip_volatile(&mut value);

    let mut hasher = Sha256::new();
    write_canonical(&value, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn strip_volatile(value: &mut Value) {
    let Value::Object(root) = value else {
        return;
    };
    root.remove("status");
    if let Some(Value::Object(metadata)) = root.get_mut("metadata") {
        for field in VOLATILE_METADATA {
            metadata.remove(*field);
        }
    }
}

fn write_canonical(value: &Value, hasher: &mut Sha256) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            hasher.update(b"{");
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    hasher.update(b",");
                }
                hasher.update(serde_json::to_string(key)?.as_bytes());
                hasher.update(b":");
                write_canonical(item, hasher)?;
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    hasher.update(b",");
                }
                write_canonical(item, hasher)?;
            }
            hasher.update(b"]");
        }
        scalar => hasher.update(serde_json::to_string(scalar)?.as_bytes()),
    }
    Ok(())
}
