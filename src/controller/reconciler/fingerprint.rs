//! # Fingerprint
//!
//! Change detection: a spec is dirty when its digest differs from the one
//! recorded at the last successful sync.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the spec's JSON serialization
///
/// Specs keep their maps in `BTreeMap`s so the serialization, and with it
/// the digest, is stable across runs.
pub fn digest<S: Serialize + ?Sized>(spec: &S) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(spec)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// True unless `fingerprint` matches the spec's digest
///
/// A spec that cannot be serialized, or a status without a fingerprint,
/// always counts as changed.
pub fn has_changed<S: Serialize + ?Sized>(spec: &S, fingerprint: Option<&str>) -> bool {
    match (digest(spec), fingerprint) {
        (Ok(current), Some(recorded)) => current != recorded,
        _ => true,
    }
}
