// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Peppered identifier hashing.

use sha2::{Digest, Sha256};

/// SHA-256 of `value` followed by `pepper`, as lowercase hex.
pub fn peppered_sha256(value: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.update(pepper.as_bytes());
    hex::encode(hasher.finalize())
}

/// Pseudonymise a patient identifier for API responses.
///
/// Empty identifiers stay empty so callers can tell "no patient" apart from
/// a real pseudonym.
pub fn hash_patient_id(patient_id: &str, pepper: &str) -> String {
    if patient_id.is_empty() {
        return String::new();
    }
    peppered_sha256(patient_id, pepper)
}
