// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! UID generation.

use uuid::Uuid;

/// Root for UUID-derived UIDs (PS3.5 B.2).
const UUID_ROOT: &str = "2.25.";

/// Generate a new globally unique UID.
pub fn generate_uid() -> String {
    format!("{}{}", UUID_ROOT, Uuid::new_v4().as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uids_are_valid() {
        let a = generate_uid();
        let b = generate_uid();
        assert_ne!(a, b);
        assert!(a.starts_with("2.25."));
        assert!(a.len() <= 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }
}
