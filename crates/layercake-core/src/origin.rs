// SPDX-License-Identifier: Apache-2.0
//! Opaque per-instance origin/client identity tokens: generate an opaque
//! token at construction, never reuse across instances.

use layercake_hash::generate_time_id;

const PREFIX: &str = "client_";

/// Generate a fresh origin token. Each call produces a distinct token —
/// callers must not reuse one across `Db`/`Connector` instances.
#[must_use]
pub fn generate_origin() -> String {
    let time_id = generate_time_id();
    let suffix: String = time_id.chars().filter(char::is_ascii_alphanumeric).collect();
    format!("{PREFIX}{suffix}")
}

/// Whether `s` has the shape of an origin token produced by
/// [`generate_origin`]: `client_` followed by one or more alphanumerics.
#[must_use]
pub fn is_valid_origin(s: &str) -> bool {
    s.strip_prefix(PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_origin_is_valid() {
        let origin = generate_origin();
        assert!(is_valid_origin(&origin));
        assert!(origin.starts_with(PREFIX));
    }

    #[test]
    fn two_generated_origins_differ() {
        // time_id's millis component alone could collide within the same
        // millisecond; the random short-id suffix makes collision
        // astronomically unlikely across two calls in a test.
        let a = generate_origin();
        let b = generate_origin();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_missing_prefix_and_empty_suffix() {
        assert!(!is_valid_origin("notaclient_abc123"));
        assert!(!is_valid_origin("client_"));
        assert!(!is_valid_origin("client_ab-cd"));
    }
}
