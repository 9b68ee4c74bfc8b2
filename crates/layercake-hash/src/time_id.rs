// SPDX-License-Identifier: Apache-2.0
//! `timeId` generation and validation: `<unix-millis>:<4-char short-id>`.

const SHORT_ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SHORT_ID_LEN: usize = 4;

/// Generate a fresh `timeId` for the given millisecond timestamp.
///
/// The short-id component is a 4-character URL-safe token. Two calls at the
/// same millisecond still sort correctly against each other's neighbors
/// because callers compare the numeric millis prefix first, falling back to
/// the id only as a tiebreaker of last resort.
#[must_use]
pub fn time_id_at(millis: u128, entropy: impl FnMut() -> u8) -> String {
    let mut entropy = entropy;
    let mut short = String::with_capacity(SHORT_ID_LEN);
    for _ in 0..SHORT_ID_LEN {
        let idx = (entropy() as usize) % SHORT_ID_ALPHABET.len();
        short.push(SHORT_ID_ALPHABET[idx] as char);
    }
    format!("{millis}:{short}")
}

/// Generate a fresh `timeId` using the system clock and a simple splitmix64
/// generator seeded from the clock itself.
///
/// This is a reference generator suitable for single-process use (the
/// storage/sync collaborators this core delegates to may swap in their own
/// source of entropy); it is not cryptographically secure and does not need
/// to be.
#[must_use]
pub fn generate_time_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut state = (millis as u64) ^ 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        (z ^ (z >> 31)) as u8
    };
    time_id_at(millis, &mut next)
}

/// Split a `timeId` into its `(millis, short_id)` parts, if well-formed.
#[must_use]
pub fn split_time_id(s: &str) -> Option<(u128, &str)> {
    let (millis_str, short) = s.split_once(':')?;
    if millis_str.is_empty() || !millis_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if short.is_empty() || !short.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let millis = millis_str.parse().ok()?;
    Some((millis, short))
}

/// `isTimeId(s)`: matches `^\d+:[A-Za-z0-9]+$`.
#[must_use]
pub fn is_time_id(s: &str) -> bool {
    split_time_id(s).is_some()
}

/// Compare two `timeId`s by their numeric millis prefix, falling back to a
/// lexicographic comparison of the short-id on ties. Non-`timeId` strings
/// sort after well-formed ones.
#[must_use]
pub fn compare_time_ids(a: &str, b: &str) -> std::cmp::Ordering {
    match (split_time_id(a), split_time_id(b)) {
        (Some((ma, sa)), Some((mb, sb))) => ma.cmp(&mb).then_with(|| sa.cmp(sb)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_time_id_is_recognized() {
        assert!(is_time_id("1700000000000:Ab3Z"));
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(!is_time_id("1700000000000"));
    }

    #[test]
    fn rejects_non_digit_millis() {
        assert!(!is_time_id("abc:Ab3Z"));
    }

    #[test]
    fn rejects_empty_short_id() {
        assert!(!is_time_id("123:"));
    }

    #[test]
    fn compares_numerically_not_lexicographically() {
        // Lexicographic comparison would put "9:" before "10:".
        assert_eq!(
            compare_time_ids("9:aaaa", "10:aaaa"),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn generate_produces_well_formed_ids() {
        let id = generate_time_id();
        assert!(is_time_id(&id));
    }

    #[test]
    fn generate_short_id_has_expected_length() {
        let id = generate_time_id();
        let (_, short) = split_time_id(&id).unwrap();
        assert_eq!(short.len(), SHORT_ID_LEN);
    }
}
