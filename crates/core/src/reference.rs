//! Booking reference generation.
//!
//! References look like `BK-LTD1X2Y0K7QF3Z`: the `BK-` prefix, the creation
//! instant in epoch milliseconds as upper-case base 36, and a random
//! base-36 suffix. The suffix keeps two creations in the same millisecond
//! apart; the manager still checks the store and retries, so uniqueness
//! never rests on the suffix alone.

use rand::Rng;

use crate::types::Timestamp;

/// Prefix shared by every booking reference.
pub const REFERENCE_PREFIX: &str = "BK-";

/// Number of random characters appended after the timestamp.
pub const RANDOM_SUFFIX_LENGTH: usize = 6;

/// Default number of generate-and-insert attempts before giving up.
pub const DEFAULT_MAX_REFERENCE_ATTEMPTS: u32 = 5;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh reference for a booking created at `now`.
pub fn generate_reference(now: Timestamp) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..RANDOM_SUFFIX_LENGTH)
        .map(|_| char::from(BASE36_DIGITS[rng.random_range(0..BASE36_DIGITS.len())]))
        .collect();

    format!(
        "{REFERENCE_PREFIX}{}{suffix}",
        to_base36(now.timestamp_millis().unsigned_abs())
    )
}

/// Upper-case base-36 rendering of `value`.
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // Only ASCII digits were pushed.
    String::from_utf8(digits).unwrap_or_default()
}

/// Whether `s` has the `BK-[A-Z0-9]+` shape.
pub fn is_valid_reference(s: &str) -> bool {
    s.strip_prefix(REFERENCE_PREFIX).is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    })
}
