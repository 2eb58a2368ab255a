//! Naming grammar for per-method denoised keys in a `/fetch_data` response.
//!
//! ```text
//! key        := method "_" rest
//! rest       := <any text, the whole key contains "denoised_">
//! value key  := key ending in "_close"
//! time key   := key ending in "_time"
//! ```
//!
//! A value key `P_close` pairs with the time key `P_time`. Keys that satisfy
//! the method prefix and `denoised_` rule but end in neither suffix are not
//! part of the grammar.

const DENOISED_MARKER: &str = "denoised_";
const VALUE_SUFFIX: &str = "_close";
const TIME_SUFFIX: &str = "_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Time,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch<'a> {
    pub method: &'a str,
    pub role: KeyRole,
}

/// Matches `key` against the known method names. When several names match
/// (one a prefix of another up to `_`), the longest wins.
pub fn classify<'a>(key: &str, methods: &'a [String]) -> Option<KeyMatch<'a>> {
    if !key.contains(DENOISED_MARKER) {
        return None;
    }
    let method = methods
        .iter()
        .filter(|m| {
            key.strip_prefix(m.as_str())
                .is_some_and(|rest| rest.starts_with('_'))
        })
        .max_by_key(|m| m.len())?;

    let role = if key.ends_with(VALUE_SUFFIX) {
        KeyRole::Value
    } else if key.ends_with(TIME_SUFFIX) {
        KeyRole::Time
    } else {
        return None;
    };

    Some(KeyMatch { method: method.as_str(), role })
}

/// `kalman_denoised_close` -> `kalman_denoised_time`.
pub fn companion_time_key(value_key: &str) -> Option<String> {
    value_key
        .strip_suffix(VALUE_SUFFIX)
        .map(|prefix| format!("{}{}", prefix, TIME_SUFFIX))
}
