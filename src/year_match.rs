// src/year_match.rs
//! Release-year proximity check used to reject mismatched provider hits.

/// Allowed absolute difference between the expected and returned year.
pub const DEFAULT_YEAR_TOLERANCE: u16 = 1;

/// Treat a zero year as "unknown".
pub fn known_year(year: Option<u16>) -> Option<u16> {
    year.filter(|y| *y > 0)
}

/// Returns `true` when `actual` is within `tolerance` years of `expected`.
///
/// Fails open: if either side is missing (or zero) the check is skipped.
pub fn is_year_match(expected: Option<u16>, actual: Option<u16>, tolerance: u16) -> bool {
    match (known_year(expected), known_year(actual)) {
        (Some(e), Some(a)) => e.abs_diff(a) <= tolerance,
        _ => true,
    }
}
