use std::sync::LazyLock;

use regex::Regex;

use crate::core::error::TaskError;

/// Matches a day count with an optional unit suffix: "7", "3d", "2 weeks",
/// "1month". Units are normalized to days below; surrounding whitespace and
/// case are handled before matching.
static FREQUENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*(d|day|days|w|week|weeks|m|month|months)?$").expect("frequency pattern is valid")
});

/// Parse a human frequency string into a day count.
///
/// A month is exactly 30 days. That matches what the rest of the system
/// stores and renders; calendar-month arithmetic would silently shift
/// long-standing due dates.
pub fn parse_frequency(text: &str) -> Result<u32, TaskError> {
    let s = text.trim().to_lowercase();
    let bad = || TaskError::BadFrequency(text.trim().to_string());

    let caps = FREQUENCY_RE.captures(&s).ok_or_else(bad)?;
    let n: u32 = caps[1].parse().map_err(|_| bad())?;
    let factor = match caps.get(2).map(|m| m.as_str().chars().next()) {
        None => 1,
        Some(Some('d')) => 1,
        Some(Some('w')) => 7,
        Some(Some('m')) => 30,
        _ => return Err(bad()),
    };
    n.checked_mul(factor).ok_or_else(bad)
}
