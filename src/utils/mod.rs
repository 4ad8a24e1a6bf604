use regex::Regex;
use std::sync::LazyLock;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid percent regex"));

/// Parse a percentage string such as `" 42.7%"` into a whole percent.
///
/// The fraction is truncated and the result clamped to 0..=100. Terminal
/// colour codes around the number are tolerated.
pub fn parse_percent(raw: &str) -> Option<u8> {
    let caps = PERCENT.captures(raw)?;
    let value: f64 = caps[1].parse().ok()?;
    Some(clamp_percent(value))
}

/// Whole percent from a byte count, if the total is known.
pub fn percent_of(done: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    Some(clamp_percent(done as f64 * 100.0 / total as f64))
}

fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}
