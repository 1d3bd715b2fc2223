//! Run parameters
//!
//! Resolved once from a query string such as `count=30000&size=1.2&speed=1.0`.
//! Missing or unusable values fall back to their defaults; nothing here fails.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const DEFAULT_COUNT: u32 = 20_000;
pub const DEFAULT_SIZE: f32 = 1.0;
pub const DEFAULT_SPEED: f32 = 1.0;

/// Instances past this index are never perturbed per frame.
pub const ANIMATED_SUBSET_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressParameters {
    /// Instance population size.
    pub count: u32,
    /// Cube edge length.
    pub size: f32,
    /// Time-scale multiplier for animation and camera orbit.
    pub speed: f32,
}

impl Default for StressParameters {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            size: DEFAULT_SIZE,
            speed: DEFAULT_SPEED,
        }
    }
}

impl StressParameters {
    /// Resolve parameters from a query string. A leading path and `?` are
    /// ignored, so `/stress3d?count=10` works as well as `count=10`.
    pub fn from_query(query: &str) -> Self {
        let defaults = Self::default();
        let raw_count = lookup(query, "count");
        let raw_size = lookup(query, "size");
        let raw_speed = lookup(query, "speed");

        let count = raw_count
            .as_deref()
            .and_then(parse_int)
            .and_then(|v| u32::try_from(v).ok());
        let size = raw_size
            .as_deref()
            .and_then(parse_float)
            .filter(|v| *v > 0.0);
        let speed = raw_speed.as_deref().and_then(parse_float);

        for (key, raw, parsed) in [
            ("count", &raw_count, count.is_some()),
            ("size", &raw_size, size.is_some()),
            ("speed", &raw_speed, speed.is_some()),
        ] {
            if let (Some(value), false) = (raw, parsed) {
                tracing::warn!(key, value = %value, "ignoring unusable query value, using default");
            }
        }

        Self {
            count: count.unwrap_or(defaults.count),
            size: size.unwrap_or(defaults.size),
            speed: speed.unwrap_or(defaults.speed),
        }
    }

    /// Number of leading instances perturbed every frame.
    pub fn animated_subset(&self) -> usize {
        (self.count as usize).min(ANIMATED_SUBSET_LIMIT)
    }
}

/// First decoded value for `key`, like `URLSearchParams::get`.
fn lookup(query: &str, key: &str) -> Option<String> {
    let query = match query.split_once('?') {
        Some((_, rest)) => rest,
        None => query,
    };
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Leading-integer parse: `"42px"` is 42, `"abc"` is nothing.
fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let digits_start = usize::from(value.starts_with(['+', '-']));
    let digits_len = value[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    value[..digits_start + digits_len].parse().ok()
}

/// Longest-prefix float parse, narrowed to `f32`. A prefix that overflows
/// or underflows `f32` or is not finite counts as unparsable.
fn parse_float(value: &str) -> Option<f32> {
    let value = value.trim_start();
    let longest = value
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .find_map(|end| value[..end].parse::<f64>().ok())?;
    let narrowed = longest as f32;
    let underflow = narrowed == 0.0 && longest != 0.0;
    (narrowed.is_finite() && !underflow).then_some(narrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_uses_defaults() {
        let params = StressParameters::from_query("");
        assert_eq!(params, StressParameters::default());
        assert_eq!(params.count, 20_000);
        assert_eq!(params.size, 1.0);
        assert_eq!(params.speed, 1.0);
    }

    #[test]
    fn parses_all_keys() {
        let params = StressParameters::from_query("count=100&size=2.0&speed=0.5");
        assert_eq!(
            params,
            StressParameters {
                count: 100,
                size: 2.0,
                speed: 0.5
            }
        );
    }

    #[test]
    fn accepts_path_prefix() {
        let params = StressParameters::from_query("/stress3d?count=30000&size=1.2&speed=1.0");
        assert_eq!(params.count, 30_000);
        assert!((params.size - 1.2).abs() < 1e-6);
    }

    #[test]
    fn keys_fall_back_independently() {
        let params = StressParameters::from_query("count=abc&size=1.5&speed=");
        assert_eq!(params.count, DEFAULT_COUNT);
        assert_eq!(params.size, 1.5);
        assert_eq!(params.speed, DEFAULT_SPEED);
    }

    #[test]
    fn leading_numbers_are_kept() {
        let params = StressParameters::from_query("count=42px&speed=1.5x");
        assert_eq!(params.count, 42);
        assert_eq!(params.speed, 1.5);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let params = StressParameters::from_query("size=inf&speed=NaN");
        assert_eq!(params.size, DEFAULT_SIZE);
        assert_eq!(params.speed, DEFAULT_SPEED);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let params = StressParameters::from_query("count=-5&size=0");
        assert_eq!(params.count, DEFAULT_COUNT);
        assert_eq!(params.size, DEFAULT_SIZE);

        let params = StressParameters::from_query("count=99999999999");
        assert_eq!(params.count, DEFAULT_COUNT);
    }

    #[test]
    fn zero_count_and_negative_speed_are_valid() {
        let params = StressParameters::from_query("count=0&speed=-2");
        assert_eq!(params.count, 0);
        assert_eq!(params.speed, -2.0);
        assert_eq!(params.animated_subset(), 0);
    }

    #[test]
    fn first_occurrence_wins() {
        let params = StressParameters::from_query("count=7&count=9");
        assert_eq!(params.count, 7);
    }

    #[test]
    fn animated_subset_is_capped() {
        let mut params = StressParameters::default();
        assert_eq!(params.animated_subset(), ANIMATED_SUBSET_LIMIT);
        params.count = 120;
        assert_eq!(params.animated_subset(), 120);
    }

    #[test]
    fn values_outside_f32_fall_back() {
        let params = StressParameters::from_query("size=1e39&speed=1e39");
        assert_eq!(params.size, DEFAULT_SIZE);
        assert_eq!(params.speed, DEFAULT_SPEED);

        let params = StressParameters::from_query("size=1e400");
        assert_eq!(params.size, DEFAULT_SIZE);

        let params = StressParameters::from_query("size=1e-50&speed=1e-50");
        assert_eq!(params.size, DEFAULT_SIZE);
        assert_eq!(params.speed, DEFAULT_SPEED);
    }

    #[test]
    fn exact_zero_speed_is_kept() {
        let params = StressParameters::from_query("speed=0");
        assert_eq!(params.speed, 0.0);
    }

    #[test]
    fn longest_prefix_is_used() {
        assert_eq!(parse_float("2.5e1x"), Some(25.0));
        assert_eq!(parse_float("1e"), Some(1.0));
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("x1"), None);
    }

    #[test]
    fn values_are_percent_decoded() {
        let params = StressParameters::from_query("count=1%30&size=1%2E5&speed=%2B2");
        assert_eq!(params.count, 10);
        assert_eq!(params.size, 1.5);
        assert_eq!(params.speed, 2.0);

        // `+` decodes to a space, which the float parse skips.
        let params = StressParameters::from_query("?co%75nt=12&speed=+3");
        assert_eq!(params.count, 12);
        assert_eq!(params.speed, 3.0);
    }
}
