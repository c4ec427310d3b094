//! Duration formatting and parsing helpers.

use thiserror::Error;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration {0:?}: expected e.g. 3600, 90s, 15m, 48h or 7d")]
pub struct DurationParseError(pub String);

/// Parse `"172800"`, `"90s"`, `"15m"`, `"48h"` or `"7d"` into seconds.
pub fn parse_duration(s: &str) -> Result<u64, DurationParseError> {
    let s = s.trim();
    let err = || DurationParseError(s.to_string());
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => s.split_at(pos),
        None => (s, ""),
    };
    let value: u64 = digits.parse().map_err(|_| err())?;
    let scale = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(err()),
    };
    value.checked_mul(scale).ok_or_else(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(900), "15m 0s");
        assert_eq!(format_duration(7_200 + 60), "2h 1m");
        assert_eq!(format_duration(2 * 86_400), "2d 0h");
    }

    #[test]
    fn parses_units() {
        assert_eq!(parse_duration("172800"), Ok(172_800));
        assert_eq!(parse_duration("90s"), Ok(90));
        assert_eq!(parse_duration("15m"), Ok(900));
        assert_eq!(parse_duration("48h"), Ok(172_800));
        assert_eq!(parse_duration("7d"), Ok(604_800));
        assert!(parse_duration("7w").is_err());
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("").is_err());
    }
}
