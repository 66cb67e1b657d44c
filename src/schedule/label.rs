//! Academic year labels such as `2024-2025`

use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").expect("year label pattern is valid"));

/// The two integers of a label, or `None` if it is not `<int>-<int>`
pub fn parse_label(label: &str) -> Option<(u32, u32)> {
    let caps = YEAR_LABEL.captures(label)?;
    let start = caps.get(1)?.as_str().parse().ok()?;
    let end = caps.get(2)?.as_str().parse().ok()?;
    Some((start, end))
}

/// Increment both halves: `2024-2025` becomes `2025-2026`
pub fn next_label(label: &str) -> Option<String> {
    let (start, end) = parse_label(label)?;
    Some(format!("{}-{}", start.checked_add(1)?, end.checked_add(1)?))
}

/// Label of the period starting in `start_year`
pub fn period_label(start_year: i32) -> String {
    format!("{}-{}", start_year, start_year + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("2024-2025"), Some((2024, 2025)));
        assert_eq!(parse_label(" 2024 - 2025 "), Some((2024, 2025)));
        assert_eq!(parse_label("2024/2025"), None);
        assert_eq!(parse_label("Fall 2024"), None);
        assert_eq!(parse_label("2024-2025-2026"), None);
        assert_eq!(parse_label("99999999999-1"), None);
    }

    #[test]
    fn test_next_label() {
        assert_eq!(next_label("2024-2025").as_deref(), Some("2025-2026"));
        assert_eq!(next_label("24-25").as_deref(), Some("25-26"));
        assert_eq!(next_label("current"), None);
    }

    #[test]
    fn test_period_label() {
        assert_eq!(period_label(2023), "2023-2024");
    }
}
