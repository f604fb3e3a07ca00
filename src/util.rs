use num_format::{Locale, ToFormattedString};
use sqlx::types::chrono;

pub(crate) const HOUR_MS: i64 = 60 * 60 * 1000;
pub(crate) const DAY_MS: i64 = 24 * HOUR_MS;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn format_score(score: i64) -> String {
    score.to_formatted_string(&Locale::en)
}

pub(crate) fn format_estimate(value: f64) -> String {
    format_score(value.round() as i64)
}

/// Discord relative timestamp markup, `<t:..:R>`.
pub(crate) fn relative_time(timestamp_ms: i64) -> String {
    format!("<t:{}:R>", timestamp_ms / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score_groups_thousands() {
        assert_eq!(format_score(2_400_000), "2,400,000");
        assert_eq!(format_estimate(1234.6), "1,235");
    }

    #[test]
    fn test_relative_time_uses_seconds() {
        assert_eq!(relative_time(1_700_000_000_123), "<t:1700000000:R>");
    }
}
