// Formatting helpers shared by the dashboard panels

use crate::event::Timestamp;

/// Format a share (0.0..=1.0) as a percentage
pub fn format_share(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

/// Compact clock label for a producer timestamp
///
/// ISO-8601 text is cut down to `HH:MM:SS`; numeric values are treated as
/// unix seconds. Anything else is shown as received.
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    match timestamp {
        Timestamp::Text(text) => match text.split_once('T') {
            Some((_, time)) => time.chars().take(8).collect(),
            None => text.clone(),
        },
        Timestamp::Numeric(number) => number
            .as_i64()
            .and_then(|secs| chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| number.to_string()),
    }
}

/// Shorten a label to `max` characters for narrow columns
pub fn clip_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let mut clipped: String = label.chars().take(max.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(&Timestamp::from("2024-11-20T10:15:02.123456")),
            "10:15:02"
        );
        assert_eq!(format_timestamp(&Timestamp::from("frame-12")), "frame-12");
        assert_eq!(format_timestamp(&Timestamp::from(3_661_i64)), "01:01:01");
    }

    #[test]
    fn test_format_share_and_clip() {
        assert_eq!(format_share(0.25), "25.0%");
        assert_eq!(clip_label("three wheelers -CNG-", 6), "three…");
        assert_eq!(clip_label("car", 6), "car");
    }
}
