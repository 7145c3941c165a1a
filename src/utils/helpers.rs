//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::{DateTime, FixedOffset, Utc};

/// Format used for every date the user types or reads
pub const TASK_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Build a fixed offset from a number of minutes east of UTC
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

/// Format a timestamp in the given offset, e.g. `05.03.2025 14:00 (UTC+03:00)`
pub fn format_task_time(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "{} (UTC{})",
        timestamp.with_timezone(&offset).format(TASK_TIME_FORMAT),
        offset
    )
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Check that a user-supplied string is non-empty after trimming
pub fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
