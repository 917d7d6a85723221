//! Wall-clock helpers for display.

use chrono::{DateTime, Local, TimeZone};

/// Formats an instant as `HH:MM` in its own timezone.
#[must_use]
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// Returns the current local time as `HH:MM`.
#[must_use]
pub fn display_timestamp() -> String {
    format_timestamp(&Local::now())
}
