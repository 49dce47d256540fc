//! Display-time helpers
//!
//! Detection times are display strings. Producers write 24-hour clock text;
//! the parser also understands `AM`/`PM` suffixes found in older records.

use chrono::{DateTime, Local, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static CLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp][Mm])?\s*$")
        .expect("clock pattern is a valid regex")
});

/// `HH:MM` clock text
pub fn clock_time(now: &DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

/// `HH:MM:SS` clock text
pub fn clock_time_seconds(now: &DateTime<Local>) -> String {
    now.format("%H:%M:%S").to_string()
}

/// Parse `HH:MM`, `HH:MM:SS` and either with an `AM`/`PM` suffix.
pub fn parse_display_time(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_PATTERN.captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(meridiem) = caps.get(4) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// The leading hour digits of a display time.
///
/// No meridiem adjustment: `"03:16 PM"` buckets into hour 3, the same way
/// the dashboard's hourly charts have always read it. Values outside 0..24
/// yield `None`.
pub fn leading_hour(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|h| *h < 24)
}
