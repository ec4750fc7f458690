//! Display helpers shared by the terminal views and the CLI tables.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};

/// Shown instead of a date that is missing or cannot be parsed.
pub const DATE_PLACEHOLDER: &str = "---";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// `api_url` → `Api Url`.
///
/// Underscores become spaces and every ASCII word character that starts
/// a word is upper-cased. Applying it twice changes nothing.
pub fn format_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_word = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && !prev_is_word {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        prev_is_word = is_word;
    }
    out
}

/// `2024-01-05T13:05:00` → `05 Jan 2024, 1:05 PM` in local time.
pub fn format_date(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(parse_local)
        .map(|dt| format_datetime(&dt))
        .unwrap_or_else(|| DATE_PLACEHOLDER.to_string())
}

pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let (is_pm, hour) = dt.hour12();
    format!(
        "{}, {}:{:02} {}",
        dt.format("%d %b %Y"),
        hour,
        dt.minute(),
        if is_pm { "PM" } else { "AM" }
    )
}

fn parse_local(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(resolve_local(&Local, &naive))
}

/// A wall-clock time skipped by a DST jump is moved forward by the jump,
/// the way browsers resolve `new Date(...)`.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(naive))
}
