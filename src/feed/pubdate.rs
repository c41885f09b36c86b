use chrono::{DateTime, Utc, Weekday};
use thiserror::Error;

/// Everything after the weekday: `2 Jan 2006 15:04:05 -0700`.
const DATE_LAYOUT: &str = "%d %b %Y %H:%M:%S %z";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized publication date {0:?} (expected e.g. \"Mon, 2 Jan 2006 15:04:05 -0700\")")]
pub struct PubDateError(pub String);

/// Parses an RSS `pubDate` of the form `Mon, 2 Jan 2006 15:04:05 -0700`.
///
/// The weekday must be a three-letter abbreviation but is not checked
/// against the date. The day may have one or two digits, the year must have
/// exactly four, and the zone must be a numeric `+hhmm`/`-hhmm` offset
/// (`GMT`, `EST` and `+00:00` are rejected). Fields are separated by exactly
/// one space.
pub fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, PubDateError> {
    let trimmed = raw.trim();
    let err = || PubDateError(raw.to_string());

    let (weekday, rest) = trimmed.split_once(", ").ok_or_else(err)?;
    if weekday.len() != 3 || weekday.parse::<Weekday>().is_err() {
        return Err(err());
    }
    if !has_fixed_shape(rest) {
        return Err(err());
    }

    DateTime::parse_from_str(rest, DATE_LAYOUT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| err())
}

/// chrono's `%Y` takes any number of digits and `%z` allows a colon, so the
/// token widths are checked before handing over.
fn has_fixed_shape(rest: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let fields: Vec<&str> = rest.split(' ').collect();
    let &[day, _month, year, _time, offset] = fields.as_slice() else {
        return false;
    };
    let offset_ok = offset.len() == 5
        && (offset.starts_with('+') || offset.starts_with('-'))
        && digits(&offset[1..]);

    (1..=2).contains(&day.len()) && digits(day) && year.len() == 4 && digits(year) && offset_ok
}
