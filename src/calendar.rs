//! Target-date handling: argument parsing and local-midnight timestamps.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{AppError, Result};
use crate::types::SnapshotDate;

/// Generic date layouts accepted when the argument is not `YYYYMMDD`.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y", "%b %d %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Resolve the CLI date argument to a civil date. `None` means today.
///
/// Any time-of-day component is discarded; timestamps carrying an offset are
/// first converted to local time so the date matches the local calendar.
pub fn parse_target_date(arg: Option<&str>, today: NaiveDate) -> Result<SnapshotDate> {
    let Some(raw) = arg.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(SnapshotDate::new(today));
    };

    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(SnapshotDate::new(dt.with_timezone(&Local).date_naive()));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(SnapshotDate::new(dt.date()));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(SnapshotDate::new(d));
        }
    }

    Err(AppError::Date(format!("unrecognised date argument {raw:?}")))
}

/// Unix seconds of local midnight at the start of `date`.
pub fn local_midnight_unix(date: SnapshotDate) -> Result<i64> {
    midnight_unix_in(&Local, date)
}

/// Unix seconds of midnight at the start of `date` in `tz`.
/// When midnight falls in a DST gap the earliest valid instant wins.
pub fn midnight_unix_in<Tz: TimeZone>(tz: &Tz, date: SnapshotDate) -> Result<i64> {
    let naive = date.date().and_time(NaiveTime::MIN);
    if let Some(t) = tz.from_local_datetime(&naive).earliest() {
        return Ok(t.timestamp());
    }
    // Midnight skipped by a forward transition: walk forward to the first valid minute.
    (1..=180)
        .filter_map(|m| {
            tz.from_local_datetime(&(naive + chrono::Duration::minutes(m)))
                .earliest()
        })
        .map(|t| t.timestamp())
        .next()
        .ok_or_else(|| AppError::Date(format!("no local midnight for {date}")))
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}
