use chrono::{DateTime, Utc};
use memscope_core::{NoneObject, Object, ObjectClass};

/// Name of the native type holding a `FILETIME`.
pub const WIN_TIMESTAMP: &str = "WinTimeStamp";

/// Seconds from 1601-01-01 to the UNIX epoch.
const EPOCH_DELTA: i64 = 11_644_473_600;

/// `FILETIME` ticks (100 ns) per second.
const TICKS_PER_SECOND: u64 = 10_000_000;

const FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC+0000";

/// Converts a `FILETIME` to UTC.
///
/// A zero `FILETIME` means the time was never set and yields `None`.
pub fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }

    let seconds = (filetime / TICKS_PER_SECOND) as i64 - EPOCH_DELTA;
    let nanos = (filetime % TICKS_PER_SECOND) as u32 * 100;
    DateTime::from_timestamp(seconds, nanos)
}

/// Reads a timestamp object.
pub fn read_timestamp(object: &Object) -> Result<Option<DateTime<Utc>>, NoneObject> {
    Ok(filetime_to_utc(object.value()?))
}

/// Class of [`WIN_TIMESTAMP`].
///
/// Renders the time in UTC, or `-` when it was never set.
pub struct WinTimeStampClass;

impl ObjectClass for WinTimeStampClass {
    fn render(&self, object: &Object) -> Option<Result<String, NoneObject>> {
        Some(read_timestamp(object).map(|time| match time {
            Some(time) => time.format(FORMAT).to_string(),
            None => String::from("-"),
        }))
    }
}
