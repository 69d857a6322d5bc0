//! Resolve canonical timezone names, e.g. "Pacific/Auckland", to offsets and dates.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// The current UTC offset of a canonical timezone, or `None` if the name is unknown.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in a canonical timezone.
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the name is not a known timezone.
pub fn today_in(canonical_timezone: &str) -> Result<Date, Error> {
    let Some(local_offset) = get_local_offset(canonical_timezone) else {
        tracing::error!("unknown timezone \"{canonical_timezone}\"");
        return Err(Error::InvalidTimezone(canonical_timezone.to_owned()));
    };

    Ok(OffsetDateTime::now_utc().to_offset(local_offset).date())
}
