use chrono::{DateTime, Utc};
use chrono_tz::Tz;

// Formats a stored UTC timestamp in the chat's time zone.
pub fn reformat_datetime(datetime: &DateTime<Utc>, time_zone: Tz) -> String {
    datetime
        .with_timezone(&time_zone)
        .format("%d %b %Y %H:%M")
        .to_string()
}
