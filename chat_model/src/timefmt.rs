use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A timestamp that cannot be stored.
#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("timestamp outside years 0..=9999 in UTC")]
    OutOfRange,
    #[error("timestamp formatting failed: {0}")]
    Format(#[from] time::error::Format),
}

/// Convert to UTC, refusing instants whose UTC year falls outside 0..=9999.
/// Those have no fixed-width storage form and no RFC 3339 rendering.
pub fn normalize_utc(ts: OffsetDateTime) -> Option<OffsetDateTime> {
    ts.checked_to_offset(UtcOffset::UTC)
        .filter(|t| (0..=9999).contains(&t.year()))
}

/// Render a timestamp in the fixed-width UTC form used for storage.
///
/// Every stored value has the same width and offset, so text ordering in
/// SQLite matches chronological ordering.
pub fn to_storage(ts: OffsetDateTime) -> Result<String, TimestampError> {
    let utc = normalize_utc(ts).ok_or(TimestampError::OutOfRange)?;
    Ok(utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
    ))?)
}

/// Parse a value written by [`to_storage`].
pub fn from_storage(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"),
    )
    .map(PrimitiveDateTime::assume_utc)
}

/// ISO-8601 (RFC 3339) rendering in UTC for the wire. `None` when the value
/// cannot be represented.
pub fn to_iso8601(ts: OffsetDateTime) -> Option<String> {
    normalize_utc(ts)?.format(&Rfc3339).ok()
}
