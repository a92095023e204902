//! Timestamp parsing shared by the flat-file loader and the HTTP payloads.
//!
//! Accepted inputs:
//! - RFC 3339 (`2024-01-01T00:00:00Z`, `2024-01-01T02:00:00+02:00`)
//! - naive date-times, read as UTC (`2024-01-01 00:00:00`, `2024-01-01T00:00:00.5`)
//! - bare dates, read as UTC midnight (`2024-01-01`)
//!
//! Every parsed value is normalised to the UTC offset.

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognised timestamp '{0}'")]
pub struct TimestampParseError(pub String);

pub fn parse_timestamp(input: &str) -> Result<OffsetDateTime, TimestampParseError> {
    let s = input.trim();

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    for fmt in naive_formats {
        if let Ok(dt) = PrimitiveDateTime::parse(s, fmt) {
            return Ok(dt.assume_utc());
        }
    }

    if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_utc());
    }

    Err(TimestampParseError(s.to_string()))
}

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    ts.to_offset(UtcOffset::UTC).format(&Rfc3339)
}

/// Serde adapter: writes RFC 3339, reads anything [`parse_timestamp`] accepts.
#[cfg(feature = "serde")]
pub mod lenient {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = super::format_timestamp(*ts).map_err(ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_rfc3339_and_normalises_to_utc() {
        assert_eq!(
            parse_timestamp("2024-01-01T02:00:00+02:00").unwrap(),
            datetime!(2024-01-01 00:00:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-03-05T10:00:00Z").unwrap().offset(),
            UtcOffset::UTC
        );
    }

    #[test]
    fn parses_naive_forms_as_utc() {
        let expected = datetime!(2024-07-15 14:00:00 UTC);
        assert_eq!(parse_timestamp("2024-07-15 14:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-07-15T14:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-07-15T14:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp(" 2024-07-15T14:00:00.250 ").unwrap(),
            datetime!(2024-07-15 14:00:00.25 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-07-15").unwrap(),
            datetime!(2024-07-15 00:00:00 UTC)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-01 00:00:00").is_err());
    }

    #[test]
    fn formats_as_rfc3339() {
        let s = format_timestamp(datetime!(2024-01-01 03:00:00 UTC)).unwrap();
        assert_eq!(s, "2024-01-01T03:00:00Z");
    }
}
