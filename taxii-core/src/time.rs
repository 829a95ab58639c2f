//! UTC timestamp codec with the two textual forms TAXII and STIX resources use.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format string for the *taxii* form: fixed microsecond precision.
pub const TAXII_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Render a timestamp in the *taxii* textual form (fixed microsecond precision).
#[must_use]
pub fn to_taxii_string(dt: &DateTime<Utc>) -> String {
    dt.format(TAXII_DATETIME_FORMAT).to_string()
}

/// Render a timestamp in the *stix* textual form: trailing zeros in the
/// sub-second part are trimmed down to a floor of three digits
/// (milliseconds). Higher-precision timestamps keep all six digits.
#[must_use]
pub fn to_stix_string(dt: &DateTime<Utc>) -> String {
    let seconds = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = dt.format("%6f").to_string();
    if micros[3..].trim_end_matches('0').is_empty() {
        format!("{seconds}.{}Z", &micros[..3])
    } else {
        format!("{seconds}.{micros}Z")
    }
}

/// Parse a timestamp string, trying microsecond precision first and falling
/// back to whole-second precision.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .or_else(|e| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ").map_err(|_| e))?;
    Ok(naive.and_utc())
}

/// Convert a timestamp to epoch seconds with fractional precision.
#[must_use]
pub fn to_epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1_000_000.0
}

/// Convert epoch seconds back to a UTC timestamp.
#[must_use]
pub fn from_epoch_seconds(secs: f64) -> DateTime<Utc> {
    let whole = secs.trunc() as i64;
    let micros = ((secs.fract()) * 1_000_000.0).round() as u32;
    DateTime::from_timestamp(whole, micros * 1_000).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxii_round_trip_preserves_microseconds() {
        let dt = parse_timestamp("2016-11-03T12:30:59.000123Z").expect("valid timestamp");
        assert_eq!(to_taxii_string(&dt), "2016-11-03T12:30:59.000123Z");
    }

    #[test]
    fn stix_trims_to_milliseconds_when_no_finer_precision() {
        let dt = parse_timestamp("2016-11-03T12:30:59.000000Z").expect("valid timestamp");
        assert_eq!(to_stix_string(&dt), "2016-11-03T12:30:59.000Z");
    }

    #[test]
    fn stix_keeps_full_precision_when_present() {
        let dt = parse_timestamp("2016-11-03T12:30:59.123456Z").expect("valid timestamp");
        assert_eq!(to_stix_string(&dt), "2016-11-03T12:30:59.123456Z");
    }

    #[test]
    fn parses_whole_second_form() {
        let dt = parse_timestamp("2016-11-03T12:30:59Z").expect("valid timestamp");
        assert_eq!(to_taxii_string(&dt), "2016-11-03T12:30:59.000000Z");
    }

    #[test]
    fn epoch_round_trip() {
        let dt = parse_timestamp("2016-11-03T12:30:59.500000Z").expect("valid timestamp");
        let back = from_epoch_seconds(to_epoch_seconds(&dt));
        assert_eq!(to_taxii_string(&dt), to_taxii_string(&back));
    }
}
