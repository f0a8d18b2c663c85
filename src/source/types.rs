//! Inertial sample types read from the acquisition log.
//!
//! One record per line: `timestamp, acc_x, acc_y, acc_z, gyro_x, gyro_y, gyro_z`.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A three-axis reading (x, y, z).
pub type Vec3 = [f64; 3];

/// Euclidean norm of a three-axis reading.
pub fn norm(v: &Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Number of comma-separated fields in a well-formed record.
pub const FIELD_COUNT: usize = 7;

const COLUMNS: [&str; FIELD_COUNT] = [
    "timestamp", "acc_x", "acc_y", "acc_z", "gyro_x", "gyro_y", "gyro_z",
];

/// A single 6-axis inertial sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time the acquisition process stamped on the record
    pub timestamp: NaiveDateTime,
    /// Accelerometer reading
    pub acc: Vec3,
    /// Gyroscope reading
    pub gyro: Vec3,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, acc: Vec3, gyro: Vec3) -> Self {
        Self {
            timestamp,
            acc,
            gyro,
        }
    }
}

/// Why a single record was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The record did not have exactly [`FIELD_COUNT`] fields.
    WrongArity { found: usize },
    /// The timestamp field could not be parsed.
    BadTimestamp(String),
    /// A sensor field was not a finite number.
    NotNumeric { column: &'static str, value: String },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::WrongArity { found } => {
                write!(f, "expected {FIELD_COUNT} fields, found {found}")
            }
            RecordError::BadTimestamp(v) => write!(f, "unparseable timestamp {v:?}"),
            RecordError::NotNumeric { column, value } => {
                write!(f, "column {column} is not numeric: {value:?}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Parse one CSV record into a [`Sample`].
pub fn parse_record(line: &str) -> Result<Sample, RecordError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::WrongArity {
            found: fields.len(),
        });
    }

    let timestamp = parse_timestamp(fields[0])
        .ok_or_else(|| RecordError::BadTimestamp(fields[0].to_string()))?;

    let mut values = [0.0_f64; 6];
    for (slot, (column, raw)) in values
        .iter_mut()
        .zip(COLUMNS[1..].iter().zip(&fields[1..]))
    {
        *slot = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| RecordError::NotNumeric {
                column: *column,
                value: raw.to_string(),
            })?;
    }

    Ok(Sample::new(
        timestamp,
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
    ))
}

/// Accepts naive ISO-8601 (what the acquisition process writes), RFC 3339,
/// or fractional epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }

    let secs = raw.parse::<f64>().ok().filter(|s| s.is_finite() && *s >= 0.0)?;
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_valid_record() {
        let sample =
            parse_record("2024-05-01T12:00:00.250000, 0.1, -0.2, 9.8, 1.0, 2.0, 3.0").unwrap();
        assert_eq!(sample.acc, [0.1, -0.2, 9.8]);
        assert_eq!(sample.gyro, [1.0, 2.0, 3.0]);
        assert_eq!(sample.timestamp.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_wrong_arity() {
        let err = parse_record("2024-05-01T12:00:00,1.0,2.0,3.0").unwrap_err();
        assert_eq!(err, RecordError::WrongArity { found: 4 });
    }

    #[test]
    fn test_parse_non_numeric() {
        let err = parse_record("2024-05-01T12:00:00,1.0,abc,3.0,0,0,0").unwrap_err();
        assert!(matches!(
            err,
            RecordError::NotNumeric {
                column: "acc_y",
                ..
            }
        ));

        let err = parse_record("2024-05-01T12:00:00,1.0,NaN,3.0,0,0,0").unwrap_err();
        assert!(matches!(err, RecordError::NotNumeric { .. }));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T12:00:00").is_some());
        assert!(parse_timestamp("2024-05-01 12:00:00.5").is_some());
        assert!(parse_timestamp("2024-05-01T12:00:00+02:00").is_some());
        assert!(parse_timestamp("1714564800.25").is_some());
        assert!(parse_timestamp("Timestamp").is_none());
        assert!(parse_timestamp("-3").is_none());
    }

    #[test]
    fn test_norm() {
        assert!((norm(&[3.0, 4.0, 0.0]) - 5.0).abs() < 1e-12);
    }
}
