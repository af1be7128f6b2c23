use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

use crate::error::{EtlError, Result};

// Slash dates without a leading year are month-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses the date and timestamp spellings found in the lake's CSV exports.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.naive_utc())
}

/// Replaces a text column with its temporal equivalent.
///
/// The column becomes `Date` when no value carries a time of day, otherwise
/// `Datetime(ms)`. Nulls are kept. The first unparseable value aborts with its
/// zero-based row index.
pub fn normalize_dates(df: &mut DataFrame, column: &str) -> Result<()> {
    let values = df.column(column)?.str()?;

    let mut parsed: Vec<Option<NaiveDateTime>> = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        match value {
            None => parsed.push(None),
            Some(text) => {
                let timestamp = parse_timestamp(text).ok_or_else(|| EtlError::InvalidDate {
                    column: column.to_string(),
                    row,
                    value: text.to_string(),
                })?;
                parsed.push(Some(timestamp));
            }
        }
    }

    let date_only = parsed
        .iter()
        .flatten()
        .all(|timestamp| timestamp.time() == NaiveTime::MIN);

    let series = if date_only {
        let dates: Vec<Option<NaiveDate>> = parsed
            .iter()
            .map(|value| value.map(|timestamp| timestamp.date()))
            .collect();
        Series::new(column.into(), dates)
    } else {
        Series::new(column.into(), parsed)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
    };

    df.with_column(series)?;
    Ok(())
}
