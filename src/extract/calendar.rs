//! Timestamp decomposition
//!
//! Usage events carry epoch milliseconds. They are truncated to whole seconds
//! (`start_time`) and rendered in a pinned UTC offset, never the host's local
//! zone, so two runs on different machines derive identical calendar fields.
//!
//! Weekday numbering is Sunday=1 through Saturday=7. Week numbers are ISO
//! 8601 weeks, so early January days may belong to week 52 or 53.

use crate::schema::{
    DAY_COLUMN, HOUR_COLUMN, MONTH_COLUMN, START_TIME_COLUMN, WEEKDAY_COLUMN, WEEK_COLUMN,
    YEAR_COLUMN,
};
use crate::{Error, Result};

use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_array::{Array, ArrayRef, Int32Array, Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::sync::Arc;

/// Calendar components of one event timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    /// Epoch seconds
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday … 7 = Saturday
    pub weekday: i32,
}

/// Decompose an epoch-millisecond timestamp in the given offset.
pub fn decompose_timestamp(epoch_millis: i64, offset: &FixedOffset) -> Result<CalendarFields> {
    let start_time = epoch_millis.div_euclid(1000);
    let utc = DateTime::from_timestamp(start_time, 0).ok_or_else(|| {
        Error::Derivation(format!(
            "timestamp {} ms is outside the representable calendar range",
            epoch_millis
        ))
    })?;
    let local = utc.with_timezone(offset);

    Ok(CalendarFields {
        start_time,
        hour: local.hour() as i32,
        day: local.day() as i32,
        week: local.iso_week().week() as i32,
        month: local.month() as i32,
        year: local.year(),
        weekday: local.weekday().number_from_sunday() as i32,
    })
}

/// Parse a pinned offset: `UTC`, `Z`, `+HH`, `+HH:MM` or `+HHMM` (sign required
/// unless UTC).
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("utc") || value == "Z" {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| Error::Internal("zero offset rejected".to_string()));
    }

    let invalid = || {
        Error::Config(format!(
            "invalid time zone offset '{}', expected UTC or +HH:MM",
            raw
        ))
    };

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Append `start_time, hour, day, week, month, year, weekday` to `batch`,
/// derived from the epoch-millisecond column `ts_column`.
///
/// Every row needs a timestamp; a null fails the whole batch.
pub fn with_calendar_columns(
    batch: &RecordBatch,
    ts_column: &str,
    offset: &FixedOffset,
) -> Result<RecordBatch> {
    let ts = batch
        .column_by_name(ts_column)
        .ok_or_else(|| Error::InvalidSchema(format!("missing column '{}'", ts_column)))?
        .as_primitive_opt::<Int64Type>()
        .ok_or_else(|| {
            Error::InvalidSchema(format!("column '{}' is not an Int64 column", ts_column))
        })?;

    let rows = ts.len();
    let mut start_time = Vec::with_capacity(rows);
    let mut hour = Vec::with_capacity(rows);
    let mut day = Vec::with_capacity(rows);
    let mut week = Vec::with_capacity(rows);
    let mut month = Vec::with_capacity(rows);
    let mut year = Vec::with_capacity(rows);
    let mut weekday = Vec::with_capacity(rows);

    for row in 0..rows {
        if ts.is_null(row) {
            return Err(Error::Derivation(format!(
                "row {} has no '{}' value",
                row, ts_column
            )));
        }
        let fields = decompose_timestamp(ts.value(row), offset)?;
        start_time.push(fields.start_time);
        hour.push(fields.hour);
        day.push(fields.day);
        week.push(fields.week);
        month.push(fields.month);
        year.push(fields.year);
        weekday.push(fields.weekday);
    }

    let int32 = |name: &str, values: Vec<i32>| -> (Field, ArrayRef) {
        (
            Field::new(name, DataType::Int32, false),
            Arc::new(Int32Array::from(values)) as ArrayRef,
        )
    };

    let derived = vec![
        (
            Field::new(START_TIME_COLUMN, DataType::Int64, false),
            Arc::new(Int64Array::from(start_time)) as ArrayRef,
        ),
        int32(HOUR_COLUMN, hour),
        int32(DAY_COLUMN, day),
        int32(WEEK_COLUMN, week),
        int32(MONTH_COLUMN, month),
        int32(YEAR_COLUMN, year),
        int32(WEEKDAY_COLUMN, weekday),
    ];

    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns = batch.columns().to_vec();
    for (field, array) in derived {
        if schema.column_with_name(field.name()).is_some() {
            return Err(Error::InvalidSchema(format!(
                "column '{}' already exists",
                field.name()
            )));
        }
        fields.push(field);
        columns.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_decompose_known_timestamp() {
        // 2018-11-15 00:30:26.796 UTC, a Thursday in ISO week 46
        let fields = decompose_timestamp(1_542_241_826_796, &utc()).unwrap();
        assert_eq!(
            fields,
            CalendarFields {
                start_time: 1_542_241_826,
                hour: 0,
                day: 15,
                week: 46,
                month: 11,
                year: 2018,
                weekday: 5,
            }
        );
    }

    #[test]
    fn test_weekday_numbering_starts_on_sunday() {
        // 2018-11-04 was a Sunday, 2018-11-10 a Saturday
        let sunday = decompose_timestamp(1_541_332_800_000, &utc()).unwrap();
        let saturday = decompose_timestamp(1_541_851_200_000, &utc()).unwrap();
        assert_eq!(sunday.weekday, 1);
        assert_eq!(saturday.weekday, 7);
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // 2021-01-01 belongs to ISO week 53 of 2020
        let ms = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let fields = decompose_timestamp(ms, &utc()).unwrap();
        assert_eq!(fields.week, 53);
        assert_eq!(fields.year, 2021);
    }

    #[test]
    fn test_offset_shifts_calendar_fields() {
        // 23:30 UTC on Nov 14 is 00:30 on Nov 15 at +01:00
        let ms = 1_542_238_200_000;
        let at_utc = decompose_timestamp(ms, &utc()).unwrap();
        let at_plus_one = decompose_timestamp(ms, &parse_utc_offset("+01:00").unwrap()).unwrap();
        assert_eq!(at_utc.hour, 23);
        assert_eq!(at_utc.day, 14);
        assert_eq!(at_plus_one.hour, 0);
        assert_eq!(at_plus_one.day, 15);
        assert_eq!(at_utc.start_time, at_plus_one.start_time);
    }

    #[test]
    fn test_start_time_floors_negative_millis() {
        let fields = decompose_timestamp(-1, &utc()).unwrap();
        assert_eq!(fields.start_time, -1);
        assert_eq!(fields.year, 1969);
        assert_eq!(fields.hour, 23);
    }

    #[test]
    fn test_decomposition_round_trips_to_hour_window() {
        let offset = parse_utc_offset("-05:00").unwrap();
        for ms in [0_i64, 1_541_106_106_796, 1_543_622_579_796, 1_700_000_000_999] {
            let f = decompose_timestamp(ms, &offset).unwrap();
            let hour_start = offset
                .with_ymd_and_hms(f.year, f.month as u32, f.day as u32, f.hour as u32, 0, 0)
                .single()
                .unwrap()
                .timestamp();
            assert!(f.start_time >= hour_start && f.start_time < hour_start + 3600);
            assert_eq!(f.start_time, ms.div_euclid(1000));
        }
    }

    #[test]
    fn test_out_of_range_timestamp_is_derivation_error() {
        let err = decompose_timestamp(i64::MAX, &utc()).unwrap_err();
        assert!(matches!(err, Error::Derivation(_)));
    }

    #[test]
    fn test_parse_utc_offset_variants() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+02").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_utc_offset("-0930").unwrap().local_minus_utc(), -34200);
        assert_eq!(parse_utc_offset("+05:45").unwrap().local_minus_utc(), 20700);
        assert!(parse_utc_offset("America/New_York").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("0100").is_err());
    }

    #[test]
    fn test_with_calendar_columns_rejects_null_timestamp() {
        let schema = Arc::new(Schema::new(vec![Field::new("ts", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![Some(1_000), None]))],
        )
        .unwrap();
        let err = with_calendar_columns(&batch, "ts", &utc()).unwrap_err();
        assert!(matches!(err, Error::Derivation(_)));
    }

    #[test]
    fn test_with_calendar_columns_appends_fields() {
        let schema = Arc::new(Schema::new(vec![Field::new("ts", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![1_542_241_826_796]))],
        )
        .unwrap();
        let timed = with_calendar_columns(&batch, "ts", &utc()).unwrap();
        let names: Vec<String> = timed
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            names,
            vec!["ts", "start_time", "hour", "day", "week", "month", "year", "weekday"]
        );
        let start = timed
            .column_by_name("start_time")
            .unwrap()
            .as_primitive::<Int64Type>()
            .value(0);
        assert_eq!(start, 1_542_241_826);
    }
}
