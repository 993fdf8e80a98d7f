//! Conversion between row tables and JSON rows
//!
//! Row tables are polars `DataFrame`s. Specifications and the render surface
//! speak JSON rows (`[{column: value, ...}, ...]`), so tables are converted at
//! the edges: when data is inlined into a document, when rows are pushed into a
//! live chart and when the CLI reads rows from disk.

use polars::prelude::*;
use serde_json::{json, Map, Value};

use crate::{ChartspecError, Result};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

// =============================================================================
// Table → JSON
// =============================================================================

/// Convert a row table into JSON rows.
///
/// Temporal values become ISO-8601 strings: dates as `YYYY-MM-DD`, datetimes
/// as `YYYY-MM-DDTHH:MM:SS.sssZ` and times as `HH:MM:SS.sss`. Nulls become
/// JSON `null`; any other type falls back to its display form.
pub fn dataframe_to_values(df: &DataFrame) -> Result<Vec<Value>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());

    for idx in 0..df.height() {
        let mut row = Map::new();
        for column in columns {
            let value = column.get(idx).map_err(|e| {
                ChartspecError::DataError(format!(
                    "Failed to read row {} of column '{}': {}",
                    idx,
                    column.name(),
                    e
                ))
            })?;
            row.insert(column.name().to_string(), any_value_to_json(value)?);
        }
        rows.push(Value::Object(row));
    }

    Ok(rows)
}

fn any_value_to_json(value: AnyValue<'_>) -> Result<Value> {
    let json = match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => json!(v),
        AnyValue::String(v) => json!(v),
        AnyValue::StringOwned(v) => json!(v.as_str()),
        AnyValue::UInt8(v) => json!(v),
        AnyValue::UInt16(v) => json!(v),
        AnyValue::UInt32(v) => json!(v),
        AnyValue::UInt64(v) => json!(v),
        AnyValue::Int8(v) => json!(v),
        AnyValue::Int16(v) => json!(v),
        AnyValue::Int32(v) => json!(v),
        AnyValue::Int64(v) => json!(v),
        AnyValue::Float32(v) => json!(v),
        AnyValue::Float64(v) => json!(v),
        AnyValue::Date(days) => json!(format_date(days)?),
        AnyValue::Datetime(ts, unit, _) => json!(format_datetime(ts, unit)?),
        AnyValue::DatetimeOwned(ts, unit, _) => json!(format_datetime(ts, unit)?),
        AnyValue::Time(nanos) => json!(format_time(nanos)),
        other => json!(other.to_string()),
    };
    Ok(json)
}

/// Days since the Unix epoch as `YYYY-MM-DD`
fn format_date(days: i32) -> Result<String> {
    chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ChartspecError::DataError(format!("Date out of range: {} days", days)))
}

/// Timestamp in `unit` as `YYYY-MM-DDTHH:MM:SS.sssZ`
fn format_datetime(timestamp: i64, unit: TimeUnit) -> Result<String> {
    let dt = match unit {
        TimeUnit::Milliseconds => chrono::DateTime::from_timestamp_millis(timestamp),
        TimeUnit::Microseconds => chrono::DateTime::from_timestamp_micros(timestamp),
        TimeUnit::Nanoseconds => Some(chrono::DateTime::from_timestamp_nanos(timestamp)),
    };
    dt.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .ok_or_else(|| ChartspecError::DataError(format!("Datetime out of range: {}", timestamp)))
}

/// Nanoseconds since midnight as `HH:MM:SS.sss`
fn format_time(nanos: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        nanos / NANOS_PER_HOUR,
        (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE,
        (nanos % NANOS_PER_MINUTE) / NANOS_PER_SECOND,
        (nanos % NANOS_PER_SECOND) / 1_000_000
    )
}

// =============================================================================
// JSON → Table
// =============================================================================

/// Infer a row table from JSON rows.
///
/// Columns appear in first-seen key order. A column whose non-null values are
/// all numbers becomes `f64`, all booleans becomes `bool`, anything else becomes
/// a string column. Keys missing from a row are null.
pub fn values_to_dataframe(rows: &[Value]) -> Result<DataFrame> {
    let mut objects = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| {
            ChartspecError::DataError(format!("Row {} is not a JSON object", idx))
        })?;
        objects.push(obj);
    }

    let mut names: Vec<&str> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let cells: Vec<Option<&Value>> = objects
                .iter()
                .map(|obj| obj.get(*name).filter(|v| !v.is_null()))
                .collect();
            infer_column(name, &cells)
        })
        .collect();

    DataFrame::new(columns)
        .map_err(|e| ChartspecError::DataError(format!("Failed to build table: {}", e)))
}

fn infer_column(name: &str, cells: &[Option<&Value>]) -> Column {
    let present = || cells.iter().flatten();

    if present().all(|v| v.is_number()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(Value::as_f64)).collect();
        Column::new(name.into(), values)
    } else if present().all(|v| v.is_boolean()) {
        let values: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(Value::as_bool)).collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|c| {
                c.map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            })
            .collect();
        Column::new(name.into(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Table → JSON Tests ====================

    #[test]
    fn test_basic_types() {
        let df = df! {
            "region" => ["north", "south"],
            "sales" => [1.5, 2.0],
            "units" => [3i64, 4],
            "flag" => [true, false],
        }
        .unwrap();
        let rows = dataframe_to_values(&df).unwrap();
        assert_eq!(
            rows[0],
            json!({"region": "north", "sales": 1.5, "units": 3, "flag": true})
        );
        assert_eq!(rows[1]["units"], 4);
    }

    #[test]
    fn test_nulls() {
        let df = df! {
            "v" => [Some(1.0), None],
            "s" => [None, Some("b")],
        }
        .unwrap();
        let rows = dataframe_to_values(&df).unwrap();
        assert_eq!(rows[0]["s"], Value::Null);
        assert_eq!(rows[1]["v"], Value::Null);
    }

    #[test]
    fn test_temporal_formatting() {
        assert_eq!(format_date(0).unwrap(), "1970-01-01");
        assert_eq!(format_date(19723).unwrap(), "2024-01-01");
        assert_eq!(
            format_datetime(1_704_067_200_123, TimeUnit::Milliseconds).unwrap(),
            "2024-01-01T00:00:00.123Z"
        );
        assert_eq!(
            format_datetime(1_704_067_200_000_000, TimeUnit::Microseconds).unwrap(),
            "2024-01-01T00:00:00.000Z"
        );
        let nanos = 13 * NANOS_PER_HOUR + 5 * NANOS_PER_MINUTE + 7 * NANOS_PER_SECOND + 250_000_000;
        assert_eq!(format_time(nanos), "13:05:07.250");
    }

    #[test]
    fn test_date_column() {
        let df = df! { "d" => [19723i32] }.unwrap();
        let df = df
            .lazy()
            .with_column(col("d").cast(DataType::Date))
            .collect()
            .unwrap();
        let rows = dataframe_to_values(&df).unwrap();
        assert_eq!(rows[0]["d"], "2024-01-01");
    }

    #[test]
    fn test_empty_table() {
        let df = df! { "a" => Vec::<f64>::new() }.unwrap();
        assert!(dataframe_to_values(&df).unwrap().is_empty());
    }

    // ==================== JSON → Table Tests ====================

    #[test]
    fn test_infer_column_types() {
        let rows = vec![
            json!({"region": "north", "sales": 10, "ok": true}),
            json!({"region": "south", "sales": 2.5, "ok": false}),
        ];
        let df = values_to_dataframe(&rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("region").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("sales").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("ok").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn test_missing_keys_are_null() {
        let rows = vec![json!({"a": 1}), json!({"b": "x"})];
        let df = values_to_dataframe(&rows).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("a").unwrap().null_count(), 1);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_mixed_values_become_strings() {
        let rows = vec![json!({"v": 1}), json!({"v": "two"})];
        let df = values_to_dataframe(&rows).unwrap();
        let back = dataframe_to_values(&df).unwrap();
        assert_eq!(back[0]["v"], "1");
        assert_eq!(back[1]["v"], "two");
    }

    #[test]
    fn test_non_object_row_rejected() {
        let rows = vec![json!([1, 2])];
        let err = values_to_dataframe(&rows).unwrap_err();
        assert!(matches!(err, ChartspecError::DataError(_)));
    }
}
