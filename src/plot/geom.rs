//! Geometry selection
//!
//! Decides the effective mark family from the requested geometry and live data
//! statistics. Two requests are rewritten:
//!
//! - `interval` is resolved into `point`, `tick` or `boxplot` depending on how many
//!   distinct measure values a single dimension combination carries.
//! - `line` is downgraded to `area` when the rows cannot cover every combination of
//!   the discrete channels' values.
//!
//! Everything else passes through unchanged.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::query::Query;
use super::types::FieldIndex;
use crate::{ChartspecError, Result};

/// Average distinct count above which the statistical-summary mark is used
pub const BOXPLOT_THRESHOLD: f64 = 400.0;

/// Average distinct count above which ticks replace points
pub const TICK_THRESHOLD: f64 = 16.0;

/// Output column holding per-group distinct counts
const DISTINCT_COLUMN: &str = "__chartspec_distinct__";

// =============================================================================
// Geometry and Mark Types
// =============================================================================

/// Mark family requested by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    /// Generic "one value per category" family, resolved from data statistics
    Interval,
    Line,
    Point,
    Tick,
    Boxplot,
    Area,
    Density,
    Bar,
}

impl Geometry {
    /// Map a geometry to the mark type it renders as
    pub fn mark_type(&self) -> MarkType {
        match self {
            Geometry::Interval => MarkType::Tick,
            Geometry::Line => MarkType::Line,
            Geometry::Point => MarkType::Point,
            Geometry::Tick => MarkType::Tick,
            Geometry::Boxplot => MarkType::Boxplot,
            Geometry::Area => MarkType::Area,
            Geometry::Density => MarkType::Point,
            Geometry::Bar => MarkType::Bar,
        }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Geometry::Interval => "interval",
            Geometry::Line => "line",
            Geometry::Point => "point",
            Geometry::Tick => "tick",
            Geometry::Boxplot => "boxplot",
            Geometry::Area => "area",
            Geometry::Density => "density",
            Geometry::Bar => "bar",
        };
        write!(f, "{}", s)
    }
}

/// Vega-Lite mark types the compiler emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Point,
    Line,
    Bar,
    Tick,
    Boxplot,
    Area,
    Errorband,
}

impl std::fmt::Display for MarkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarkType::Point => "point",
            MarkType::Line => "line",
            MarkType::Bar => "bar",
            MarkType::Tick => "tick",
            MarkType::Boxplot => "boxplot",
            MarkType::Area => "area",
            MarkType::Errorband => "errorband",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Data statistics geometry selection reads from
pub struct GeometryInput<'a> {
    /// Rows as they will be displayed (aggregated if aggregation is in effect)
    pub rows: &'a DataFrame,
    /// Measure column names present in `rows`
    pub measures: &'a [String],
    /// Dimension column names forming the grouping key
    pub dimensions: &'a [String],
    pub query: &'a Query,
    pub fields: &'a FieldIndex<'a>,
}

/// Decide the effective geometry for a request
pub fn select_geometry(requested: Geometry, input: &GeometryInput<'_>) -> Result<Geometry> {
    let selected = match requested {
        Geometry::Interval => interval_geometry(input.rows, input.measures, input.dimensions)?,
        Geometry::Line => line_geometry(input.rows.height(), input.query, input.fields),
        other => other,
    };
    if selected != requested {
        tracing::debug!(%requested, %selected, "geometry rewritten from data statistics");
    }
    Ok(selected)
}

/// Resolve the `interval` family.
///
/// The first measure whose average distinct count crosses a threshold decides;
/// when none does the result is `point`. Measures missing from the table are skipped.
pub fn interval_geometry(
    rows: &DataFrame,
    measures: &[String],
    dimensions: &[String],
) -> Result<Geometry> {
    for measure in measures {
        if rows.column(measure).is_err() {
            tracing::debug!(measure = %measure, "measure column absent, skipped");
            continue;
        }
        let mean = mean_distinct_per_group(rows, dimensions, measure)?;
        if let Some(geometry) = classify_distinct_count(mean) {
            return Ok(geometry);
        }
    }
    Ok(Geometry::Point)
}

/// Threshold check for one measure's average distinct count
pub fn classify_distinct_count(mean: f64) -> Option<Geometry> {
    if mean > BOXPLOT_THRESHOLD {
        Some(Geometry::Boxplot)
    } else if mean > TICK_THRESHOLD {
        Some(Geometry::Tick)
    } else {
        None
    }
}

/// Average, over groups of the dimension key, of the number of distinct values
/// of `measure` within each group.
///
/// An empty dimension key puts every row into a single group. Dimensions that
/// are not columns of `rows` do not split groups.
pub fn mean_distinct_per_group(
    rows: &DataFrame,
    dimensions: &[String],
    measure: &str,
) -> Result<f64> {
    if rows.height() == 0 {
        return Ok(0.0);
    }

    let keys: Vec<Expr> = dimensions
        .iter()
        .filter(|d| rows.column(d).is_ok())
        .map(|d| col(d.as_str()))
        .collect();
    let distinct = col(measure).n_unique().alias(DISTINCT_COLUMN);

    let frame = rows.clone().lazy();
    let counts = if keys.is_empty() {
        frame.select([distinct])
    } else {
        frame.group_by(keys).agg([distinct])
    }
    .collect()
    .map_err(|e| {
        ChartspecError::DataError(format!(
            "Failed to count distinct values of '{}': {}",
            measure, e
        ))
    })?;

    let series = counts
        .column(DISTINCT_COLUMN)
        .map_err(|e| ChartspecError::DataError(format!("Missing distinct counts: {}", e)))?
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| ChartspecError::DataError(format!("Failed to cast counts: {}", e)))?;

    Ok(series.mean().unwrap_or(0.0))
}

/// Downgrade `line` to `area` when the data is sparse.
///
/// The cross product of the distinct counts of every discrete field the query
/// mentions is compared to the row count; fewer rows than combinations means a
/// line would be drawn with gaps. Fields unknown to the registry do not count.
pub fn line_geometry(row_count: usize, query: &Query, fields: &FieldIndex<'_>) -> Geometry {
    let combinations = query
        .role_fields()
        .filter_map(|id| fields.get(id))
        .filter(|meta| meta.semantic_type.is_discrete())
        .fold(1u64, |acc, meta| acc.saturating_mul(meta.unique_count));

    if (row_count as u64) < combinations {
        Geometry::Area
    } else {
        Geometry::Line
    }
}
