//! Aggregation engine
//!
//! When aggregation is in effect every measure is summarized per dimension
//! combination before compilation, and the compiler binds the summarized
//! column (the directive's output alias) instead of the raw field.
//!
//! The engine itself sits behind the [`Aggregator`] trait; [`PolarsAggregator`]
//! is the default implementation over polars lazy frames.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::geom::Geometry;
use super::query::Query;
use crate::{naming, ChartspecError, Result};

// =============================================================================
// Operators and Directives
// =============================================================================

/// Aggregation operator applied to measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    #[default]
    Sum,
    Mean,
    Count,
}

impl AggregateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Mean => "mean",
            AggregateOp::Count => "count",
        }
    }

    /// Polars expression summarizing `field` with this operator
    pub fn expr(&self, field: &str) -> Expr {
        match self {
            AggregateOp::Sum => col(field).sum(),
            AggregateOp::Mean => col(field).mean(),
            AggregateOp::Count => col(field).count(),
        }
    }
}

impl std::fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AggregateOp {
    type Err = ChartspecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(AggregateOp::Sum),
            "mean" | "avg" => Ok(AggregateOp::Mean),
            "count" => Ok(AggregateOp::Count),
            other => Err(ChartspecError::ValidationError(format!(
                "Unknown aggregation operator '{}'. Expected one of: sum, mean, count",
                other
            ))),
        }
    }
}

/// How one measure is summarized and renamed when aggregation is in effect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationDirective {
    pub op: AggregateOp,
    /// Raw measure field id
    pub field: String,
    /// Output column of the summarized measure
    #[serde(rename = "as")]
    pub alias: String,
}

impl AggregationDirective {
    pub fn new(op: AggregateOp, field: impl Into<String>) -> Self {
        let field = field.into();
        let alias = naming::aggregate_alias(&field, op.as_str());
        Self { op, field, alias }
    }

    /// One directive per measure, all using the same operator
    pub fn for_measures(measures: &[String], op: AggregateOp) -> Vec<Self> {
        measures.iter().map(|m| Self::new(op, m.as_str())).collect()
    }
}

/// Find the directive summarizing `field`
pub fn find_directive<'a>(
    directives: &'a [AggregationDirective],
    field: &str,
) -> Option<&'a AggregationDirective> {
    directives.iter().find(|d| d.field == field)
}

// =============================================================================
// Aggregator Trait
// =============================================================================

/// Input to the aggregation engine
pub struct AggregationRequest<'a> {
    pub rows: &'a DataFrame,
    /// Grouping key
    pub dimensions: &'a [String],
    pub directives: &'a [AggregationDirective],
}

/// Trait for aggregation engines
///
/// Implementations group `rows` by the dimension key and summarize each measure,
/// returning the dimension columns followed by one aliased column per directive.
pub trait Aggregator {
    /// Aggregate a row table
    ///
    /// # Errors
    ///
    /// Returns `ChartspecError::AggregationError` if a referenced column does not
    /// exist or the engine fails. Callers must leave the chart unchanged.
    fn aggregate(&self, request: &AggregationRequest<'_>) -> Result<DataFrame>;
}

/// Aggregation over polars lazy frames.
///
/// Groups keep the order in which they first appear in the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarsAggregator;

impl PolarsAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl Aggregator for PolarsAggregator {
    fn aggregate(&self, request: &AggregationRequest<'_>) -> Result<DataFrame> {
        let available: Vec<String> = request
            .rows
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let referenced = request
            .dimensions
            .iter()
            .chain(request.directives.iter().map(|d| &d.field));
        for column in referenced {
            if !available.contains(column) {
                return Err(ChartspecError::AggregationError(format!(
                    "Column '{}' does not exist.\nAvailable columns: {}",
                    column,
                    available.join(", ")
                )));
            }
        }

        let keys: Vec<Expr> = request
            .dimensions
            .iter()
            .map(|d| col(d.as_str()))
            .collect();
        let aggs: Vec<Expr> = request
            .directives
            .iter()
            .map(|d| d.op.expr(&d.field).alias(d.alias.as_str()))
            .collect();

        let frame = request.rows.clone().lazy();
        let out = if keys.is_empty() {
            frame.select(aggs)
        } else {
            frame.group_by_stable(keys).agg(aggs)
        }
        .collect()
        .map_err(|e| ChartspecError::AggregationError(format!("Aggregation failed: {}", e)))?;

        tracing::debug!(
            rows_in = request.rows.height(),
            rows_out = out.height(),
            "aggregated row table"
        );
        Ok(out)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Produce the table the chart displays: aggregated when `aggregate` is set,
/// otherwise the rows unchanged.
pub fn prepare_table(
    aggregator: &dyn Aggregator,
    rows: &DataFrame,
    dimensions: &[String],
    directives: &[AggregationDirective],
    aggregate: bool,
) -> Result<DataFrame> {
    if !aggregate {
        return Ok(rows.clone());
    }
    aggregator.aggregate(&AggregationRequest {
        rows,
        dimensions,
        directives,
    })
}

/// Whether a query should be displayed pre-aggregated by default.
///
/// Scatter and density plots, and queries whose every position field is a
/// measure, show raw rows; everything else is aggregated.
pub fn recommend_aggregation(query: &Query, measures: &[String]) -> bool {
    if matches!(
        query.requested_geometry(),
        Some(Geometry::Point | Geometry::Density)
    ) {
        return false;
    }
    !query.position.iter().all(|f| measures.contains(f))
}
