//! Chart request types and the compiler's analysis stages
//!
//! This module contains the types describing what a chart should show and the
//! pure stages that turn them into channel bindings, a mark and sizing.
//!
//! # Architecture
//!
//! The module is organized into submodules:
//!
//! - `types` - Field metadata consumed from the registry
//! - `query` - Role assignment (`Query`) and the full `ChartRequest`
//! - `aggregate` - Aggregation directives and the aggregation engine
//! - `geom` - Geometry selection from data statistics
//! - `channel` - Channel mapping
//! - `layout` - Sizing modes

pub mod aggregate;
pub mod channel;
pub mod geom;
pub mod layout;
pub mod query;
pub mod types;

// Re-export all types for convenience
pub use aggregate::{
    prepare_table, recommend_aggregation, AggregateOp, AggregationDirective, AggregationRequest,
    Aggregator, PolarsAggregator,
};
pub use channel::{map_channels, ChannelBinding, MapOptions, SortDef, SortOrder, Stack};
pub use geom::{select_geometry, Geometry, GeometryInput, MarkType};
pub use layout::{apply_sizing, SizeMode, SizingConfig};
pub use query::{Channel, ChartRequest, Query};
pub use types::{AnalyticType, FieldIndex, FieldMeta, SemanticType};
