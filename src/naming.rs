//! Centralized naming conventions for chartspec-generated identifiers.
//!
//! Everything the compiler invents (dataset names, aggregate aliases, parameter
//! names, placeholder titles) is defined here so the compiler, the render session
//! and the tests agree on a single spelling.
//!
//! # Categories
//!
//! - **Datasets**: The named dataset rows are pushed into (`dataSource`)
//! - **Aggregate aliases**: Output columns of the aggregation engine (`<field>_<op>`)
//! - **Parameters**: Interaction parameters attached to the spec (`grid`)
//! - **Schema**: The Vega-Lite JSON schema URL stamped on every document

use const_format::concatcp;

// ============================================================================
// Base Building Blocks
// ============================================================================

/// Base URL of the published Vega-Lite schemas
const VEGA_LITE_SCHEMA_BASE: &str = "https://vega.github.io/schema/vega-lite/";

/// Schema version the compiler targets
const VEGA_LITE_VERSION: &str = "v5";

// ============================================================================
// Derived Constants
// ============================================================================

/// Full `$schema` URL for emitted specifications
pub const VEGA_LITE_SCHEMA: &str = concatcp!(VEGA_LITE_SCHEMA_BASE, VEGA_LITE_VERSION, ".json");

/// Name of the dataset a live chart receives its rows through.
/// The spec references it by name; the render session replaces its contents.
pub const DATA_SOURCE: &str = "dataSource";

/// Title used when a channel references a field the registry does not know
pub const UNKNOWN_TITLE: &str = "_";

/// Name of the pan/zoom interval parameter bound to the axis scales
pub const ZOOM_PARAM: &str = "grid";

/// Renderer mode passed along with every embed request
pub const EMBED_MODE: &str = "vega-lite";

// ============================================================================
// Constructor Functions
// ============================================================================

/// Output column name for an aggregated measure.
///
/// Format: `<field>_<op>`
///
/// # Example
/// ```
/// use chartspec::naming;
/// assert_eq!(naming::aggregate_alias("sales", "sum"), "sales_sum");
/// ```
pub fn aggregate_alias(field: &str, op: &str) -> String {
    format!("{}_{}", field, op)
}
