//! Vega-Lite compiler
//!
//! Compiles a [`ChartRequest`] plus the rows it displays into a Vega-Lite v5
//! [`Specification`].
//!
//! # Pipeline
//!
//! ```text
//! request ─┬─ aggregation directives ─┐
//!          ├─ geometry selection ─────┼─ assemble ─ sizing ─ Specification
//! rows ────┴─ channel mapping ────────┘
//! ```
//!
//! Every step is synchronous and side-effect-free, so compiling the same inputs
//! twice yields identical specifications.
//!
//! # Example
//!
//! ```rust,ignore
//! use chartspec::writer::VegaLiteWriter;
//!
//! let writer = VegaLiteWriter::new();
//! let spec = writer.compile(&request, &rows)?;
//! println!("{}", spec.to_json_string(true)?);
//! ```

pub mod assemble;
pub mod spec;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::data::dataframe_to_values;
use crate::plot::aggregate::{
    self, recommend_aggregation, AggregateOp, AggregationDirective, Aggregator,
};
use crate::plot::channel::{map_channels, MapOptions};
use crate::plot::geom::{select_geometry, Geometry, GeometryInput};
use crate::plot::layout::{apply_sizing, SizingConfig};
use crate::plot::query::ChartRequest;
use crate::writer::Writer;
use crate::{ChartspecError, Result};

use assemble::{assemble, AssembleFlags};
use spec::{DataRef, Specification};

// =============================================================================
// Options
// =============================================================================

/// Compilation options, loadable from a JSON config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Bind measures to their aggregate aliases and aggregate rows before display.
    /// Unset means the query decides, see [`recommend_aggregation`].
    pub default_aggregated: Option<bool>,
    /// Let quantitative axes stack
    pub default_stack: bool,
    /// Operator used for every measure's aggregation directive
    pub aggregator: AggregateOp,
    /// Attach pan/zoom to the axis scales
    pub zoom: bool,
    pub sizing: SizingConfig,
    /// Embed rows into the document instead of referencing the named dataset
    pub inline_data: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_aggregated: None,
            default_stack: true,
            aggregator: AggregateOp::Sum,
            zoom: false,
            sizing: SizingConfig::default(),
            inline_data: false,
        }
    }
}

impl CompileOptions {
    /// Whether `request` is displayed aggregated: the explicit choice if any,
    /// otherwise the recommendation for its query
    pub fn aggregated(&self, request: &ChartRequest) -> bool {
        self.default_aggregated
            .unwrap_or_else(|| recommend_aggregation(&request.query, &request.measures))
    }

    pub fn map_options(&self, request: &ChartRequest) -> MapOptions {
        MapOptions {
            default_aggregated: self.aggregated(request),
            default_stack: self.default_stack,
        }
    }

    pub fn assemble_flags(&self) -> AssembleFlags {
        AssembleFlags {
            default_stack: self.default_stack,
            zoom: self.zoom,
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Vega-Lite writer
///
/// Generates Vega-Lite v5 specifications from chart requests and row tables.
#[derive(Debug, Clone, Default)]
pub struct VegaLiteWriter {
    options: CompileOptions,
}

impl VegaLiteWriter {
    /// Create a new Vega-Lite writer with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// One directive per measure of the request, using the configured operator
    pub fn directives(&self, request: &ChartRequest) -> Vec<AggregationDirective> {
        AggregationDirective::for_measures(&request.measures, self.options.aggregator)
    }

    /// Produce the table a request displays.
    ///
    /// Rows are aggregated over the request's dimensions when aggregation is
    /// in effect for the request, and returned unchanged otherwise.
    ///
    /// # Errors
    ///
    /// Propagates `ChartspecError::AggregationError` from the engine.
    pub fn prepare_table(
        &self,
        aggregator: &dyn Aggregator,
        request: &ChartRequest,
        rows: &DataFrame,
    ) -> Result<DataFrame> {
        aggregate::prepare_table(
            aggregator,
            rows,
            &request.dimensions,
            &self.directives(request),
            self.options.aggregated(request),
        )
    }

    /// Mark family chosen for a request from the statistics of `table`.
    ///
    /// `None` when the query requests no geometry.
    pub fn effective_geometry(
        &self,
        request: &ChartRequest,
        table: &DataFrame,
    ) -> Result<Option<Geometry>> {
        let Some(requested) = request.query.requested_geometry() else {
            return Ok(None);
        };

        let measures: Vec<String> = if self.options.aggregated(request) {
            self.directives(request)
                .into_iter()
                .map(|d| d.alias)
                .collect()
        } else {
            request.measures.clone()
        };

        let fields = request.field_index();
        let geometry = select_geometry(
            requested,
            &GeometryInput {
                rows: table,
                measures: &measures,
                dimensions: &request.dimensions,
                query: &request.query,
                fields: &fields,
            },
        )?;
        Ok(Some(geometry))
    }

    /// Compile a request against the rows it displays.
    ///
    /// `table` must already be aggregated when aggregation is in effect; see
    /// [`VegaLiteWriter::prepare_table`]. A request without any resolvable
    /// channel compiles to a specification without a mark.
    #[tracing::instrument(skip_all, fields(geometry = ?request.query.requested_geometry()))]
    pub fn compile(&self, request: &ChartRequest, table: &DataFrame) -> Result<Specification> {
        let options = &self.options;
        let query = &request.query;
        let fields = request.field_index();

        let data = if options.inline_data {
            DataRef::inline(dataframe_to_values(table)?)
        } else {
            DataRef::default()
        };

        let Some(geometry) = self.effective_geometry(request, table)? else {
            tracing::warn!("query requests no geometry, emitting an empty specification");
            return Ok(Specification::empty(data));
        };

        let directives = self.directives(request);
        let bindings = map_channels(query, &directives, &fields, options.map_options(request));
        let spec = assemble(&bindings, geometry, data, query, options.assemble_flags());
        let has_facets = spec.has_facets();
        Ok(apply_sizing(spec, &options.sizing, has_facets))
    }
}

impl Writer for VegaLiteWriter {
    type Output = String;

    fn write(&self, request: &ChartRequest, data: &DataFrame) -> Result<Self::Output> {
        self.validate(request)?;
        self.compile(request, data)?.to_json_string(false)
    }

    fn validate(&self, request: &ChartRequest) -> Result<()> {
        if request.query.geometry.is_empty() {
            return Err(ChartspecError::ValidationError(
                "Query requests no geometry".to_string(),
            ));
        }
        if request.query.bindings().next().is_none() {
            return Err(ChartspecError::ValidationError(
                "Query binds no field to any channel".to_string(),
            ));
        }
        Ok(())
    }
}
