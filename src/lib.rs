/*!
# chartspec - Analytic Chart Specification Compiler

Compiles abstract analytic chart queries into Vega-Lite specifications and
manages the lifecycle of the live charts they are embedded in.

A query only says which fields play which visual role and which mark family is
wanted:

```json
{
  "position": ["region", "sales"],
  "color": ["year"],
  "geometry": ["interval"]
}
```

The compiler combines it with field metadata and the displayed rows to pick a
concrete mark, resolve each channel and emit a document the rendering library
accepts as-is.

## Architecture

- **Plot** → request types plus the analysis stages (geometry selection,
  channel mapping, sizing, aggregation)
- **Writer** → assembles the Vega-Lite document
- **Render** → owns one live chart per session, re-embedding on input changes

## Core Components

- [`plot`] - Queries, field metadata and analysis stages
- [`writer`] - Output format abstraction layer
- [`render`] - Render session state machine
- [`data`] - Row table ↔ JSON conversion
*/

pub mod data;
pub mod naming;
pub mod plot;
pub mod render;
pub mod writer;

// Re-export key types for convenience
pub use plot::{ChartRequest, FieldMeta, Geometry, Query};
pub use render::{ChartView, RenderOptions, RenderSession};
pub use writer::vegalite::spec::Specification;
pub use writer::{CompileOptions, VegaLiteWriter, Writer};

// DataFrame abstraction (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum ChartspecError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Aggregation error: {0}")]
    AggregationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Embedding error: {0}")]
    EmbedError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ChartspecError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
