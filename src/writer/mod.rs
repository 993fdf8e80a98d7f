//! Output writer abstraction layer
//!
//! The writer module provides a pluggable interface for turning a chart request
//! plus its rows into a rendering-library document.
//!
//! # Architecture
//!
//! All writers implement the `Writer` trait, which provides:
//! - Request + Data → Output conversion
//! - Validation for writer compatibility
//!
//! # Example
//!
//! ```rust,ignore
//! use chartspec::writer::{Writer, VegaLiteWriter};
//!
//! let writer = VegaLiteWriter::new();
//! let json = writer.write(&request, &rows)?;
//! println!("{}", json);
//! ```

use polars::prelude::DataFrame;

use crate::plot::query::ChartRequest;
use crate::Result;

pub mod vegalite;

pub use vegalite::{CompileOptions, VegaLiteWriter};

/// Trait for visualization output writers
///
/// # Associated Types
///
/// * `Output` - The type returned by `write()`. Text writers use `String`.
pub trait Writer {
    /// The output type produced by this writer.
    type Output;

    /// Generate output from a chart request and the rows it displays
    ///
    /// # Errors
    ///
    /// Returns `ChartspecError::ValidationError` if the request is not
    /// renderable, or the error of whichever compilation step failed.
    fn write(&self, request: &ChartRequest, data: &DataFrame) -> Result<Self::Output>;

    /// Validate that a request can be rendered by this writer
    ///
    /// Checks compatibility without generating output.
    fn validate(&self, request: &ChartRequest) -> Result<()>;
}
