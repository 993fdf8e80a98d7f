//! Layout sizing
//!
//! Derives the spec's sizing fields (`width`, `height`, `autosize`) from a sizing
//! mode. Sizing never touches marks or encodings.
//!
//! With facets, `width`/`height` describe a single cell, and `autosize: fit` is not
//! available for faceted views, so the canvas-fitting form is only used when the
//! chart has no facets.

use serde::{Deserialize, Serialize};

use crate::writer::vegalite::spec::{Autosize, Extent, Specification};

/// Step size used when step sizing is requested without an explicit step
pub const DEFAULT_STEP_SIZE: u32 = 20;

/// How chart dimensions are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Renderer computes the size
    #[default]
    Auto,
    /// Explicit pixel width and height
    Fixed,
    /// Width follows the number of categories times a per-category step
    Step,
}

/// Sizing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SizingConfig {
    pub mode: SizeMode,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub step_size: Option<u32>,
}

impl SizingConfig {
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            mode: SizeMode::Fixed,
            width: Some(width),
            height: Some(height),
            step_size: None,
        }
    }

    pub fn step(step_size: u32) -> Self {
        Self {
            mode: SizeMode::Step,
            step_size: Some(step_size),
            ..Default::default()
        }
    }
}

/// Apply a sizing configuration to a specification.
///
/// Existing sizing fields are replaced; a `fixed` config without both
/// dimensions falls back to renderer sizing.
pub fn apply_sizing(spec: Specification, config: &SizingConfig, has_facets: bool) -> Specification {
    let (width, height, autosize) = match config.mode {
        SizeMode::Auto => (None, None, None),
        SizeMode::Fixed => match (config.width, config.height) {
            (Some(w), Some(h)) => {
                let autosize = (!has_facets).then(Autosize::fit);
                (Some(Extent::Pixels(w)), Some(Extent::Pixels(h)), autosize)
            }
            _ => {
                tracing::warn!("fixed sizing requested without width and height, using auto");
                (None, None, None)
            }
        },
        SizeMode::Step => {
            let step = config.step_size.unwrap_or(DEFAULT_STEP_SIZE);
            (
                Some(Extent::Step { step }),
                config.height.map(Extent::Pixels),
                None,
            )
        }
    };

    Specification {
        width,
        height,
        autosize,
        ..spec
    }
}
