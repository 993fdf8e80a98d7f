//! Specification assembly
//!
//! Builds the document from channel bindings and the effective geometry by
//! running a fixed sequence of rules. Each rule takes the view built so far and
//! returns a new one; later rules depend on the shape produced by earlier ones,
//! so the order below is part of the contract:
//!
//! 1. base mark + encoding from the bindings
//! 2. single-axis histogram
//! 3. constant opacity when stacking is off
//! 4. boxplot color moved to the column facet
//! 5. line → line/raw/errorband composite
//! 6. pan/zoom parameter

use crate::plot::aggregate::AggregateOp;
use crate::plot::channel::ChannelBinding;
use crate::plot::geom::{Geometry, MarkType};
use crate::plot::query::{Channel, Query};
use crate::plot::types::SemanticType;

use super::spec::{ChannelDef, DataRef, Encoding, Mark, Param, Specification, UnitSpec, ViewBody};

/// Opacity of the base mark
pub const MARK_OPACITY: f64 = 0.88;

/// Constant opacity applied when marks overlap instead of stacking
pub const UNSTACKED_OPACITY: f64 = 0.7;

/// Opacity of the errorband layer of a line composite
pub const ERRORBAND_OPACITY: f64 = 0.6;

/// Flags the assembly rules read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssembleFlags {
    pub default_stack: bool,
    pub zoom: bool,
}

/// Assemble a specification.
///
/// Absent channels are omitted. A query without any resolvable channel yields a
/// specification with no mark, which callers must not embed.
pub fn assemble(
    bindings: &[ChannelBinding],
    geometry: Geometry,
    data: DataRef,
    query: &Query,
    flags: AssembleFlags,
) -> Specification {
    if bindings.is_empty() {
        tracing::warn!("query has no resolvable channels, emitting an empty specification");
        return Specification::empty(data);
    }

    let unit = base_unit(bindings, geometry.mark_type());
    let unit = single_axis_histogram(unit);
    let unit = default_opacity(unit, query, flags);
    let unit = boxplot_color_as_column(unit, bindings, query);
    let spec = line_composite(unit, bindings, data);
    with_zoom(spec, flags)
}

// =============================================================================
// Rules
// =============================================================================

/// Rule 1: one encoding entry per binding
fn base_unit(bindings: &[ChannelBinding], mark_type: MarkType) -> UnitSpec {
    let mut encoding = Encoding::default();
    for binding in bindings {
        encoding.set(binding.channel, ChannelDef::from(binding));
    }
    UnitSpec {
        mark: Mark::new(mark_type)
            .with_tooltip()
            .with_opacity(MARK_OPACITY),
        encoding,
    }
}

/// Rule 2: a lone axis becomes a binned axis against a row count, drawn as bars
fn single_axis_histogram(unit: UnitSpec) -> UnitSpec {
    let (binned, counted) = match (
        unit.encoding.contains(Channel::X),
        unit.encoding.contains(Channel::Y),
    ) {
        (true, false) => (Channel::X, Channel::Y),
        (false, true) => (Channel::Y, Channel::X),
        _ => return unit,
    };

    let mut encoding = unit.encoding;
    if let Some(def) = encoding.get_mut(binned) {
        def.bin = Some(true);
    }
    encoding.set(counted, ChannelDef::count());
    tracing::debug!(axis = %binned, "single axis query rendered as histogram");

    UnitSpec {
        mark: Mark {
            mark_type: MarkType::Bar,
            ..unit.mark
        },
        encoding,
    }
}

/// Rule 3: overlapping unstacked marks get a constant opacity
fn default_opacity(unit: UnitSpec, query: &Query, flags: AssembleFlags) -> UnitSpec {
    if flags.default_stack || query.has_opacity() {
        return unit;
    }
    let mut encoding = unit.encoding;
    encoding.set(Channel::Opacity, ChannelDef::constant(UNSTACKED_OPACITY));
    UnitSpec { encoding, ..unit }
}

/// Rule 4: color-encoded boxplots are recomposed as small multiples
fn boxplot_color_as_column(unit: UnitSpec, bindings: &[ChannelBinding], query: &Query) -> UnitSpec {
    let nominal_color = bindings
        .iter()
        .any(|b| b.channel == Channel::Color && b.semantic_type == SemanticType::Nominal);
    if unit.mark.mark_type != MarkType::Boxplot || !nominal_color || query.has_facets() {
        return unit;
    }

    let mut encoding = unit.encoding;
    if let Some(color) = encoding.take(Channel::Color) {
        encoding.set(Channel::Column, color);
    }
    UnitSpec { encoding, ..unit }
}

/// Rule 5: lines become mean trend + raw line + errorband
fn line_composite(unit: UnitSpec, bindings: &[ChannelBinding], data: DataRef) -> Specification {
    if unit.mark.mark_type != MarkType::Line {
        return Specification::unit(data, unit);
    }

    let mut trend = unit.clone();
    for binding in bindings.iter().filter(|b| b.is_quantitative_measure()) {
        if let Some(def) = trend.encoding.get_mut(binding.channel) {
            def.aggregate = Some(AggregateOp::Mean);
        }
    }

    let band = UnitSpec {
        mark: Mark::new(MarkType::Errorband).with_opacity(ERRORBAND_OPACITY),
        encoding: unit.encoding.clone(),
    };

    Specification {
        body: ViewBody::Layer(vec![trend, unit, band]),
        ..Specification::empty(data)
    }
}

/// Rule 6: pan/zoom bound to both axis scales
fn with_zoom(spec: Specification, flags: AssembleFlags) -> Specification {
    if !flags.zoom {
        return spec;
    }
    let mut params = spec.params;
    params.push(Param::zoom());
    Specification { params, ..spec }
}
