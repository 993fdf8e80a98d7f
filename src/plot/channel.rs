//! Channel mapping
//!
//! Resolves a query's role lists into one binding per channel and decorates each
//! binding with what the encoding needs: the column to read (raw field or its
//! aggregate alias), semantic type, title, stacking and sort order.

use serde::{Deserialize, Serialize, Serializer};

use super::aggregate::{find_directive, AggregateOp, AggregationDirective};
use super::query::{Channel, Query};
use super::types::{AnalyticType, FieldIndex, SemanticType};

/// Nominal axes with at most this many categories keep their natural order
const SORT_MIN_CATEGORIES: u64 = 2;

// =============================================================================
// Binding Modifiers
// =============================================================================

/// Stacking behaviour of a quantitative axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stack {
    /// Renderer default (omitted from the encoding)
    #[default]
    Auto,
    /// Marks are drawn from zero without stacking (`stack: null`)
    Disabled,
}

impl Stack {
    pub fn is_auto(&self) -> bool {
        matches!(self, Stack::Auto)
    }
}

impl Serialize for Stack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Auto is skipped by the containing struct; null is the only emitted form
        serializer.serialize_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort of a categorical axis by an aggregate of another field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SortDef {
    pub field: String,
    pub op: AggregateOp,
    pub order: SortOrder,
}

// =============================================================================
// Channel Binding
// =============================================================================

/// One resolved channel. Lives only for the duration of a compilation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBinding {
    pub channel: Channel,
    /// Field id as written in the query
    pub field_id: String,
    /// Column the encoding reads (the aggregate alias when substituted)
    pub field: String,
    pub semantic_type: SemanticType,
    pub title: String,
    /// `None` when the registry does not know the field
    pub analytic_type: Option<AnalyticType>,
    pub stack: Stack,
    pub sort: Option<SortDef>,
}

impl ChannelBinding {
    /// Known quantitative measure
    pub fn is_quantitative_measure(&self) -> bool {
        self.semantic_type == SemanticType::Quantitative
            && self.analytic_type == Some(AnalyticType::Measure)
    }
}

/// Find the binding of a channel
pub fn find_binding(bindings: &[ChannelBinding], channel: Channel) -> Option<&ChannelBinding> {
    bindings.iter().find(|b| b.channel == channel)
}

/// Flags controlling channel resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    /// Bind measures to their aggregate aliases
    pub default_aggregated: bool,
    /// Let quantitative axes stack
    pub default_stack: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            default_aggregated: true,
            default_stack: true,
        }
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Resolve the query's role lists into channel bindings.
///
/// Unset slots are skipped; unknown field ids resolve to nominal with the
/// placeholder title.
pub fn map_channels(
    query: &Query,
    directives: &[AggregationDirective],
    fields: &FieldIndex<'_>,
    options: MapOptions,
) -> Vec<ChannelBinding> {
    let mut bindings: Vec<ChannelBinding> = query
        .bindings()
        .map(|(channel, id)| {
            let field = if options.default_aggregated {
                find_directive(directives, id)
                    .map(|d| d.alias.clone())
                    .unwrap_or_else(|| id.to_string())
            } else {
                id.to_string()
            };
            let semantic_type = fields.semantic_type(id);
            let stack = if channel.is_position()
                && semantic_type == SemanticType::Quantitative
                && !options.default_stack
            {
                Stack::Disabled
            } else {
                Stack::Auto
            };
            ChannelBinding {
                channel,
                field_id: id.to_string(),
                field,
                semantic_type,
                title: fields.title(id),
                analytic_type: fields.get(id).map(|m| m.analytic_type),
                stack,
                sort: None,
            }
        })
        .collect();

    for axis in [Channel::X, Channel::Y] {
        if let Some(sort) = pareto_sort(&bindings, axis, fields) {
            if let Some(binding) = bindings.iter_mut().find(|b| b.channel == axis) {
                binding.sort = Some(sort);
            }
        }
    }

    bindings
}

/// Descending count sort for a many-category nominal axis plotted against a
/// quantitative one.
fn pareto_sort(
    bindings: &[ChannelBinding],
    axis: Channel,
    fields: &FieldIndex<'_>,
) -> Option<SortDef> {
    let target = find_binding(bindings, axis)?;
    let other = find_binding(bindings, axis.other_axis()?)?;
    let target_meta = fields.get(&target.field_id)?;
    let other_meta = fields.get(&other.field_id)?;

    let applies = target_meta.semantic_type == SemanticType::Nominal
        && target_meta.unique_count > SORT_MIN_CATEGORIES
        && other_meta.semantic_type == SemanticType::Quantitative;

    applies.then(|| SortDef {
        field: other.field.clone(),
        op: AggregateOp::Count,
        order: SortOrder::Descending,
    })
}
