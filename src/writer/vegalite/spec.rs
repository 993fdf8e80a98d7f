//! Vega-Lite specification model
//!
//! Typed counterpart of the subset of the Vega-Lite schema the compiler emits:
//! single views (`mark` + `encoding`), layered views (`layer`), sizing fields and
//! interaction parameters. Values are immutable once produced; assembly rules
//! build new values instead of patching shared ones.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::naming;
use crate::plot::aggregate::AggregateOp;
use crate::plot::channel::ChannelBinding;
pub use crate::plot::channel::{SortDef, Stack};
use crate::plot::geom::MarkType;
use crate::plot::query::Channel;
use crate::plot::types::SemanticType;
use crate::{ChartspecError, Result};

// =============================================================================
// Data and Sizing
// =============================================================================

/// Where a view reads its rows from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataRef {
    /// Named dataset filled in by the live chart
    Named { name: String },
    /// Rows embedded in the document
    Inline { values: Vec<Value> },
}

impl DataRef {
    pub fn named(name: impl Into<String>) -> Self {
        DataRef::Named { name: name.into() }
    }

    pub fn inline(values: Vec<Value>) -> Self {
        DataRef::Inline { values }
    }
}

impl Default for DataRef {
    fn default() -> Self {
        DataRef::named(naming::DATA_SOURCE)
    }
}

/// Width or height of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Extent {
    Pixels(u32),
    /// Size per discrete category
    Step { step: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Autosize {
    #[serde(rename = "type")]
    pub kind: String,
    pub contains: String,
}

impl Autosize {
    /// Fit the whole canvas, padding included, into width x height
    pub fn fit() -> Self {
        Self {
            kind: "fit".to_string(),
            contains: "padding".to_string(),
        }
    }
}

// =============================================================================
// Mark and Encoding
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Mark {
    pub fn new(mark_type: MarkType) -> Self {
        Self {
            mark_type,
            tooltip: None,
            opacity: None,
        }
    }

    pub fn with_tooltip(mut self) -> Self {
        self.tooltip = Some(true);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

/// Definition of one encoding channel (field definition or constant value)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChannelDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Stack::is_auto")]
    pub stack: Stack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl ChannelDef {
    /// Row-count aggregate with no field
    pub fn count() -> Self {
        Self {
            aggregate: Some(AggregateOp::Count),
            ..Default::default()
        }
    }

    /// Constant channel value
    pub fn constant(value: f64) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

impl From<&ChannelBinding> for ChannelDef {
    fn from(binding: &ChannelBinding) -> Self {
        Self {
            field: Some(binding.field.clone()),
            semantic_type: Some(binding.semantic_type),
            title: Some(binding.title.clone()),
            stack: binding.stack,
            sort: binding.sort.clone(),
            ..Default::default()
        }
    }
}

/// Channel → definition table of a view
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<ChannelDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<ChannelDef>,
}

impl Encoding {
    fn slot(&self, channel: Channel) -> &Option<ChannelDef> {
        match channel {
            Channel::X => &self.x,
            Channel::Y => &self.y,
            Channel::Color => &self.color,
            Channel::Size => &self.size,
            Channel::Opacity => &self.opacity,
            Channel::Row => &self.row,
            Channel::Column => &self.column,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<ChannelDef> {
        match channel {
            Channel::X => &mut self.x,
            Channel::Y => &mut self.y,
            Channel::Color => &mut self.color,
            Channel::Size => &mut self.size,
            Channel::Opacity => &mut self.opacity,
            Channel::Row => &mut self.row,
            Channel::Column => &mut self.column,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelDef> {
        self.slot(channel).as_ref()
    }

    pub fn get_mut(&mut self, channel: Channel) -> Option<&mut ChannelDef> {
        self.slot_mut(channel).as_mut()
    }

    pub fn set(&mut self, channel: Channel, def: ChannelDef) {
        *self.slot_mut(channel) = Some(def);
    }

    pub fn take(&mut self, channel: Channel) -> Option<ChannelDef> {
        self.slot_mut(channel).take()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.slot(channel).is_some()
    }

    /// Channels with a definition, in encoding order
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels().is_empty()
    }
}

/// One mark + encoding block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSpec {
    pub mark: Mark,
    pub encoding: Encoding,
}

// =============================================================================
// Parameters
// =============================================================================

/// Interaction parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Param {
    pub name: String,
    pub select: String,
    pub bind: String,
}

impl Param {
    /// Interval selection bound to the x/y scales: pan and zoom
    pub fn zoom() -> Self {
        Self {
            name: naming::ZOOM_PARAM.to_string(),
            select: "interval".to_string(),
            bind: "scales".to_string(),
        }
    }
}

// =============================================================================
// Specification
// =============================================================================

/// View composition of a specification
#[derive(Debug, Clone, PartialEq)]
pub enum ViewBody {
    /// No resolvable channel; nothing to render
    Empty,
    Unit(UnitSpec),
    /// Layers share one coordinate space
    Layer(Vec<UnitSpec>),
}

/// A complete Vega-Lite document
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub schema: String,
    pub data: DataRef,
    pub body: ViewBody,
    pub width: Option<Extent>,
    pub height: Option<Extent>,
    pub autosize: Option<Autosize>,
    pub params: Vec<Param>,
}

impl Specification {
    /// Specification with no mark
    pub fn empty(data: DataRef) -> Self {
        Self {
            schema: naming::VEGA_LITE_SCHEMA.to_string(),
            data,
            body: ViewBody::Empty,
            width: None,
            height: None,
            autosize: None,
            params: Vec::new(),
        }
    }

    pub fn unit(data: DataRef, unit: UnitSpec) -> Self {
        Self {
            body: ViewBody::Unit(unit),
            ..Self::empty(data)
        }
    }

    /// Whether the document has anything to draw
    pub fn has_mark(&self) -> bool {
        match &self.body {
            ViewBody::Empty => false,
            ViewBody::Unit(_) => true,
            ViewBody::Layer(layers) => !layers.is_empty(),
        }
    }

    /// Whether any view encodes a `row` or `column` facet
    pub fn has_facets(&self) -> bool {
        let faceted =
            |u: &UnitSpec| u.encoding.contains(Channel::Row) || u.encoding.contains(Channel::Column);
        match &self.body {
            ViewBody::Empty => false,
            ViewBody::Unit(unit) => faceted(unit),
            ViewBody::Layer(layers) => layers.iter().any(faceted),
        }
    }

    pub fn is_layered(&self) -> bool {
        matches!(self.body, ViewBody::Layer(_))
    }

    /// The single view, if this is not a layered document
    pub fn as_unit(&self) -> Option<&UnitSpec> {
        match &self.body {
            ViewBody::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn layers(&self) -> &[UnitSpec] {
        match &self.body {
            ViewBody::Layer(layers) => layers,
            _ => &[],
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| {
            ChartspecError::InternalError(format!("Failed to serialize specification: {}", e))
        })
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let out = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        out.map_err(|e| {
            ChartspecError::InternalError(format!("Failed to serialize specification: {}", e))
        })
    }
}

impl Serialize for Specification {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("$schema", &self.schema)?;
        map.serialize_entry("data", &self.data)?;
        match &self.body {
            ViewBody::Empty => {}
            ViewBody::Unit(unit) => {
                map.serialize_entry("mark", &unit.mark)?;
                map.serialize_entry("encoding", &unit.encoding)?;
            }
            ViewBody::Layer(layers) => {
                map.serialize_entry("layer", layers)?;
            }
        }
        if let Some(width) = &self.width {
            map.serialize_entry("width", width)?;
        }
        if let Some(height) = &self.height {
            map.serialize_entry("height", height)?;
        }
        if let Some(autosize) = &self.autosize {
            map.serialize_entry("autosize", autosize)?;
        }
        if !self.params.is_empty() {
            map.serialize_entry("params", &self.params)?;
        }
        map.end()
    }
}
