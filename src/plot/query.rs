//! Analytic query types
//!
//! A [`Query`] says which fields play which visual roles. It is produced by
//! the caller (recommendation engine, UI) and passed by value into the compiler.

use serde::{Deserialize, Serialize};

use super::geom::Geometry;
use super::types::{AnalyticType, FieldIndex, FieldMeta};

// =============================================================================
// Channels
// =============================================================================

/// A visual role a field can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    X,
    Y,
    Color,
    Size,
    Opacity,
    Row,
    Column,
}

impl Channel {
    /// All channels in encoding order
    pub const ALL: [Channel; 7] = [
        Channel::X,
        Channel::Y,
        Channel::Color,
        Channel::Size,
        Channel::Opacity,
        Channel::Row,
        Channel::Column,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Color => "color",
            Channel::Size => "size",
            Channel::Opacity => "opacity",
            Channel::Row => "row",
            Channel::Column => "column",
        }
    }

    /// Whether this channel is an axis (x or y)
    pub fn is_position(&self) -> bool {
        matches!(self, Channel::X | Channel::Y)
    }

    pub fn is_facet(&self) -> bool {
        matches!(self, Channel::Row | Channel::Column)
    }

    /// The opposite axis for x/y, `None` for every other channel
    pub fn other_axis(&self) -> Option<Channel> {
        match self {
            Channel::X => Some(Channel::Y),
            Channel::Y => Some(Channel::X),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Query
// =============================================================================

/// Role assignment of fields, one list per role.
///
/// Empty lists are serialized rather than omitted so two queries diff stably.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// `[x, y]`
    #[serde(default)]
    pub position: Vec<String>,
    #[serde(default)]
    pub color: Vec<String>,
    #[serde(default)]
    pub size: Vec<String>,
    #[serde(default)]
    pub opacity: Vec<String>,
    /// `[row, column]`
    #[serde(default)]
    pub facets: Vec<String>,
    /// Requested mark family; only the first entry is used
    #[serde(default, alias = "geomType")]
    pub geometry: Vec<Geometry>,
}

impl Query {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: vec![geometry],
            ..Default::default()
        }
    }

    pub fn with_position(mut self, fields: &[&str]) -> Self {
        self.position = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_color(mut self, field: &str) -> Self {
        self.color = vec![field.to_string()];
        self
    }

    pub fn with_size(mut self, field: &str) -> Self {
        self.size = vec![field.to_string()];
        self
    }

    pub fn with_opacity(mut self, field: &str) -> Self {
        self.opacity = vec![field.to_string()];
        self
    }

    pub fn with_facets(mut self, fields: &[&str]) -> Self {
        self.facets = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Field bound to a channel, if that slot is set
    pub fn field(&self, channel: Channel) -> Option<&str> {
        let slot = match channel {
            Channel::X => self.position.first(),
            Channel::Y => self.position.get(1),
            Channel::Color => self.color.first(),
            Channel::Size => self.size.first(),
            Channel::Opacity => self.opacity.first(),
            Channel::Row => self.facets.first(),
            Channel::Column => self.facets.get(1),
        };
        slot.map(String::as_str).filter(|f| !f.is_empty())
    }

    /// Every set slot flattened into `(channel, field)` pairs, in encoding order
    pub fn bindings(&self) -> impl Iterator<Item = (Channel, &str)> + '_ {
        Channel::ALL
            .into_iter()
            .filter_map(move |c| self.field(c).map(|f| (c, f)))
    }

    /// Every field id mentioned by any role, duplicates included
    pub fn role_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.position
            .iter()
            .chain(&self.color)
            .chain(&self.size)
            .chain(&self.opacity)
            .chain(&self.facets)
            .map(String::as_str)
    }

    pub fn requested_geometry(&self) -> Option<Geometry> {
        self.geometry.first().copied()
    }

    pub fn has_facets(&self) -> bool {
        !self.facets.is_empty()
    }

    pub fn has_opacity(&self) -> bool {
        !self.opacity.is_empty()
    }

    /// Both a position channel and a mark are resolvable
    pub fn is_renderable(&self) -> bool {
        !self.position.is_empty() && !self.geometry.is_empty()
    }
}

// =============================================================================
// Chart Request
// =============================================================================

/// Everything the compiler needs to know about one chart besides its rows:
/// the query, the registry records and the view's dimension/measure split.
///
/// Deserialized requests that omit `dimensions` or `measures` get them derived
/// from the field records, as [`ChartRequest::new`] does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ChartRequestRecord")]
pub struct ChartRequest {
    pub query: Query,
    pub fields: Vec<FieldMeta>,
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
}

/// Wire form of a [`ChartRequest`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartRequestRecord {
    query: Query,
    #[serde(default)]
    fields: Vec<FieldMeta>,
    #[serde(default)]
    dimensions: Vec<String>,
    #[serde(default)]
    measures: Vec<String>,
}

impl From<ChartRequestRecord> for ChartRequest {
    fn from(record: ChartRequestRecord) -> Self {
        let mut request = ChartRequest::new(record.query, record.fields);
        if !record.dimensions.is_empty() {
            request.dimensions = record.dimensions;
        }
        if !record.measures.is_empty() {
            request.measures = record.measures;
        }
        request
    }
}

impl ChartRequest {
    /// Build a request, deriving dimensions and measures from the analytic
    /// type of every field the query references.
    pub fn new(query: Query, fields: Vec<FieldMeta>) -> Self {
        let (dimensions, measures) = {
            let index = FieldIndex::new(&fields);
            let mut dimensions: Vec<String> = Vec::new();
            let mut measures: Vec<String> = Vec::new();
            for id in query.role_fields() {
                let Some(meta) = index.get(id) else {
                    continue;
                };
                let target = match meta.analytic_type {
                    AnalyticType::Dimension => &mut dimensions,
                    AnalyticType::Measure => &mut measures,
                };
                if !target.iter().any(|f| f == id) {
                    target.push(id.to_string());
                }
            }
            (dimensions, measures)
        };
        Self {
            query,
            fields,
            dimensions,
            measures,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<String>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_measures(mut self, measures: Vec<String>) -> Self {
        self.measures = measures;
        self
    }

    pub fn field_index(&self) -> FieldIndex<'_> {
        FieldIndex::new(&self.fields)
    }
}
