//! Field metadata types consumed by the compiler
//!
//! Field metadata is produced by an external registry and is read-only here.
//! The compiler looks every channel's field up by id, so the registry records
//! are indexed once per compilation call into a [`FieldIndex`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::naming;

// =============================================================================
// Classification Types
// =============================================================================

/// Semantic type of a field, driving default encoding choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    #[default]
    Nominal,
    Ordinal,
    Quantitative,
    Temporal,
}

impl SemanticType {
    /// Whether values of this type form a finite set of categories
    pub fn is_discrete(&self) -> bool {
        !matches!(self, SemanticType::Quantitative)
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SemanticType::Nominal => "nominal",
            SemanticType::Ordinal => "ordinal",
            SemanticType::Quantitative => "quantitative",
            SemanticType::Temporal => "temporal",
        };
        write!(f, "{}", s)
    }
}

/// Analytic role of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticType {
    Dimension,
    Measure,
}

// =============================================================================
// Field Metadata
// =============================================================================

/// Metadata record for one field, as published by the field registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    /// Field id (column name in the row table)
    #[serde(alias = "fid")]
    pub id: String,
    /// Human-readable name; falls back to the id when absent
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub semantic_type: SemanticType,
    pub analytic_type: AnalyticType,
    /// Number of distinct values in the full dataset
    #[serde(default, alias = "unique")]
    pub unique_count: u64,
}

impl FieldMeta {
    pub fn new(
        id: impl Into<String>,
        semantic_type: SemanticType,
        analytic_type: AnalyticType,
        unique_count: u64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            semantic_type,
            analytic_type,
            unique_count,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Title shown on axes and legends
    pub fn title(&self) -> &str {
        match &self.display_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }

    pub fn is_measure(&self) -> bool {
        self.analytic_type == AnalyticType::Measure
    }
}

// =============================================================================
// Field Index
// =============================================================================

/// Field metadata indexed by field id, built once per compilation call.
///
/// Lookups of unknown ids fall back to `nominal` semantics and the
/// placeholder title instead of failing.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex<'a> {
    by_id: HashMap<&'a str, &'a FieldMeta>,
}

impl<'a> FieldIndex<'a> {
    /// Index a slice of registry records. Later duplicates win.
    pub fn new(fields: &'a [FieldMeta]) -> Self {
        let by_id = fields.iter().map(|f| (f.id.as_str(), f)).collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a FieldMeta> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Semantic type of a field; unknown ids resolve to nominal
    pub fn semantic_type(&self, id: &str) -> SemanticType {
        self.get(id)
            .map(|f| f.semantic_type)
            .unwrap_or(SemanticType::Nominal)
    }

    /// Display title of a field; unknown ids resolve to the placeholder title
    pub fn title(&self, id: &str) -> String {
        self.get(id)
            .map(|f| f.title().to_string())
            .unwrap_or_else(|| naming::UNKNOWN_TITLE.to_string())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
