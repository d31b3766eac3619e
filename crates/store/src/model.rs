//! Resource metadata, list queries, and formatting requests.

use std::collections::BTreeMap;

use daysheet_core::schema::CellRange;
use daysheet_core::types::{ResourceId, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// What a resource in the store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A folder-like container holding other resources.
    Container,
    /// A single-sheet spreadsheet document.
    Document,
}

/// Metadata of a container or document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    pub parents: Vec<ResourceId>,
    /// Application-defined key/value metadata.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub trashed: bool,
}

impl Resource {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Metadata for a resource about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    pub name: String,
    pub kind: ResourceKind,
    pub parent: Option<ResourceId>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl NewResource {
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Container,
            parent: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn document(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Document,
            ..Self::container(name)
        }
    }

    pub fn under(mut self, parent: impl Into<ResourceId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Filter for [`DocumentStore::list`](crate::DocumentStore::list).
///
/// Every set field must match. Trashed resources are excluded unless
/// `include_trashed` is set. A `parent` filter matches direct children only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub parent: Option<ResourceId>,
    pub name: Option<String>,
    pub kind: Option<ResourceKind>,
    pub property: Option<(String, String)>,
    pub include_trashed: bool,
}

impl Query {
    /// Direct children of `parent`.
    pub fn children_of(parent: impl Into<ResourceId>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    /// Resources named `name`, anywhere.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn of_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.property = Some((key.into(), value.into()));
        self
    }

    pub fn including_trashed(mut self) -> Self {
        self.include_trashed = true;
        self
    }

    /// In-process evaluation of the filter.
    pub fn matches(&self, resource: &Resource) -> bool {
        if resource.trashed && !self.include_trashed {
            return false;
        }
        if let Some(parent) = &self.parent {
            if !resource.parents.iter().any(|p| p == parent) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &resource.name != name {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if resource.kind != kind {
                return false;
            }
        }
        if let Some((key, value)) = &self.property {
            if resource.property(key) != Some(value.as_str()) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }
}

/// Cosmetic cell formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    pub background: Option<Color>,
    pub foreground: Option<Color>,
    pub bold: bool,
    pub italic: bool,
    pub centered: bool,
}

/// One request of a [`DocumentStore::batch_format`](crate::DocumentStore::batch_format) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormatRequest {
    /// Apply a style to every cell of `range`.
    Style { range: CellRange, style: CellStyle },
    /// Set the pixel width of columns `start_col..=end_col` (1-based).
    ColumnWidth {
        start_col: u32,
        end_col: u32,
        pixels: u32,
    },
    /// Make the whole document read-only for cell writes.
    Protect { description: String },
}
