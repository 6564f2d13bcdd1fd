// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index schema
//!
//! Declared field types of the remote index, looked up by remote ("cloud")
//! field name.
//!
//! # Index Definition
//!
//! ```text
//! {
//!   "name": "web-index",
//!   "fields": [
//!     { "name": "s_key",   "type": "Edm.String", "key": true },
//!     { "name": "title_t", "type": "Edm.String", "searchable": true },
//!     { "name": "age_tl",  "type": "Edm.Int64",  "filterable": true, "sortable": true },
//!     { "name": "tags_sm", "type": "Collection(Edm.String)", "facetable": true }
//!   ]
//! }
//! ```
//!
//! Two sources are consulted: the schema built locally while the index was
//! opened, then the schema reported by the service ([`LayeredSchema`]).

mod translator;

pub use translator::{
    DefaultFieldNameTranslator, FieldNameTranslator, FieldUsage, BUILTIN_ID_FIELD,
    BUILTIN_UNIQUE_ID_FIELD, CLOUD_UNIQUE_ID_FIELD,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SearchError;

/// Declared simple type of a remote index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdmType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Int64")]
    Int64,
    #[serde(rename = "Edm.Double")]
    Double,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    #[serde(rename = "Edm.GeographyPoint")]
    GeographyPoint,
    #[serde(rename = "Collection(Edm.String)")]
    StringCollection,
}

impl EdmType {
    /// Whether literals of this type are single-quoted in filters.
    #[must_use]
    pub fn is_string_like(&self) -> bool {
        matches!(self, Self::String | Self::StringCollection)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Double)
    }
}

impl std::fmt::Display for EdmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdmType::String => write!(f, "Edm.String"),
            EdmType::Int32 => write!(f, "Edm.Int32"),
            EdmType::Int64 => write!(f, "Edm.Int64"),
            EdmType::Double => write!(f, "Edm.Double"),
            EdmType::Boolean => write!(f, "Edm.Boolean"),
            EdmType::DateTimeOffset => write!(f, "Edm.DateTimeOffset"),
            EdmType::GeographyPoint => write!(f, "Edm.GeographyPoint"),
            EdmType::StringCollection => write!(f, "Collection(Edm.String)"),
        }
    }
}

/// One remote index field and its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedField {
    /// Remote field name
    pub name: String,
    /// Declared simple type
    #[serde(rename = "type")]
    pub edm_type: EdmType,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub facetable: bool,
}

impl IndexedField {
    /// Filterable field of the given type.
    pub fn new(name: impl Into<String>, edm_type: EdmType) -> Self {
        Self {
            name: name.into(),
            edm_type,
            key: false,
            searchable: false,
            filterable: true,
            sortable: false,
            facetable: false,
        }
    }
}

/// Index schema: remote field name → declared field.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct IndexSchema {
    fields: Vec<IndexedField>,
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct IndexDefinition {
    #[serde(default)]
    fields: Vec<IndexedField>,
}

impl IndexSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the service's index definition JSON (`{"fields": [...]}`).
    pub fn from_index_definition(json: &str) -> Result<Self, serde_json::Error> {
        let parsed: IndexDefinition = serde_json::from_str(json)?;
        Ok(parsed.fields.into_iter().fold(Self::new(), Self::field))
    }

    /// Add a field definition
    pub fn field(mut self, field: IndexedField) -> Self {
        match self.by_name.get(&field.name) {
            Some(&idx) => self.fields[idx] = field,
            None => {
                self.by_name.insert(field.name.clone(), self.fields.len());
                self.fields.push(field);
            }
        }
        self
    }

    /// Add the document key field (string, filterable)
    pub fn key(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::String);
        field.key = true;
        self.field(field)
    }

    /// Add a searchable string field
    pub fn string(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::String);
        field.searchable = true;
        self.field(field)
    }

    /// Add a sortable string field
    pub fn string_sortable(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::String);
        field.searchable = true;
        field.sortable = true;
        self.field(field)
    }

    /// Add a 32-bit integer field
    pub fn int32(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::Int32);
        field.sortable = true;
        self.field(field)
    }

    /// Add a 64-bit integer field
    pub fn int64(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::Int64);
        field.sortable = true;
        self.field(field)
    }

    /// Add a floating point field
    pub fn double(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::Double);
        field.sortable = true;
        self.field(field)
    }

    /// Add a boolean field
    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(IndexedField::new(name, EdmType::Boolean))
    }

    /// Add a date/time field
    pub fn date_time(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::DateTimeOffset);
        field.sortable = true;
        self.field(field)
    }

    /// Add a geography point field
    pub fn geography_point(self, name: impl Into<String>) -> Self {
        self.field(IndexedField::new(name, EdmType::GeographyPoint))
    }

    /// Add a facetable string collection field
    pub fn string_collection(self, name: impl Into<String>) -> Self {
        let mut field = IndexedField::new(name, EdmType::StringCollection);
        field.facetable = true;
        self.field(field)
    }

    /// Look up a field by remote name
    #[must_use]
    pub fn get(&self, cloud_name: &str) -> Option<&IndexedField> {
        self.by_name.get(cloud_name).map(|&idx| &self.fields[idx])
    }

    /// All fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &IndexedField> {
        self.fields.iter()
    }

    /// The key field, if one is declared
    #[must_use]
    pub fn key_field(&self) -> Option<&IndexedField> {
        self.fields.iter().find(|f| f.key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Remote schema accessor: remote field name → declared field, or absent.
pub trait SchemaAccessor: Send + Sync {
    fn field_by_cloud_name(&self, cloud_name: &str) -> Option<IndexedField>;

    /// Lookup that treats an undeclared field as an error.
    fn require_field(&self, cloud_name: &str) -> crate::error::Result<IndexedField> {
        self.field_by_cloud_name(cloud_name)
            .ok_or_else(|| SearchError::SchemaFieldNotFound(cloud_name.to_string()))
    }
}

impl SchemaAccessor for IndexSchema {
    fn field_by_cloud_name(&self, cloud_name: &str) -> Option<IndexedField> {
        self.get(cloud_name).cloned()
    }
}

impl<T: SchemaAccessor + ?Sized> SchemaAccessor for Arc<T> {
    fn field_by_cloud_name(&self, cloud_name: &str) -> Option<IndexedField> {
        (**self).field_by_cloud_name(cloud_name)
    }
}

/// Local schema first, remote schema second.
pub struct LayeredSchema {
    local: Arc<dyn SchemaAccessor>,
    remote: Arc<dyn SchemaAccessor>,
}

impl LayeredSchema {
    pub fn new(local: Arc<dyn SchemaAccessor>, remote: Arc<dyn SchemaAccessor>) -> Self {
        Self { local, remote }
    }
}

impl SchemaAccessor for LayeredSchema {
    fn field_by_cloud_name(&self, cloud_name: &str) -> Option<IndexedField> {
        self.local
            .field_by_cloud_name(cloud_name)
            .or_else(|| self.remote.field_by_cloud_name(cloud_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_registers_types() {
        let schema = IndexSchema::new()
            .key("s_key")
            .string("title_t")
            .int64("age_tl")
            .boolean("hidden_b")
            .date_time("updated_tdt")
            .string_collection("tags_sm");

        assert_eq!(schema.len(), 6);
        assert_eq!(schema.get("age_tl").unwrap().edm_type, EdmType::Int64);
        assert_eq!(schema.get("tags_sm").unwrap().edm_type, EdmType::StringCollection);
        assert!(schema.get("tags_sm").unwrap().facetable);
        assert_eq!(schema.key_field().unwrap().name, "s_key");
        assert!(schema.get("missing").is_none());
    }

    #[test]
    fn test_require_field_reports_undeclared_name() {
        let local: Arc<dyn SchemaAccessor> = Arc::new(IndexSchema::new().key("s_key"));
        let remote: Arc<dyn SchemaAccessor> = Arc::new(IndexSchema::new().int64("age_tl"));
        let layered = LayeredSchema::new(local, remote);

        assert_eq!(layered.require_field("age_tl").unwrap().edm_type, EdmType::Int64);
        assert!(layered.require_field("s_key").unwrap().key);
        match layered.require_field("missing") {
            Err(SearchError::SchemaFieldNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("Expected SchemaFieldNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_redefining_a_field_replaces_it() {
        let schema = IndexSchema::new().string("code").int32("code");
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("code").unwrap().edm_type, EdmType::Int32);
    }

    #[test]
    fn test_from_index_definition() {
        let json = r#"{
            "name": "web",
            "fields": [
                {"name": "s_key", "type": "Edm.String", "key": true},
                {"name": "age_tl", "type": "Edm.Int64", "sortable": true},
                {"name": "tags_sm", "type": "Collection(Edm.String)"}
            ]
        }"#;
        let schema = IndexSchema::from_index_definition(json).unwrap();
        assert_eq!(schema.len(), 3);
        assert!(schema.get("s_key").unwrap().key);
        assert!(schema.get("age_tl").unwrap().sortable);
        assert_eq!(schema.field_by_cloud_name("tags_sm").unwrap().edm_type, EdmType::StringCollection);
    }

    #[test]
    fn test_edm_display_matches_wire_names() {
        assert_eq!(EdmType::StringCollection.to_string(), "Collection(Edm.String)");
        assert_eq!(
            serde_json::to_string(&EdmType::DateTimeOffset).unwrap(),
            "\"Edm.DateTimeOffset\""
        );
    }

    #[test]
    fn test_layered_schema_prefers_local() {
        let local: Arc<dyn SchemaAccessor> = Arc::new(IndexSchema::new().string("name_s"));
        let remote: Arc<dyn SchemaAccessor> =
            Arc::new(IndexSchema::new().int32("name_s").double("price_tf"));
        let layered = LayeredSchema::new(local, remote);

        assert_eq!(layered.field_by_cloud_name("name_s").unwrap().edm_type, EdmType::String);
        assert_eq!(layered.field_by_cloud_name("price_tf").unwrap().edm_type, EdmType::Double);
        assert!(layered.field_by_cloud_name("nope").is_none());
    }
}
