// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Documents and batch payloads.
//!
//! # Wire format
//!
//! ```json
//! { "value": [
//!     { "@search.action": "upload", "s_key": "9f86…", "title": "Home" },
//!     { "@search.action": "delete", "s_key": "1b2c…" }
//! ] }
//! ```

use md5::{Digest, Md5};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::CLOUD_UNIQUE_ID_FIELD;
use crate::value::FieldValue;

/// Per-document action key in the batch payload.
pub const SEARCH_ACTION_FIELD: &str = "@search.action";

/// MD5 digest of the UTF-8 bytes, lowercase hex. Documents are keyed by this.
#[must_use]
pub fn hash_unique_id(unique_id: &str) -> String {
    hex::encode(Md5::digest(unique_id.as_bytes()))
}

/// Document action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchAction {
    /// Insert or replace the whole document
    Upload,
    Merge,
    MergeOrUpload,
    Delete,
}

impl SearchAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Merge => "merge",
            Self::MergeOrUpload => "mergeOrUpload",
            Self::Delete => "delete",
        }
    }
}

/// A staged document mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSearchDocument {
    pub action: SearchAction,
    pub fields: Map<String, Value>,
}

impl CloudSearchDocument {
    pub fn new(action: SearchAction) -> Self {
        Self { action, fields: Map::new() }
    }

    /// Upload document from a field map.
    pub fn upload(fields: Map<String, Value>) -> Self {
        Self { action: SearchAction::Upload, fields }
    }

    /// Delete document carrying only the remote key.
    pub fn delete(key: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(CLOUD_UNIQUE_ID_FIELD.to_string(), Value::String(key.into()));
        Self { action: SearchAction::Delete, fields }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into().to_json());
        self
    }

    /// Remote key (`s_key`), if present.
    pub fn key(&self) -> Option<&str> {
        self.fields.get(CLOUD_UNIQUE_ID_FIELD).and_then(Value::as_str)
    }

    /// Serialized payload size, used for batch byte thresholds.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

impl Serialize for CloudSearchDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(SEARCH_ACTION_FIELD, self.action.as_str())?;
        for (k, v) in &self.fields {
            if k != SEARCH_ACTION_FIELD {
                map.serialize_entry(k, v)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CloudSearchDocument {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let action = match fields.remove(SEARCH_ACTION_FIELD) {
            Some(v) => SearchAction::deserialize(v).map_err(serde::de::Error::custom)?,
            None => SearchAction::Upload,
        };
        Ok(Self { action, fields })
    }
}

/// One POST payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudBatch {
    #[serde(rename = "value")]
    pub documents: Vec<CloudSearchDocument>,
}

impl CloudBatch {
    pub fn new(documents: Vec<CloudSearchDocument>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// JSON body for the documents endpoint.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
