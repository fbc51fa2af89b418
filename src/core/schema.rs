// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Segment schema: field identities and layout
//!
//! A schema is an ordered list of scalar fields keyed by [`FieldId`],
//! with at most one primary field. The primary field, when present, must
//! use a primary-key-eligible element type (INT64 or TEXT).

use std::fmt;

use rustc_hash::FxHashMap;

use super::error::{Error, Result};
use super::types::ElementType;

/// Unique identifier of a field within a segment schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub i64);

impl FieldId {
    /// Returns the raw id
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FieldId {
    fn from(value: i64) -> Self {
        FieldId(value)
    }
}

/// A field definition in a segment schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    /// Unique field identifier
    pub id: FieldId,

    /// Field name
    pub name: String,

    /// Element type of the field
    pub element_type: ElementType,

    /// Whether this field is the segment's primary key
    pub is_primary: bool,
}

impl FieldMeta {
    /// Create a new field definition
    pub fn new(
        id: FieldId,
        name: impl Into<String>,
        element_type: ElementType,
        is_primary: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            element_type,
            is_primary,
        }
    }
}

impl fmt::Display for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.element_type)?;
        if self.is_primary {
            write!(f, " PRIMARY")?;
        }
        Ok(())
    }
}

/// Segment schema definition
///
/// Fields keep their declaration order; lookup by id is O(1) through a
/// cached index map.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldMeta>,
    by_id: FxHashMap<FieldId, usize>,
    primary: Option<FieldId>,
}

impl Schema {
    /// Number of fields in the schema
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    /// Look up a field by id
    pub fn field(&self, id: FieldId) -> Result<&FieldMeta> {
        self.by_id
            .get(&id)
            .map(|&idx| &self.fields[idx])
            .ok_or(Error::FieldNotFound(id))
    }

    /// Returns true if the schema contains the field
    pub fn has_field(&self, id: FieldId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Id of the primary field, if the schema declares one
    pub fn primary_field_id(&self) -> Option<FieldId> {
        self.primary
    }

    /// Check a declared element type against the schema's type for a field
    pub fn check_field_type(&self, id: FieldId, declared: ElementType) -> Result<&FieldMeta> {
        let meta = self.field(id)?;
        if meta.element_type != declared {
            return Err(Error::SchemaMismatch {
                field: id,
                declared,
                actual: meta.element_type,
            });
        }
        Ok(meta)
    }
}

/// Builder for [`Schema`]
///
/// Rejects duplicate field ids, duplicate primary declarations, and
/// primary fields whose type is not PK-eligible.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldMeta>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular field
    pub fn add_field(
        mut self,
        id: impl Into<FieldId>,
        name: impl Into<String>,
        element_type: ElementType,
    ) -> Self {
        self.fields
            .push(FieldMeta::new(id.into(), name, element_type, false));
        self
    }

    /// Add the primary field
    pub fn add_primary_field(
        mut self,
        id: impl Into<FieldId>,
        name: impl Into<String>,
        element_type: ElementType,
    ) -> Self {
        self.fields
            .push(FieldMeta::new(id.into(), name, element_type, true));
        self
    }

    /// Validate and build the schema
    pub fn build(self) -> Result<Schema> {
        let mut by_id = FxHashMap::default();
        let mut primary = None;
        for (idx, field) in self.fields.iter().enumerate() {
            if by_id.insert(field.id, idx).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate field id {}",
                    field.id
                )));
            }
            if field.is_primary {
                if primary.is_some() {
                    return Err(Error::InvalidSchema(
                        "more than one primary field".to_string(),
                    ));
                }
                if !field.element_type.is_primary_key_eligible() {
                    return Err(Error::InvalidSchema(format!(
                        "primary field {} has non-eligible type {}",
                        field.id, field.element_type
                    )));
                }
                primary = Some(field.id);
            }
        }
        Ok(Schema {
            fields: self.fields,
            by_id,
            primary,
        })
    }
}
