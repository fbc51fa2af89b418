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

//! In-memory segment
//!
//! [`MemorySegment`] owns typed column vectors, per-row insert
//! timestamps and a primary-key map. A fresh segment serves every chunk
//! from raw data; [`MemorySegment::build_scalar_index`] materializes
//! per-chunk indexes and [`MemorySegment::drop_chunk_data`] retires raw
//! chunks afterwards, so `max(data_barrier, index_barrier)` always
//! equals the chunk count.

use std::any::Any;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::config::SegmentConfig;
use super::index::{MemoryScalarIndex, ScalarIndex};
use super::{IdList, SegmentReader};
use crate::core::{Element, ElementType, Error, FieldId, Result, Scalar, Schema};

/// Typed column storage
#[derive(Debug)]
enum ColumnData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    fn new(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Bool => ColumnData::Bool(Vec::new()),
            ElementType::Int8 => ColumnData::Int8(Vec::new()),
            ElementType::Int16 => ColumnData::Int16(Vec::new()),
            ElementType::Int32 => ColumnData::Int32(Vec::new()),
            ElementType::Int64 => ColumnData::Int64(Vec::new()),
            ElementType::Float32 => ColumnData::Float32(Vec::new()),
            ElementType::Float64 => ColumnData::Float64(Vec::new()),
            ElementType::Text => ColumnData::Text(Vec::new()),
        }
    }

    fn push(&mut self, value: &Scalar) -> bool {
        match (self, value) {
            (ColumnData::Bool(v), Scalar::Bool(x)) => v.push(*x),
            (ColumnData::Int8(v), Scalar::Int8(x)) => v.push(*x),
            (ColumnData::Int16(v), Scalar::Int16(x)) => v.push(*x),
            (ColumnData::Int32(v), Scalar::Int32(x)) => v.push(*x),
            (ColumnData::Int64(v), Scalar::Int64(x)) => v.push(*x),
            (ColumnData::Float32(v), Scalar::Float32(x)) => v.push(*x),
            (ColumnData::Float64(v), Scalar::Float64(x)) => v.push(*x),
            (ColumnData::Text(v), Scalar::Text(x)) => v.push(x.clone()),
            _ => return false,
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        match self {
            ColumnData::Bool(v) => v,
            ColumnData::Int8(v) => v,
            ColumnData::Int16(v) => v,
            ColumnData::Int32(v) => v,
            ColumnData::Int64(v) => v,
            ColumnData::Float32(v) => v,
            ColumnData::Float64(v) => v,
            ColumnData::Text(v) => v,
        }
    }

    /// Typed view of the whole column
    fn typed<T: Element>(&self) -> Option<&[T]> {
        self.as_any()
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
    }
}

/// Per-field storage with barrier state
struct FieldStore {
    data: ColumnData,
    /// Chunks `[0, data_barrier)` are served from raw data
    data_barrier: i64,
    /// Chunks `[0, index_barrier)` have a scalar index
    index_barrier: i64,
    /// One index per chunk in `[0, index_barrier)`
    indexes: Vec<Box<dyn Any + Send + Sync>>,
}

/// Primary-key map for `search_ids`
#[derive(Debug)]
enum PkLookup {
    None,
    Int(FxHashMap<i64, i64>),
    Str(FxHashMap<String, i64>),
}

/// An in-memory segment of rows with chunked storage
pub struct MemorySegment {
    schema: Schema,
    config: SegmentConfig,
    row_count: i64,
    fields: FxHashMap<FieldId, FieldStore>,
    /// Per-row insert timestamps, consulted by `search_ids`
    insert_ts: Vec<u64>,
    pk: PkLookup,
}

impl MemorySegment {
    /// Number of chunks in this segment
    pub fn num_chunks(&self) -> i64 {
        let spc = self.config.size_per_chunk;
        (self.row_count + spc - 1) / spc
    }

    fn chunk_len(&self, chunk_id: i64) -> i64 {
        let spc = self.config.size_per_chunk;
        if chunk_id == self.num_chunks() - 1 {
            self.row_count - chunk_id * spc
        } else {
            spc
        }
    }

    fn field_store(&self, field_id: FieldId) -> Result<&FieldStore> {
        self.fields
            .get(&field_id)
            .ok_or(Error::FieldNotFound(field_id))
    }

    /// Build per-chunk scalar indexes for a field
    ///
    /// Advances the field's index barrier to the chunk count. Raw data
    /// stays in place until [`MemorySegment::drop_chunk_data`].
    pub fn build_scalar_index(&mut self, field_id: FieldId) -> Result<()> {
        let element_type = self.schema.field(field_id)?.element_type;
        match element_type {
            ElementType::Bool => self.build_index_for::<bool>(field_id),
            ElementType::Int8 => self.build_index_for::<i8>(field_id),
            ElementType::Int16 => self.build_index_for::<i16>(field_id),
            ElementType::Int32 => self.build_index_for::<i32>(field_id),
            ElementType::Int64 => self.build_index_for::<i64>(field_id),
            ElementType::Float32 => self.build_index_for::<f32>(field_id),
            ElementType::Float64 => self.build_index_for::<f64>(field_id),
            ElementType::Text => self.build_index_for::<String>(field_id),
        }
    }

    fn build_index_for<T: Element>(&mut self, field_id: FieldId) -> Result<()> {
        let num_chunks = self.num_chunks();
        let spc = self.config.size_per_chunk;
        let store = self
            .fields
            .get_mut(&field_id)
            .ok_or(Error::FieldNotFound(field_id))?;
        let column = store.data.typed::<T>().ok_or(Error::UnsupportedType {
            variant: "build_scalar_index",
            element_type: T::ELEMENT_TYPE,
        })?;

        let mut indexes: Vec<Box<dyn Any + Send + Sync>> = Vec::with_capacity(num_chunks as usize);
        for chunk_id in 0..num_chunks {
            let start = (chunk_id * spc) as usize;
            let end = column.len().min(start + spc as usize);
            let chunk_values = column[start..end].to_vec();
            indexes.push(Box::new(MemoryScalarIndex::build(chunk_values)));
        }
        store.indexes = indexes;
        store.index_barrier = num_chunks;
        debug!(field = field_id.get(), chunks = num_chunks, "scalar index built");
        Ok(())
    }

    /// Retire raw chunks from the back of the field's raw range
    ///
    /// The new data barrier must not exceed the current one, and the
    /// index barrier must cover the retired chunks so that
    /// `max(data_barrier, index_barrier)` keeps equaling the chunk
    /// count.
    pub fn drop_chunk_data(&mut self, field_id: FieldId, new_data_barrier: i64) -> Result<()> {
        let num_chunks = self.num_chunks();
        let store = self
            .fields
            .get_mut(&field_id)
            .ok_or(Error::FieldNotFound(field_id))?;
        if new_data_barrier < 0 || new_data_barrier > store.data_barrier {
            return Err(Error::invariant(format!(
                "data barrier may only retreat within [0, {}], got {}",
                store.data_barrier, new_data_barrier
            )));
        }
        if new_data_barrier.max(store.index_barrier) != num_chunks {
            return Err(Error::invariant(format!(
                "dropping raw chunks would leave max(data barrier {}, index barrier {}) != {}",
                new_data_barrier, store.index_barrier, num_chunks
            )));
        }
        store.data_barrier = new_data_barrier;
        debug!(
            field = field_id.get(),
            data_barrier = new_data_barrier,
            "raw chunk data retired"
        );
        Ok(())
    }
}

impl SegmentReader for MemorySegment {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> i64 {
        self.row_count
    }

    fn size_per_chunk(&self) -> i64 {
        self.config.size_per_chunk
    }

    fn num_chunk_data(&self, field_id: FieldId) -> Result<i64> {
        Ok(self.field_store(field_id)?.data_barrier)
    }

    fn num_chunk_index(&self, field_id: FieldId) -> Result<i64> {
        Ok(self.field_store(field_id)?.index_barrier)
    }

    fn chunk_data<T: Element>(&self, field_id: FieldId, chunk_id: i64) -> Result<&[T]> {
        self.schema.check_field_type(field_id, T::ELEMENT_TYPE)?;
        let store = self.field_store(field_id)?;
        if chunk_id < 0 || chunk_id >= store.data_barrier {
            return Err(Error::MissingChunkData { field: field_id, chunk_id });
        }
        let column = store.data.typed::<T>().ok_or(Error::UnsupportedType {
            variant: "chunk_data",
            element_type: T::ELEMENT_TYPE,
        })?;
        let start = (chunk_id * self.config.size_per_chunk) as usize;
        let end = start + self.chunk_len(chunk_id) as usize;
        Ok(&column[start..end])
    }

    fn chunk_scalar_index<T: Element>(
        &self,
        field_id: FieldId,
        chunk_id: i64,
    ) -> Result<&dyn ScalarIndex<T>> {
        self.schema.check_field_type(field_id, T::ELEMENT_TYPE)?;
        let store = self.field_store(field_id)?;
        if chunk_id < 0 || chunk_id >= store.index_barrier {
            return Err(Error::MissingChunkIndex { field: field_id, chunk_id });
        }
        let index = store.indexes[chunk_id as usize]
            .downcast_ref::<MemoryScalarIndex<T>>()
            .ok_or(Error::UnsupportedType {
                variant: "chunk_scalar_index",
                element_type: T::ELEMENT_TYPE,
            })?;
        Ok(index)
    }

    fn search_ids(&self, ids: &IdList, read_ts: u64) -> Result<(IdList, Vec<i64>)> {
        let mut offsets = Vec::new();
        let visible = |offset: i64| self.insert_ts[offset as usize] <= read_ts;
        match (&self.pk, ids) {
            (PkLookup::Int(map), IdList::Int(probes)) => {
                let mut matched = Vec::new();
                for id in probes {
                    if let Some(&offset) = map.get(id) {
                        if visible(offset) {
                            matched.push(*id);
                            offsets.push(offset);
                        }
                    }
                }
                Ok((IdList::Int(matched), offsets))
            }
            (PkLookup::Str(map), IdList::Str(probes)) => {
                let mut matched = Vec::new();
                for id in probes {
                    if let Some(&offset) = map.get(id) {
                        if visible(offset) {
                            matched.push(id.clone());
                            offsets.push(offset);
                        }
                    }
                }
                Ok((IdList::Str(matched), offsets))
            }
            (PkLookup::None, _) => Err(Error::invariant(
                "search_ids on a segment without a primary key".to_string(),
            )),
            _ => Err(Error::invariant(
                "id list type does not match the primary key type".to_string(),
            )),
        }
    }
}

/// Builder for [`MemorySegment`]
///
/// Rows are appended with an insert timestamp; the builder validates
/// each row against the schema and maintains the primary-key map.
#[derive(Debug)]
pub struct MemorySegmentBuilder {
    schema: Schema,
    config: SegmentConfig,
    columns: Vec<ColumnData>,
    insert_ts: Vec<u64>,
    pk: PkLookup,
    row_count: i64,
}

impl MemorySegmentBuilder {
    /// Create a builder with the default chunk geometry
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, SegmentConfig::default())
    }

    /// Create a builder with an explicit configuration
    pub fn with_config(schema: Schema, config: SegmentConfig) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnData::new(f.element_type))
            .collect();
        let pk = match schema
            .primary_field_id()
            .and_then(|id| schema.field(id).ok())
        {
            Some(meta) if meta.element_type == ElementType::Int64 => {
                PkLookup::Int(FxHashMap::default())
            }
            Some(meta) if meta.element_type == ElementType::Text => {
                PkLookup::Str(FxHashMap::default())
            }
            _ => PkLookup::None,
        };
        Self {
            schema,
            config,
            columns,
            insert_ts: Vec::new(),
            pk,
            row_count: 0,
        }
    }

    /// Append a row, visible to reads at or after `insert_ts`
    pub fn push_row(&mut self, values: &[Scalar], insert_ts: u64) -> Result<()> {
        if values.len() != self.schema.field_count() {
            return Err(Error::invariant(format!(
                "row has {} values, schema has {} fields",
                values.len(),
                self.schema.field_count()
            )));
        }
        for (value, meta) in values.iter().zip(self.schema.fields()) {
            if value.element_type() != meta.element_type {
                return Err(Error::SchemaMismatch {
                    field: meta.id,
                    declared: value.element_type(),
                    actual: meta.element_type,
                });
            }
            if meta.is_primary {
                let duplicate = match (&self.pk, value) {
                    (PkLookup::Int(map), Scalar::Int64(id)) => map.contains_key(id),
                    (PkLookup::Str(map), Scalar::Text(id)) => map.contains_key(id),
                    _ => false,
                };
                if duplicate {
                    return Err(Error::invariant(format!(
                        "duplicate primary key {}",
                        value
                    )));
                }
            }
        }
        let offset = self.row_count;
        for (value, meta) in values.iter().zip(self.schema.fields()) {
            if meta.is_primary {
                match (&mut self.pk, value) {
                    (PkLookup::Int(map), Scalar::Int64(id)) => {
                        map.insert(*id, offset);
                    }
                    (PkLookup::Str(map), Scalar::Text(id)) => {
                        map.insert(id.clone(), offset);
                    }
                    _ => {}
                }
            }
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
        self.insert_ts.push(insert_ts);
        self.row_count += 1;
        Ok(())
    }

    /// Finish the segment
    ///
    /// Every chunk of every field starts raw: `data_barrier` equals the
    /// chunk count and `index_barrier` is zero.
    pub fn build(self) -> MemorySegment {
        let spc = self.config.size_per_chunk;
        let num_chunks = (self.row_count + spc - 1) / spc;
        let fields = self
            .schema
            .fields()
            .iter()
            .zip(self.columns)
            .map(|(meta, data)| {
                (
                    meta.id,
                    FieldStore {
                        data,
                        data_barrier: num_chunks,
                        index_barrier: 0,
                        indexes: Vec::new(),
                    },
                )
            })
            .collect();
        MemorySegment {
            schema: self.schema,
            config: self.config,
            row_count: self.row_count,
            fields,
            insert_ts: self.insert_ts,
            pk: self.pk,
        }
    }
}
