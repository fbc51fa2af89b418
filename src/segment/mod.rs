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

//! Segment access layer
//!
//! A segment is a self-contained shard of rows with chunked storage.
//! Every chunk holds `size_per_chunk` rows except possibly the last.
//! For each field, two monotonic barriers describe which representation
//! is materialized per chunk: `data_barrier` counts chunks with raw
//! column data, `index_barrier` counts chunks with a scalar index, and
//! `max(data_barrier, index_barrier)` always equals the chunk count.
//!
//! - [`SegmentReader`] - the read-only contract the evaluator consumes
//! - [`ScalarIndex`] - per-field, per-chunk membership/range queries
//! - [`MemorySegment`] - in-memory segment with barrier lifecycle
//! - [`SegmentConfig`] - chunk geometry configuration

pub mod config;
pub mod index;
pub mod memory;

pub use config::SegmentConfig;
pub use index::{MemoryScalarIndex, ScalarIndex};
pub use memory::{MemorySegment, MemorySegmentBuilder};

use crate::core::{Element, FieldId, Result, Schema};

/// A list of primary-key ids for [`SegmentReader::search_ids`]
///
/// Only the primary-key-eligible element types appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum IdList {
    /// INT64 primary keys
    Int(Vec<i64>),

    /// TEXT primary keys
    Str(Vec<String>),
}

impl IdList {
    /// Number of ids in the list
    pub fn len(&self) -> usize {
        match self {
            IdList::Int(v) => v.len(),
            IdList::Str(v) => v.len(),
        }
    }

    /// Returns true if the list holds no ids
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only view of a single segment
///
/// Thread-compatible, not thread-safe: one evaluation runs on one
/// thread, and barriers may advance between evaluations but never
/// retreat during one.
pub trait SegmentReader {
    /// The segment's schema
    fn schema(&self) -> &Schema;

    /// Total number of rows
    fn row_count(&self) -> i64;

    /// Fixed chunk width for this segment
    fn size_per_chunk(&self) -> i64;

    /// Number of chunks with raw column data for the field
    fn num_chunk_data(&self, field_id: FieldId) -> Result<i64>;

    /// Number of chunks with a scalar index for the field
    fn num_chunk_index(&self, field_id: FieldId) -> Result<i64>;

    /// Raw column span for one chunk
    ///
    /// The span length equals `size_per_chunk` except possibly for the
    /// last chunk.
    fn chunk_data<T: Element>(&self, field_id: FieldId, chunk_id: i64) -> Result<&[T]>;

    /// Scalar index for one chunk
    fn chunk_scalar_index<T: Element>(
        &self,
        field_id: FieldId,
        chunk_id: i64,
    ) -> Result<&dyn ScalarIndex<T>>;

    /// Visibility-filtered primary-key lookup
    ///
    /// Returns the ids that resolved to a row visible at `read_ts`,
    /// together with their segment row offsets.
    fn search_ids(&self, ids: &IdList, read_ts: u64) -> Result<(IdList, Vec<i64>)>;
}
