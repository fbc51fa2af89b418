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

//! Field-to-field comparison dispatch
//!
//! Compare has no index path: every chunk is walked row by row through
//! type-erased value readers that serve the raw span below the field's
//! data barrier and the index's reverse lookup above it. Operands must
//! share an element type; the engine performs no implicit numeric
//! widening across heterogeneous columns.

use super::Evaluator;
use crate::common::Bitset;
use crate::core::{ElementType, Error, FieldId, Operator, Result};
use crate::segment::SegmentReader;

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    pub(super) fn eval_compare(
        &self,
        left_field_id: FieldId,
        left_type: ElementType,
        right_field_id: FieldId,
        right_type: ElementType,
        op: Operator,
    ) -> Result<Bitset> {
        let schema = self.segment.schema();
        schema.check_field_type(left_field_id, left_type)?;
        schema.check_field_type(right_field_id, right_type)?;
        if left_type != right_type {
            return Err(Error::IncompatibleOperands {
                left: left_type,
                right: right_type,
            });
        }
        if op == Operator::PrefixMatch && left_type != ElementType::Text {
            return Err(Error::UnsupportedOperator {
                op,
                element_type: left_type,
            });
        }

        let left_data_barrier = self.segment.num_chunk_data(left_field_id)?;
        let left_index_barrier = self.segment.num_chunk_index(left_field_id)?;
        self.check_barriers(left_field_id, left_data_barrier, left_index_barrier)?;

        let right_data_barrier = self.segment.num_chunk_data(right_field_id)?;
        let right_index_barrier = self.segment.num_chunk_index(right_field_id)?;
        self.check_barriers(right_field_id, right_data_barrier, right_index_barrier)?;

        let mut chunks = Vec::with_capacity(self.num_chunks as usize);
        for chunk_id in 0..self.num_chunks {
            let size = self.chunk_len(chunk_id);
            let left =
                self.chunk_value_reader(left_type, left_field_id, chunk_id, left_data_barrier)?;
            let right =
                self.chunk_value_reader(right_type, right_field_id, chunk_id, right_data_barrier)?;
            let mut bits = Bitset::new(size as usize);
            for i in 0..size {
                if left(i)?.compare(op, &right(i)?)? {
                    bits.set(i as usize, true);
                }
            }
            chunks.push(bits);
        }
        self.assemble_checked(chunks)
    }
}
