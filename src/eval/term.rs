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

//! Term (set membership) predicate dispatch
//!
//! When the field is the segment's primary key with a PK-eligible type,
//! the term list becomes an id lookup through the segment's visibility
//! store, honoring the read timestamp. Every other field runs on the
//! index-first chunked skeleton with a hashed term set; the float types
//! are not `Eq + Hash`, so they probe the term list directly.

use std::hash::Hash;

use rustc_hash::FxHashSet;

use super::range::typed_operand;
use super::Evaluator;
use crate::common::Bitset;
use crate::core::{Element, ElementType, Error, FieldId, Result, Scalar};
use crate::segment::{IdList, SegmentReader};

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    pub(super) fn eval_term(
        &self,
        field_id: FieldId,
        element_type: ElementType,
        values: &[Scalar],
    ) -> Result<Bitset> {
        self.segment
            .schema()
            .check_field_type(field_id, element_type)?;

        let use_pk_index = self.segment.schema().primary_field_id() == Some(field_id)
            && element_type.is_primary_key_eligible();
        if use_pk_index {
            return self.eval_term_pk(element_type, values);
        }

        match element_type {
            ElementType::Bool => self.term_hashed::<bool>(field_id, values),
            ElementType::Int8 => self.term_hashed::<i8>(field_id, values),
            ElementType::Int16 => self.term_hashed::<i16>(field_id, values),
            ElementType::Int32 => self.term_hashed::<i32>(field_id, values),
            ElementType::Int64 => self.term_hashed::<i64>(field_id, values),
            ElementType::Text => self.term_hashed::<String>(field_id, values),
            // f32/f64 are not Eq + Hash; probe the sorted term list
            ElementType::Float32 => self.term_probed::<f32>(field_id, values),
            ElementType::Float64 => self.term_probed::<f64>(field_id, values),
        }
    }

    /// PK fast path: translate terms to ids, consult the visibility
    /// store at the snapshot read timestamp, and set the returned
    /// offsets
    fn eval_term_pk(&self, element_type: ElementType, values: &[Scalar]) -> Result<Bitset> {
        let ids = match element_type {
            ElementType::Int64 => IdList::Int(
                values
                    .iter()
                    .map(typed_operand::<i64>)
                    .collect::<Result<_>>()?,
            ),
            ElementType::Text => IdList::Str(
                values
                    .iter()
                    .map(typed_operand::<String>)
                    .collect::<Result<_>>()?,
            ),
            _ => {
                return Err(Error::UnsupportedType {
                    variant: "primary key term",
                    element_type,
                });
            }
        };
        let (_matched, offsets) = self.segment.search_ids(&ids, self.read_ts)?;
        let mut bits = Bitset::new(self.row_count as usize);
        for offset in offsets {
            if offset < 0 || offset >= self.row_count {
                return Err(Error::invariant(format!(
                    "search_ids offset {} out of row count {}",
                    offset, self.row_count
                )));
            }
            bits.set(offset as usize, true);
        }
        Ok(bits)
    }

    fn term_hashed<T: Element + Eq + Hash>(
        &self,
        field_id: FieldId,
        values: &[Scalar],
    ) -> Result<Bitset> {
        let terms: Vec<T> = values
            .iter()
            .map(typed_operand::<T>)
            .collect::<Result<_>>()?;
        let term_set: FxHashSet<T> = terms.iter().cloned().collect();
        self.eval_chunked::<T, _, _>(
            field_id,
            |index| Ok(index.in_set(&terms)),
            |x| term_set.contains(x),
        )
    }

    fn term_probed<T: Element>(&self, field_id: FieldId, values: &[Scalar]) -> Result<Bitset> {
        let terms: Vec<T> = values
            .iter()
            .map(typed_operand::<T>)
            .collect::<Result<_>>()?;
        self.eval_chunked::<T, _, _>(
            field_id,
            |index| Ok(index.in_set(&terms)),
            |x| terms.iter().any(|t| t == x),
        )
    }
}
