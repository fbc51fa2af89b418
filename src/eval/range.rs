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

//! Range predicate dispatch
//!
//! Unary ranges (`field <op> value`) and binary ranges
//! (`lower <(=) field <(=) upper`) both run on the index-first chunked
//! skeleton: membership and range queries against indexed chunks,
//! element-wise comparison against raw chunks.

use super::Evaluator;
use crate::common::Bitset;
use crate::core::{Element, ElementType, Error, FieldId, Operator, Result, Scalar};
use crate::segment::{ScalarIndex, SegmentReader};

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    pub(super) fn eval_unary_range(
        &self,
        field_id: FieldId,
        element_type: ElementType,
        op: Operator,
        value: &Scalar,
    ) -> Result<Bitset> {
        self.segment
            .schema()
            .check_field_type(field_id, element_type)?;
        match element_type {
            ElementType::Bool => self.unary_range_dispatch::<bool>(field_id, op, value),
            ElementType::Int8 => self.unary_range_dispatch::<i8>(field_id, op, value),
            ElementType::Int16 => self.unary_range_dispatch::<i16>(field_id, op, value),
            ElementType::Int32 => self.unary_range_dispatch::<i32>(field_id, op, value),
            ElementType::Int64 => self.unary_range_dispatch::<i64>(field_id, op, value),
            ElementType::Float32 => self.unary_range_dispatch::<f32>(field_id, op, value),
            ElementType::Float64 => self.unary_range_dispatch::<f64>(field_id, op, value),
            ElementType::Text => self.unary_range_dispatch::<String>(field_id, op, value),
        }
    }

    fn unary_range_dispatch<T: Element>(
        &self,
        field_id: FieldId,
        op: Operator,
        value: &Scalar,
    ) -> Result<Bitset> {
        let val = typed_operand::<T>(value)?;
        match op {
            Operator::Eq => self.eval_chunked::<T, _, _>(
                field_id,
                |index| Ok(index.in_set(std::slice::from_ref(&val))),
                |x| *x == val,
            ),
            Operator::Ne => self.eval_chunked::<T, _, _>(
                field_id,
                |index| Ok(index.not_in_set(std::slice::from_ref(&val))),
                |x| *x != val,
            ),
            Operator::Lt => self.eval_chunked::<T, _, _>(
                field_id,
                |index| index.range(&val, Operator::Lt),
                |x| *x < val,
            ),
            Operator::Le => self.eval_chunked::<T, _, _>(
                field_id,
                |index| index.range(&val, Operator::Le),
                |x| *x <= val,
            ),
            Operator::Gt => self.eval_chunked::<T, _, _>(
                field_id,
                |index| index.range(&val, Operator::Gt),
                |x| *x > val,
            ),
            Operator::Ge => self.eval_chunked::<T, _, _>(
                field_id,
                |index| index.range(&val, Operator::Ge),
                |x| *x >= val,
            ),
            Operator::PrefixMatch => {
                let prefix = match val.as_str() {
                    Some(s) => s.to_string(),
                    None => {
                        return Err(Error::UnsupportedOperator {
                            op,
                            element_type: T::ELEMENT_TYPE,
                        });
                    }
                };
                self.eval_chunked::<T, _, _>(
                    field_id,
                    |index| index.prefix_query(&prefix),
                    |x| x.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
                )
            }
        }
    }

    pub(super) fn eval_binary_range(
        &self,
        field_id: FieldId,
        element_type: ElementType,
        lower: &Scalar,
        upper: &Scalar,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Bitset> {
        self.segment
            .schema()
            .check_field_type(field_id, element_type)?;
        match element_type {
            ElementType::Bool => self.binary_range_dispatch::<bool>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Int8 => self.binary_range_dispatch::<i8>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Int16 => self.binary_range_dispatch::<i16>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Int32 => self.binary_range_dispatch::<i32>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Int64 => self.binary_range_dispatch::<i64>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Float32 => self.binary_range_dispatch::<f32>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Float64 => self.binary_range_dispatch::<f64>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
            ElementType::Text => self.binary_range_dispatch::<String>(
                field_id,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            ),
        }
    }

    fn binary_range_dispatch<T: Element>(
        &self,
        field_id: FieldId,
        lower: &Scalar,
        upper: &Scalar,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Bitset> {
        let lo = typed_operand::<T>(lower)?;
        let hi = typed_operand::<T>(upper)?;
        let index_func = |index: &dyn ScalarIndex<T>| {
            Ok(index.range_between(&lo, lower_inclusive, &hi, upper_inclusive))
        };
        let elem_func = |x: &T| {
            let above = if lower_inclusive { *x >= lo } else { *x > lo };
            let below = if upper_inclusive { *x <= hi } else { *x < hi };
            above && below
        };
        self.eval_chunked::<T, _, _>(field_id, index_func, elem_func)
    }
}

/// Convert an expression operand to the dispatched element type
///
/// The operand was written alongside the declared element type, so a
/// mismatch is a malformed expression rather than a schema problem.
pub(super) fn typed_operand<T: Element>(value: &Scalar) -> Result<T> {
    T::from_scalar(value).ok_or_else(|| {
        Error::invariant(format!(
            "operand {} is {}, predicate dispatched as {}",
            value,
            value.element_type(),
            T::ELEMENT_TYPE
        ))
    })
}
