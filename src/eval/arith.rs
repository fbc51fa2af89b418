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

//! Arithmetic-then-compare predicate dispatch
//!
//! `(field ⊕ right_operand) ?= value` needs the raw row value even on
//! indexed chunks, so it runs on the data-first skeleton: raw chunks are
//! scanned and index-only chunks reconstitute values through reverse
//! lookup. Only Eq and Ne are accepted on the arithmetic result, and
//! only numeric element types are in the domain.

use super::range::typed_operand;
use super::Evaluator;
use crate::common::Bitset;
use crate::core::{ArithElement, ArithOp, ElementType, Error, FieldId, Operator, Result, Scalar};
use crate::segment::SegmentReader;

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    pub(super) fn eval_arith_eval_range(
        &self,
        field_id: FieldId,
        element_type: ElementType,
        arith_op: ArithOp,
        right_operand: &Scalar,
        op: Operator,
        value: &Scalar,
    ) -> Result<Bitset> {
        self.segment
            .schema()
            .check_field_type(field_id, element_type)?;
        if !matches!(op, Operator::Eq | Operator::Ne) {
            return Err(Error::UnsupportedOperator { op, element_type });
        }
        match element_type {
            ElementType::Int8 => {
                self.arith_dispatch::<i8>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Int16 => {
                self.arith_dispatch::<i16>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Int32 => {
                self.arith_dispatch::<i32>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Int64 => {
                self.arith_dispatch::<i64>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Float32 => {
                self.arith_dispatch::<f32>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Float64 => {
                self.arith_dispatch::<f64>(field_id, arith_op, right_operand, op, value)
            }
            ElementType::Bool | ElementType::Text => Err(Error::UnsupportedType {
                variant: "BinaryArithOpEvalRange",
                element_type,
            }),
        }
    }

    fn arith_dispatch<T: ArithElement>(
        &self,
        field_id: FieldId,
        arith_op: ArithOp,
        right_operand: &Scalar,
        op: Operator,
        value: &Scalar,
    ) -> Result<Bitset> {
        let rhs = typed_operand::<T>(right_operand)?;
        let val = typed_operand::<T>(value)?;
        let elem_func = move |x: &T| -> Result<bool> {
            let result = x.arith(arith_op, rhs)?;
            Ok(if op == Operator::Eq {
                result == val
            } else {
                result != val
            })
        };
        self.eval_data_first::<T, _>(field_id, elem_func)
    }
}
