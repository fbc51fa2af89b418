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

//! Predicate evaluator
//!
//! [`Evaluator`] walks an expression tree against one segment and
//! produces a [`Bitset`] with one bit per row. Evaluation is
//! single-threaded and snapshots the segment's row count and chunk
//! geometry at entry; barriers observed mid-walk are read per field but
//! must not retreat while an evaluation runs.
//!
//! Field predicates share two chunked execution skeletons:
//!
//! - **index-first**: chunks below the field's index barrier are
//!   answered by the scalar index, the rest by an element-wise scan of
//!   the raw span.
//! - **data-first**: used when the predicate needs raw values even
//!   where an index exists (arithmetic); chunks below the data barrier
//!   are scanned raw, the rest reconstitute values through the index's
//!   reverse lookup.
//!
//! Per-chunk results are assembled in chunk order, and every recursive
//! step is checked against the snapshot row count.

mod arith;
mod compare;
mod range;
mod term;
mod udf;

use tracing::debug;

use crate::common::Bitset;
use crate::core::{Element, ElementType, FieldId, Result, Scalar};
use crate::expr::{Expr, LogicalBinaryOp, LogicalUnaryOp};
use crate::segment::{ScalarIndex, SegmentReader};

/// Evaluate an expression against a segment at a read timestamp
///
/// The returned bitset's length equals the segment's row count.
pub fn evaluate<S: SegmentReader>(segment: &S, expr: &Expr, read_ts: u64) -> Result<Bitset> {
    Evaluator::new(segment, read_ts).evaluate(expr)
}

/// Walks an expression tree over one segment
pub struct Evaluator<'a, S: SegmentReader> {
    segment: &'a S,
    row_count: i64,
    size_per_chunk: i64,
    num_chunks: i64,
    read_ts: u64,
}

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    /// Create an evaluator, snapshotting the segment geometry
    pub fn new(segment: &'a S, read_ts: u64) -> Self {
        let row_count = segment.row_count();
        let size_per_chunk = segment.size_per_chunk();
        let num_chunks = (row_count + size_per_chunk - 1) / size_per_chunk;
        Self {
            segment,
            row_count,
            size_per_chunk,
            num_chunks,
            read_ts,
        }
    }

    /// Evaluate the expression tree to a row-aligned selection mask
    pub fn evaluate(&self, expr: &Expr) -> Result<Bitset> {
        debug!(row_count = self.row_count, read_ts = self.read_ts, "evaluating predicate");
        self.eval_node(expr)
    }

    fn eval_node(&self, expr: &Expr) -> Result<Bitset> {
        let bits = match expr {
            Expr::LogicalUnary { op, child } => self.eval_logical_unary(*op, child)?,
            Expr::LogicalBinary { op, left, right } => {
                self.eval_logical_binary(*op, left, right)?
            }
            Expr::UnaryRange {
                field_id,
                element_type,
                op,
                value,
            } => self.eval_unary_range(*field_id, *element_type, *op, value)?,
            Expr::BinaryRange {
                field_id,
                element_type,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => self.eval_binary_range(
                *field_id,
                *element_type,
                lower,
                upper,
                *lower_inclusive,
                *upper_inclusive,
            )?,
            Expr::BinaryArithOpEvalRange {
                field_id,
                element_type,
                arith_op,
                right_operand,
                op,
                value,
            } => self.eval_arith_eval_range(
                *field_id,
                *element_type,
                *arith_op,
                right_operand,
                *op,
                value,
            )?,
            Expr::Term {
                field_id,
                element_type,
                values,
            } => self.eval_term(*field_id, *element_type, values)?,
            Expr::Compare {
                left_field_id,
                left_type,
                right_field_id,
                right_type,
                op,
            } => self.eval_compare(*left_field_id, *left_type, *right_field_id, *right_type, *op)?,
            Expr::Udf {
                func_name,
                wasm_body,
                args,
            } => self.eval_udf(func_name, wasm_body, args)?,
        };
        if bits.len() as i64 != self.row_count {
            return Err(crate::core::Error::invariant(format!(
                "result size {} not equal to row count {}",
                bits.len(),
                self.row_count
            )));
        }
        Ok(bits)
    }

    // =========================================================================
    // Logical combinators
    // =========================================================================

    fn eval_logical_unary(&self, op: LogicalUnaryOp, child: &Expr) -> Result<Bitset> {
        let mut bits = self.eval_node(child)?;
        match op {
            LogicalUnaryOp::Not => bits.flip(),
        }
        Ok(bits)
    }

    /// Both children are always fully evaluated; logical operators do
    /// not short-circuit, keeping evaluation cost deterministic.
    fn eval_logical_binary(&self, op: LogicalBinaryOp, left: &Expr, right: &Expr) -> Result<Bitset> {
        let mut result = self.eval_node(left)?;
        let right = self.eval_node(right)?;
        match op {
            LogicalBinaryOp::And => result &= &right,
            LogicalBinaryOp::Or => result |= &right,
            LogicalBinaryOp::Xor => result ^= &right,
            LogicalBinaryOp::Minus => result -= &right,
        }
        Ok(result)
    }

    // =========================================================================
    // Chunked execution skeletons
    // =========================================================================

    /// Length of a chunk: `size_per_chunk`, except the short remainder
    /// for the final chunk
    fn chunk_len(&self, chunk_id: i64) -> i64 {
        if chunk_id == self.num_chunks - 1 {
            self.row_count - chunk_id * self.size_per_chunk
        } else {
            self.size_per_chunk
        }
    }

    /// Index-first skeleton shared by range and term predicates
    ///
    /// Chunks `[0, index_barrier)` go through `index_func`; the rest are
    /// scanned element-wise with `elem_func`.
    fn eval_chunked<T, IF, EF>(
        &self,
        field_id: FieldId,
        index_func: IF,
        elem_func: EF,
    ) -> Result<Bitset>
    where
        T: Element,
        IF: Fn(&dyn ScalarIndex<T>) -> Result<Bitset>,
        EF: Fn(&T) -> bool,
    {
        let index_barrier = self.segment.num_chunk_index(field_id)?;
        let mut chunks = Vec::with_capacity(self.num_chunks as usize);
        for chunk_id in 0..index_barrier.min(self.num_chunks) {
            let index = self.segment.chunk_scalar_index::<T>(field_id, chunk_id)?;
            let bits = index_func(index)?;
            let expected = self.chunk_len(chunk_id);
            if bits.len() as i64 != expected {
                return Err(crate::core::Error::invariant(format!(
                    "index result for field {} chunk {} has {} bits, expected {}",
                    field_id,
                    chunk_id,
                    bits.len(),
                    expected
                )));
            }
            chunks.push(bits);
        }
        for chunk_id in index_barrier..self.num_chunks {
            let span = self.segment.chunk_data::<T>(field_id, chunk_id)?;
            let expected = self.chunk_len(chunk_id);
            if span.len() as i64 != expected {
                return Err(crate::core::Error::invariant(format!(
                    "raw span for field {} chunk {} has {} rows, expected {}",
                    field_id,
                    chunk_id,
                    span.len(),
                    expected
                )));
            }
            let mut bits = Bitset::new(span.len());
            for (i, x) in span.iter().enumerate() {
                if elem_func(x) {
                    bits.set(i, true);
                }
            }
            chunks.push(bits);
        }
        self.assemble_checked(chunks)
    }

    /// Data-first skeleton for predicates that need raw values
    ///
    /// Chunks `[0, data_barrier)` are scanned raw; chunks
    /// `[data_barrier, index_barrier)` reconstitute each value through
    /// the index's reverse lookup. `elem_func` may fail (arithmetic
    /// faults propagate).
    fn eval_data_first<T, EF>(&self, field_id: FieldId, elem_func: EF) -> Result<Bitset>
    where
        T: Element,
        EF: Fn(&T) -> Result<bool>,
    {
        let data_barrier = self.segment.num_chunk_data(field_id)?;
        let index_barrier = self.segment.num_chunk_index(field_id)?;
        self.check_barriers(field_id, data_barrier, index_barrier)?;

        let mut chunks = Vec::with_capacity(self.num_chunks as usize);
        for chunk_id in 0..data_barrier {
            let span = self.segment.chunk_data::<T>(field_id, chunk_id)?;
            let mut bits = Bitset::new(span.len());
            for (i, x) in span.iter().enumerate() {
                if elem_func(x)? {
                    bits.set(i, true);
                }
            }
            chunks.push(bits);
        }
        for chunk_id in data_barrier..index_barrier {
            let index = self.segment.chunk_scalar_index::<T>(field_id, chunk_id)?;
            let this_size = index.count();
            if this_size != self.chunk_len(chunk_id) {
                return Err(crate::core::Error::invariant(format!(
                    "index for field {} chunk {} covers {} rows, expected {}",
                    field_id,
                    chunk_id,
                    this_size,
                    self.chunk_len(chunk_id)
                )));
            }
            let mut bits = Bitset::new(this_size as usize);
            for offset in 0..this_size {
                let x = index.reverse_lookup(offset)?;
                if elem_func(&x)? {
                    bits.set(offset as usize, true);
                }
            }
            chunks.push(bits);
        }
        self.assemble_checked(chunks)
    }

    fn check_barriers(
        &self,
        field_id: FieldId,
        data_barrier: i64,
        index_barrier: i64,
    ) -> Result<()> {
        if data_barrier.max(index_barrier) != self.num_chunks {
            return Err(crate::core::Error::invariant(format!(
                "max(data barrier {}, index barrier {}) for field {} not equal to chunk count {}",
                data_barrier, index_barrier, field_id, self.num_chunks
            )));
        }
        Ok(())
    }

    fn assemble_checked(&self, chunks: Vec<Bitset>) -> Result<Bitset> {
        let result = Bitset::assemble(chunks);
        if result.len() as i64 != self.row_count {
            return Err(crate::core::Error::invariant(format!(
                "assembled size {} not equal to row count {}",
                result.len(),
                self.row_count
            )));
        }
        Ok(result)
    }

    // =========================================================================
    // Type-erased per-chunk value access (Compare, Udf)
    // =========================================================================

    /// Build a row accessor for one chunk of one field
    ///
    /// The accessor reads the raw span when the chunk is below the
    /// field's data barrier and falls back to the scalar index's reverse
    /// lookup otherwise.
    fn chunk_value_reader(
        &self,
        element_type: ElementType,
        field_id: FieldId,
        chunk_id: i64,
        data_barrier: i64,
    ) -> Result<Box<dyn Fn(i64) -> Result<Scalar> + 'a>> {
        match element_type {
            ElementType::Bool => self.value_reader_for::<bool>(field_id, chunk_id, data_barrier),
            ElementType::Int8 => self.value_reader_for::<i8>(field_id, chunk_id, data_barrier),
            ElementType::Int16 => self.value_reader_for::<i16>(field_id, chunk_id, data_barrier),
            ElementType::Int32 => self.value_reader_for::<i32>(field_id, chunk_id, data_barrier),
            ElementType::Int64 => self.value_reader_for::<i64>(field_id, chunk_id, data_barrier),
            ElementType::Float32 => self.value_reader_for::<f32>(field_id, chunk_id, data_barrier),
            ElementType::Float64 => self.value_reader_for::<f64>(field_id, chunk_id, data_barrier),
            ElementType::Text => self.value_reader_for::<String>(field_id, chunk_id, data_barrier),
        }
    }

    fn value_reader_for<T: Element>(
        &self,
        field_id: FieldId,
        chunk_id: i64,
        data_barrier: i64,
    ) -> Result<Box<dyn Fn(i64) -> Result<Scalar> + 'a>> {
        if chunk_id < data_barrier {
            let span = self.segment.chunk_data::<T>(field_id, chunk_id)?;
            Ok(Box::new(move |i| {
                span.get(i as usize)
                    .cloned()
                    .map(Element::into_scalar)
                    .ok_or_else(|| {
                        crate::core::Error::invariant(format!(
                            "row {} out of chunk span of {} rows",
                            i,
                            span.len()
                        ))
                    })
            }))
        } else {
            let index = self.segment.chunk_scalar_index::<T>(field_id, chunk_id)?;
            Ok(Box::new(move |i| {
                index.reverse_lookup(i).map(Element::into_scalar)
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::common::Bitset;
    use crate::core::{ElementType, FieldId, Operator, Scalar, SchemaBuilder};
    use crate::expr::Expr;
    use crate::segment::{MemorySegment, MemorySegmentBuilder, SegmentConfig};

    use super::evaluate;

    fn sample_segment(size_per_chunk: i64) -> MemorySegment {
        let schema = SchemaBuilder::new()
            .add_primary_field(100, "id", ElementType::Int64)
            .add_field(101, "age", ElementType::Int32)
            .build()
            .unwrap();
        let mut builder = MemorySegmentBuilder::with_config(
            schema,
            SegmentConfig::new().with_size_per_chunk(size_per_chunk),
        );
        for (id, age) in [(1i64, 10i32), (2, 20), (3, 30), (4, 20), (5, 50), (6, 15)] {
            builder
                .push_row(&[Scalar::Int64(id), Scalar::Int32(age)], id as u64)
                .unwrap();
        }
        builder.build()
    }

    fn age_gt(threshold: i32) -> Expr {
        Expr::unary_range(
            101,
            ElementType::Int32,
            Operator::Gt,
            Scalar::Int32(threshold),
        )
    }

    fn age_lt(threshold: i32) -> Expr {
        Expr::unary_range(
            101,
            ElementType::Int32,
            Operator::Lt,
            Scalar::Int32(threshold),
        )
    }

    // =========================================================================
    // Universal invariants
    // =========================================================================

    #[test]
    fn test_result_length_equals_row_count() {
        for spc in [1, 2, 3, 6, 100] {
            let segment = sample_segment(spc);
            let bits = evaluate(&segment, &age_gt(25), u64::MAX).unwrap();
            assert_eq!(bits.len(), 6, "size_per_chunk {}", spc);
        }
    }

    #[test]
    fn test_not_is_flip() {
        let segment = sample_segment(2);
        let positive = evaluate(&segment, &age_gt(25), u64::MAX).unwrap();
        let negated = evaluate(&segment, &Expr::not(age_gt(25)), u64::MAX).unwrap();
        let mut flipped = positive.clone();
        flipped.flip();
        assert_eq!(negated, flipped);
    }

    #[test]
    fn test_double_not_is_identity() {
        let segment = sample_segment(2);
        let original = evaluate(&segment, &age_gt(25), u64::MAX).unwrap();
        let doubled = evaluate(&segment, &Expr::not(Expr::not(age_gt(25))), u64::MAX).unwrap();
        assert_eq!(original, doubled);
    }

    #[test]
    fn test_logical_binary_matches_bitset_algebra() {
        let segment = sample_segment(2);
        let a = evaluate(&segment, &age_gt(15), u64::MAX).unwrap();
        let b = evaluate(&segment, &age_lt(35), u64::MAX).unwrap();

        let and = evaluate(&segment, &Expr::and(age_gt(15), age_lt(35)), u64::MAX).unwrap();
        let mut expected = a.clone();
        expected &= &b;
        assert_eq!(and, expected);

        let or = evaluate(&segment, &Expr::or(age_gt(15), age_lt(35)), u64::MAX).unwrap();
        let mut expected = a.clone();
        expected |= &b;
        assert_eq!(or, expected);

        let xor = evaluate(&segment, &Expr::xor(age_gt(15), age_lt(35)), u64::MAX).unwrap();
        let mut expected = a.clone();
        expected ^= &b;
        assert_eq!(xor, expected);

        let minus = evaluate(&segment, &Expr::minus(age_gt(15), age_lt(35)), u64::MAX).unwrap();
        let mut expected = a.clone();
        expected -= &b;
        assert_eq!(minus, expected);
    }

    #[test]
    fn test_index_path_matches_element_path() {
        // same rows, three barrier layouts: all raw, all indexed with
        // raw retained, all indexed with raw dropped
        let raw = sample_segment(2);

        let mut indexed = sample_segment(2);
        indexed.build_scalar_index(FieldId(101)).unwrap();

        let mut index_only = sample_segment(2);
        index_only.build_scalar_index(FieldId(101)).unwrap();
        index_only.drop_chunk_data(FieldId(101), 0).unwrap();

        let exprs = [
            age_gt(20),
            Expr::unary_range(101, ElementType::Int32, Operator::Eq, Scalar::Int32(20)),
            Expr::binary_range(
                101,
                ElementType::Int32,
                Scalar::Int32(15),
                Scalar::Int32(30),
                true,
                false,
            ),
            Expr::term(
                101,
                ElementType::Int32,
                vec![Scalar::Int32(10), Scalar::Int32(50)],
            ),
        ];
        for expr in &exprs {
            let from_raw = evaluate(&raw, expr, u64::MAX).unwrap();
            let from_indexed = evaluate(&indexed, expr, u64::MAX).unwrap();
            let from_index_only = evaluate(&index_only, expr, u64::MAX).unwrap();
            assert_eq!(from_raw, from_indexed, "{:?}", expr);
            assert_eq!(from_raw, from_index_only, "{:?}", expr);
        }
    }

    #[test]
    fn test_unary_eq_equals_singleton_term() {
        let segment = sample_segment(2);
        let eq = Expr::unary_range(101, ElementType::Int32, Operator::Eq, Scalar::Int32(20));
        let term = Expr::term(101, ElementType::Int32, vec![Scalar::Int32(20)]);
        assert_eq!(
            evaluate(&segment, &eq, u64::MAX).unwrap(),
            evaluate(&segment, &term, u64::MAX).unwrap()
        );
    }

    #[test]
    fn test_chunk_layout_independence() {
        let schema = SchemaBuilder::new()
            .add_field(1, "v", ElementType::Int64)
            .build()
            .unwrap();
        let mut rng = rand::thread_rng();
        let rows: Vec<i64> = (0..257).map(|_| rng.gen_range(-50..50)).collect();

        let mut results = Vec::new();
        for spc in [1i64, 2, 16, 64, 300] {
            let mut builder = MemorySegmentBuilder::with_config(
                schema.clone(),
                SegmentConfig::new().with_size_per_chunk(spc),
            );
            for &v in &rows {
                builder.push_row(&[Scalar::Int64(v)], 0).unwrap();
            }
            let mut segment = builder.build();

            let expr = Expr::and(
                Expr::unary_range(1, ElementType::Int64, Operator::Ge, Scalar::Int64(-10)),
                Expr::not(Expr::unary_range(
                    1,
                    ElementType::Int64,
                    Operator::Gt,
                    Scalar::Int64(25),
                )),
            );
            results.push(evaluate(&segment, &expr, u64::MAX).unwrap());

            // and again with indexes serving every chunk
            segment.build_scalar_index(FieldId(1)).unwrap();
            segment.drop_chunk_data(FieldId(1), 0).unwrap();
            results.push(evaluate(&segment, &expr, u64::MAX).unwrap());
        }
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
    }

    #[test]
    fn test_empty_segment() {
        let schema = SchemaBuilder::new()
            .add_field(1, "v", ElementType::Int64)
            .build()
            .unwrap();
        let segment = MemorySegmentBuilder::new(schema).build();
        let expr = Expr::unary_range(1, ElementType::Int64, Operator::Eq, Scalar::Int64(1));
        let bits = evaluate(&segment, &expr, u64::MAX).unwrap();
        assert_eq!(bits.len(), 0);

        let bits = evaluate(&segment, &Expr::not(expr), u64::MAX).unwrap();
        assert!(bits.is_empty());
    }

    #[test]
    fn test_broken_barriers_rejected() {
        use crate::core::{Element, Error, Result, Schema};
        use crate::segment::{IdList, ScalarIndex, SegmentReader};

        // a reader whose barriers never cover the chunk range
        struct BrokenBarrierSegment {
            schema: Schema,
        }

        impl SegmentReader for BrokenBarrierSegment {
            fn schema(&self) -> &Schema {
                &self.schema
            }

            fn row_count(&self) -> i64 {
                4
            }

            fn size_per_chunk(&self) -> i64 {
                2
            }

            fn num_chunk_data(&self, _field_id: crate::core::FieldId) -> Result<i64> {
                Ok(1)
            }

            fn num_chunk_index(&self, _field_id: crate::core::FieldId) -> Result<i64> {
                Ok(0)
            }

            fn chunk_data<T: Element>(
                &self,
                field_id: crate::core::FieldId,
                chunk_id: i64,
            ) -> Result<&[T]> {
                Err(Error::MissingChunkData { field: field_id, chunk_id })
            }

            fn chunk_scalar_index<T: Element>(
                &self,
                field_id: crate::core::FieldId,
                chunk_id: i64,
            ) -> Result<&dyn ScalarIndex<T>> {
                Err(Error::MissingChunkIndex { field: field_id, chunk_id })
            }

            fn search_ids(&self, _ids: &IdList, _read_ts: u64) -> Result<(IdList, Vec<i64>)> {
                Err(Error::invariant("no id index".to_string()))
            }
        }

        let segment = BrokenBarrierSegment {
            schema: SchemaBuilder::new()
                .add_field(1, "v", ElementType::Int32)
                .build()
                .unwrap(),
        };
        // max(data barrier 1, index barrier 0) != 2 chunks
        let expr = Expr::arith_eval_range(
            1,
            ElementType::Int32,
            crate::core::ArithOp::Add,
            Scalar::Int32(1),
            Operator::Eq,
            Scalar::Int32(2),
        );
        assert!(matches!(
            evaluate(&segment, &expr, u64::MAX).unwrap_err(),
            Error::InvariantViolation(_)
        ));
    }

    #[test]
    fn test_nested_logical_tree() {
        let segment = sample_segment(2);
        // (age > 15 AND age < 35) OR NOT (age > 10)
        let expr = Expr::or(
            Expr::and(age_gt(15), age_lt(35)),
            Expr::not(age_gt(10)),
        );
        let bits = evaluate(&segment, &expr, u64::MAX).unwrap();
        // ages 10 20 30 20 50 15: the AND keeps 20/30/20, the NOT
        // keeps only the first row
        let mut expected = Bitset::from_bools(&[false, true, true, true, false, false]);
        expected |= &Bitset::from_bools(&[true, false, false, false, false, false]);
        assert_eq!(bits, expected);
    }
}
