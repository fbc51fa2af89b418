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

//! WebAssembly UDF predicate dispatch
//!
//! The expression carries its own module body; evaluation registers it
//! under the function name (a no-op when already present) and then
//! invokes the function once per row. Field arguments are fetched
//! through the same per-chunk value readers Compare uses; literals are
//! marshalled once. The argument buffer is reused across rows.

use smallvec::SmallVec;
use wasmtime::Val;

use super::Evaluator;
use crate::common::Bitset;
use crate::core::{ElementType, Error, FieldId, Result, Scalar};
use crate::expr::{UdfArg, UdfArgSource};
use crate::segment::SegmentReader;
use crate::wasm::{ModuleType, WasmFunctionRegistry};

impl<'a, S: SegmentReader> Evaluator<'a, S> {
    pub(super) fn eval_udf(
        &self,
        func_name: &str,
        wasm_body: &str,
        args: &[UdfArg],
    ) -> Result<Bitset> {
        let schema = self.segment.schema();
        let mut field_barriers: Vec<Option<(FieldId, i64)>> = Vec::with_capacity(args.len());
        for arg in args {
            match &arg.source {
                UdfArgSource::Field(field_id) => {
                    schema.check_field_type(*field_id, arg.element_type)?;
                    let data_barrier = self.segment.num_chunk_data(*field_id)?;
                    let index_barrier = self.segment.num_chunk_index(*field_id)?;
                    self.check_barriers(*field_id, data_barrier, index_barrier)?;
                    field_barriers.push(Some((*field_id, data_barrier)));
                }
                UdfArgSource::Literal(value) => {
                    if value.element_type() != arg.element_type {
                        return Err(Error::invariant(format!(
                            "udf literal {} is {}, argument declares {}",
                            value,
                            value.element_type(),
                            arg.element_type
                        )));
                    }
                    field_barriers.push(None);
                }
            }
        }

        let registry = WasmFunctionRegistry::global();
        if !registry.register(ModuleType::Wat, func_name, func_name, wasm_body) {
            return Err(Error::UdfCompile {
                name: func_name.to_string(),
                reason: "payload failed to decode, compile, or bind".to_string(),
            });
        }

        // literals marshal once; fields marshal per row
        let mut literal_vals: Vec<Option<Val>> = Vec::with_capacity(args.len());
        for arg in args {
            match &arg.source {
                UdfArgSource::Literal(value) => literal_vals.push(Some(scalar_to_val(value)?)),
                UdfArgSource::Field(_) => literal_vals.push(None),
            }
        }

        let mut chunks = Vec::with_capacity(self.num_chunks as usize);
        let mut params: SmallVec<[Val; 8]> = SmallVec::new();
        for chunk_id in 0..self.num_chunks {
            let size = self.chunk_len(chunk_id);
            let mut readers = Vec::with_capacity(args.len());
            for (arg, barrier) in args.iter().zip(&field_barriers) {
                match barrier {
                    Some((field_id, data_barrier)) => readers.push(Some(self.chunk_value_reader(
                        arg.element_type,
                        *field_id,
                        chunk_id,
                        *data_barrier,
                    )?)),
                    None => readers.push(None),
                }
            }
            let mut bits = Bitset::new(size as usize);
            for i in 0..size {
                params.clear();
                for (reader, literal) in readers.iter().zip(&literal_vals) {
                    match (reader, literal) {
                        (Some(read), _) => params.push(scalar_to_val(&read(i)?)?),
                        (None, Some(val)) => params.push(val.clone()),
                        (None, None) => unreachable!("argument is either field or literal"),
                    }
                }
                if registry.run_elem_func(func_name, &params)? {
                    bits.set(i as usize, true);
                }
            }
            chunks.push(bits);
        }
        self.assemble_checked(chunks)
    }
}

/// Marshal a scalar to its WASM-native value
///
/// Bool and the narrow integers widen to i32, Int64 maps to i64, floats
/// keep their width. TEXT has no WASM-native representation.
fn scalar_to_val(value: &Scalar) -> Result<Val> {
    match value {
        Scalar::Bool(v) => Ok(Val::I32(*v as i32)),
        Scalar::Int8(v) => Ok(Val::I32(*v as i32)),
        Scalar::Int16(v) => Ok(Val::I32(*v as i32)),
        Scalar::Int32(v) => Ok(Val::I32(*v)),
        Scalar::Int64(v) => Ok(Val::I64(*v)),
        Scalar::Float32(v) => Ok(Val::F32(v.to_bits())),
        Scalar::Float64(v) => Ok(Val::F64(v.to_bits())),
        Scalar::Text(_) => Err(Error::UnsupportedType {
            variant: "wasm argument",
            element_type: ElementType::Text,
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{ElementType, Error, Scalar, SchemaBuilder};
    use crate::eval::evaluate;
    use crate::expr::{Expr, UdfArg};
    use crate::segment::{MemorySegment, MemorySegmentBuilder, SegmentConfig};
    use crate::wasm::fixtures::{encode, EQUAL_WAT, LARGER_THAN_WAT};

    fn float_segment() -> MemorySegment {
        let schema = SchemaBuilder::new()
            .add_field(1, "x", ElementType::Float64)
            .build()
            .unwrap();
        let mut builder = MemorySegmentBuilder::with_config(
            schema,
            SegmentConfig::new().with_size_per_chunk(2),
        );
        for x in [0.3f64, 0.5, 0.7] {
            builder.push_row(&[Scalar::Float64(x)], 0).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_udf_column_against_literal() {
        let segment = float_segment();
        let expr = Expr::udf(
            "larger_than",
            encode(LARGER_THAN_WAT),
            vec![
                UdfArg::field(crate::core::FieldId(1), ElementType::Float64),
                UdfArg::literal(Scalar::Float64(0.5)),
            ],
        );
        let bits = evaluate(&segment, &expr, u64::MAX).unwrap();
        // strict greater: 0.5 does not match
        assert_eq!(bits.to_string(), "001");
    }

    #[test]
    fn test_udf_two_int_fields() {
        let schema = SchemaBuilder::new()
            .add_field(1, "a", ElementType::Int32)
            .add_field(2, "b", ElementType::Int32)
            .build()
            .unwrap();
        let mut builder = MemorySegmentBuilder::with_config(
            schema,
            SegmentConfig::new().with_size_per_chunk(2),
        );
        for (a, b) in [(1i32, 1i32), (2, 3), (4, 4)] {
            builder
                .push_row(&[Scalar::Int32(a), Scalar::Int32(b)], 0)
                .unwrap();
        }
        let segment = builder.build();

        let expr = Expr::udf(
            "equal",
            encode(EQUAL_WAT),
            vec![
                UdfArg::field(crate::core::FieldId(1), ElementType::Int32),
                UdfArg::field(crate::core::FieldId(2), ElementType::Int32),
            ],
        );
        let bits = evaluate(&segment, &expr, u64::MAX).unwrap();
        assert_eq!(bits.to_string(), "101");
    }

    #[test]
    fn test_udf_bad_module_fails_registration() {
        let segment = float_segment();
        let expr = Expr::udf(
            "udf_bad_body",
            encode("(not a module"),
            vec![UdfArg::field(crate::core::FieldId(1), ElementType::Float64)],
        );
        assert!(matches!(
            evaluate(&segment, &expr, u64::MAX).unwrap_err(),
            Error::UdfCompile { .. }
        ));
    }

    #[test]
    fn test_udf_field_type_checked_against_schema() {
        let segment = float_segment();
        let expr = Expr::udf(
            "larger_than",
            encode(LARGER_THAN_WAT),
            vec![
                UdfArg::field(crate::core::FieldId(1), ElementType::Float32),
                UdfArg::literal(Scalar::Float64(0.5)),
            ],
        );
        assert!(matches!(
            evaluate(&segment, &expr, u64::MAX).unwrap_err(),
            Error::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_udf_text_argument_rejected() {
        let schema = SchemaBuilder::new()
            .add_field(1, "s", ElementType::Text)
            .build()
            .unwrap();
        let mut builder = MemorySegmentBuilder::new(schema);
        builder.push_row(&[Scalar::text("x")], 0).unwrap();
        let segment = builder.build();

        let wat = r#"(module
  (func $f (param i32 i32) (result i32)
    i32.const 1)
  (export "udf_text_arg" (func $f)))"#;
        let expr = Expr::udf(
            "udf_text_arg",
            encode(wat),
            vec![
                UdfArg::field(crate::core::FieldId(1), ElementType::Text),
                UdfArg::literal(Scalar::Int32(1)),
            ],
        );
        assert!(matches!(
            evaluate(&segment, &expr, u64::MAX).unwrap_err(),
            Error::UnsupportedType { .. }
        ));
    }
}
