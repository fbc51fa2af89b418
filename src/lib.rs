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

//! # Rowmask - scalar predicate evaluation for segment query engines
//!
//! Rowmask is the scalar filtering core of a vector-database segment
//! query engine: it takes a tree-shaped predicate over the scalar
//! columns of one data segment and produces a row-aligned boolean
//! selection mask, ready to be composed with vector-similarity results.
//!
//! ## Key Features
//!
//! - **Typed expression tree** - range, term, arithmetic-then-compare,
//!   field-to-field and WebAssembly UDF predicates over eight scalar
//!   element types
//! - **Chunked execution** - per chunk, evaluation transparently picks
//!   between raw column scans and pre-built scalar indexes based on the
//!   segment's materialization barriers
//! - **MVCC-aware primary-key terms** - IN-lists on the primary key go
//!   through the segment's visibility store at a read timestamp
//! - **Sandboxed UDFs** - predicates as WebAssembly modules, compiled
//!   once in a process-wide registry and invoked per row with typed
//!   argument marshalling
//! - **Bitset algebra** - dense masks with AND/OR/XOR/MINUS/NOT and
//!   chunk-order assembly
//!
//! ## Quick Start
//!
//! ```rust
//! use rowmask::{evaluate, ElementType, Expr, MemorySegmentBuilder, Operator, Scalar, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new()
//!     .add_primary_field(100, "id", ElementType::Int64)
//!     .add_field(101, "age", ElementType::Int32)
//!     .build()
//!     .unwrap();
//!
//! let mut builder = MemorySegmentBuilder::new(schema);
//! builder.push_row(&[Scalar::Int64(1), Scalar::Int32(27)], 1).unwrap();
//! builder.push_row(&[Scalar::Int64(2), Scalar::Int32(35)], 2).unwrap();
//! let segment = builder.build();
//!
//! let predicate = Expr::unary_range(101, ElementType::Int32, Operator::Gt, Scalar::Int32(30));
//! let mask = evaluate(&segment, &predicate, u64::MAX).unwrap();
//! assert_eq!(mask.to_string(), "01");
//! ```
//!
//! ## Modules
//!
//! - [`core`] - element types, operators, values, schema, errors
//! - [`common`] - the [`Bitset`] selection mask
//! - [`segment`] - segment access contract, chunk barriers, scalar indexes
//! - [`expr`] - the predicate expression tree
//! - [`eval`] - the chunked evaluator
//! - [`wasm`] - the process-wide WebAssembly UDF registry

pub mod common;
pub mod core;
pub mod eval;
pub mod expr;
pub mod segment;
pub mod wasm;

// Re-export main types for convenience
pub use common::Bitset;
pub use core::{
    ArithElement, ArithOp, Element, ElementType, Error, FieldId, FieldMeta, Operator, Result,
    Scalar, Schema, SchemaBuilder,
};
pub use eval::{evaluate, Evaluator};
pub use expr::{Expr, LogicalBinaryOp, LogicalUnaryOp, UdfArg, UdfArgSource};
pub use segment::{
    IdList, MemoryScalarIndex, MemorySegment, MemorySegmentBuilder, ScalarIndex, SegmentConfig,
    SegmentReader,
};
pub use wasm::{ModuleType, WasmFunctionRegistry};
