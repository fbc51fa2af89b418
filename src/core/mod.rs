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

//! Core types and definitions for the segment predicate engine
//!
//! This module contains the fundamental types used throughout the crate:
//!
//! - [`ElementType`] - scalar element types (BOOL, INT8..INT64, FLOAT32/64, TEXT)
//! - [`Operator`] - comparison operators (=, !=, <, <=, >, >=, PREFIX_MATCH)
//! - [`ArithOp`] - arithmetic operators for arithmetic-then-compare predicates
//! - [`Scalar`] - runtime values with type information
//! - [`Element`] / [`ArithElement`] - the typed seam chunk dispatch is generic over
//! - [`Schema`] / [`FieldMeta`] / [`FieldId`] - segment field layout
//! - [`Error`] - error kinds for all evaluation failures

pub mod error;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use schema::{FieldId, FieldMeta, Schema, SchemaBuilder};
pub use types::{ArithOp, ElementType, Operator};
pub use value::{ArithElement, Element, Scalar};
