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

//! Error types for the segment predicate engine
//!
//! This module defines all error kinds an evaluation can surface. Every
//! kind aborts the current evaluation; none are recoverable locally.

use thiserror::Error;

use super::schema::FieldId;
use super::types::{ArithOp, ElementType, Operator};

/// Result type alias for predicate evaluation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for segment predicate evaluation
///
/// Each variant carries enough context to identify the component and the
/// condition that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // =========================================================================
    // Schema errors
    // =========================================================================
    /// Field id not present in the segment schema
    #[error("field {0} not found in schema")]
    FieldNotFound(FieldId),

    /// Declared element type does not match the schema's type for the field
    #[error("field {field} is {actual}, expression declares {declared}")]
    SchemaMismatch {
        field: FieldId,
        declared: ElementType,
        actual: ElementType,
    },

    /// Schema construction rejected the field layout
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    // =========================================================================
    // Dispatch errors
    // =========================================================================
    /// Operator not valid for this expression variant or element type
    #[error("operator {op} not supported on {element_type}")]
    UnsupportedOperator {
        op: Operator,
        element_type: ElementType,
    },

    /// Expression variant applied to an element type outside its domain
    #[error("{variant} does not support element type {element_type}")]
    UnsupportedType {
        variant: &'static str,
        element_type: ElementType,
    },

    /// Compare across unrelated element types; no implicit widening
    #[error("incompatible operands: {left} vs {right}")]
    IncompatibleOperands {
        left: ElementType,
        right: ElementType,
    },

    // =========================================================================
    // Evaluation invariants
    // =========================================================================
    /// Bitset size, barrier, or assembly invariant broken mid-evaluation
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Raw data requested for a chunk past the field's data barrier
    #[error("no raw data for field {field} chunk {chunk_id}")]
    MissingChunkData { field: FieldId, chunk_id: i64 },

    /// Scalar index requested for a chunk past the field's index barrier
    #[error("no scalar index for field {field} chunk {chunk_id}")]
    MissingChunkIndex { field: FieldId, chunk_id: i64 },

    // =========================================================================
    // Arithmetic errors
    // =========================================================================
    /// Integer division or modulo by zero
    #[error("arithmetic fault: {op} by zero")]
    ArithmeticFault { op: ArithOp },

    // =========================================================================
    // UDF errors
    // =========================================================================
    /// Function name not present in the WASM registry
    #[error("wasm function '{0}' not registered")]
    UdfNotFound(String),

    /// WASM payload failed to decode, compile, or bind
    #[error("wasm function '{name}' failed to register: {reason}")]
    UdfCompile { name: String, reason: String },

    /// WASM function trapped or returned an unusable result
    #[error("wasm function '{name}' call failed: {reason}")]
    UdfCall { name: String, reason: String },
}

impl Error {
    /// Build an invariant violation with a formatted context string
    pub fn invariant(context: impl Into<String>) -> Self {
        Error::InvariantViolation(context.into())
    }

    /// Returns true if this error is a schema-level failure
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound(_) | Error::SchemaMismatch { .. } | Error::InvalidSchema(_)
        )
    }

    /// Returns true if this error originated in the UDF registry
    pub fn is_udf_error(&self) -> bool {
        matches!(
            self,
            Error::UdfNotFound(_) | Error::UdfCompile { .. } | Error::UdfCall { .. }
        )
    }
}
