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

//! Predicate expression tree
//!
//! This module provides the boolean expressions evaluated against a
//! segment to produce a selection mask.
//!
//! # Expression variants
//!
//! - [`Expr::LogicalUnary`] / [`Expr::LogicalBinary`] - NOT, AND, OR, XOR, MINUS
//! - [`Expr::UnaryRange`] - single comparison (field op value)
//! - [`Expr::BinaryRange`] - interval check with per-bound inclusivity
//! - [`Expr::BinaryArithOpEvalRange`] - (field ⊕ operand) compared to a value
//! - [`Expr::Term`] - set membership (field IN (v1, v2, ...))
//! - [`Expr::Compare`] - field-to-field comparison
//! - [`Expr::Udf`] - WebAssembly user-defined predicate
//!
//! Nodes are immutable once built and owned by the caller; the evaluator
//! walks the tree by `match`, so no visitor trait is needed. Field-
//! referencing variants carry the element type they expect, which the
//! evaluator checks against the segment schema before dispatch.

use crate::core::{ArithOp, ElementType, FieldId, Operator, Scalar};

/// Operators for [`Expr::LogicalUnary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalUnaryOp {
    /// Bitwise negation of the child mask
    Not,
}

/// Operators for [`Expr::LogicalBinary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalBinaryOp {
    /// Both children match
    And,
    /// Either child matches
    Or,
    /// Exactly one child matches
    Xor,
    /// Left matches and right does not (A AND NOT B)
    Minus,
}

/// Source of one UDF argument
#[derive(Debug, Clone, PartialEq)]
pub enum UdfArgSource {
    /// Per-row value fetched from a segment field
    Field(FieldId),
    /// Constant shared by every row
    Literal(Scalar),
}

/// One typed argument of a [`Expr::Udf`] call
#[derive(Debug, Clone, PartialEq)]
pub struct UdfArg {
    /// Where the value comes from
    pub source: UdfArgSource,
    /// Declared element type, checked against the schema for fields
    pub element_type: ElementType,
}

impl UdfArg {
    /// Argument bound to a segment field
    pub fn field(field_id: FieldId, element_type: ElementType) -> Self {
        Self {
            source: UdfArgSource::Field(field_id),
            element_type,
        }
    }

    /// Constant argument
    pub fn literal(value: Scalar) -> Self {
        let element_type = value.element_type();
        Self {
            source: UdfArgSource::Literal(value),
            element_type,
        }
    }
}

/// A predicate over the scalar columns of one segment
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical negation
    LogicalUnary {
        op: LogicalUnaryOp,
        child: Box<Expr>,
    },

    /// Logical combination of two subtrees
    LogicalBinary {
        op: LogicalBinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `field <op> value`
    UnaryRange {
        field_id: FieldId,
        element_type: ElementType,
        op: Operator,
        value: Scalar,
    },

    /// `lower <(=) field <(=) upper`
    BinaryRange {
        field_id: FieldId,
        element_type: ElementType,
        lower: Scalar,
        upper: Scalar,
        lower_inclusive: bool,
        upper_inclusive: bool,
    },

    /// `(field <arith_op> right_operand) <op> value`, op limited to Eq/Ne
    BinaryArithOpEvalRange {
        field_id: FieldId,
        element_type: ElementType,
        arith_op: ArithOp,
        right_operand: Scalar,
        op: Operator,
        value: Scalar,
    },

    /// `field IN (values...)`; the list is sorted and deduplicated
    Term {
        field_id: FieldId,
        element_type: ElementType,
        values: Vec<Scalar>,
    },

    /// `left_field <op> right_field`
    Compare {
        left_field_id: FieldId,
        left_type: ElementType,
        right_field_id: FieldId,
        right_type: ElementType,
        op: Operator,
    },

    /// WebAssembly user-defined predicate, invoked once per row
    Udf {
        func_name: String,
        /// Base64-encoded WAT module carrying the function body
        wasm_body: String,
        args: Vec<UdfArg>,
    },
}

impl Expr {
    /// Logical NOT of an expression
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expr) -> Expr {
        Expr::LogicalUnary {
            op: LogicalUnaryOp::Not,
            child: Box::new(child),
        }
    }

    /// Logical AND of two expressions
    pub fn and(left: Expr, right: Expr) -> Expr {
        Self::binary(LogicalBinaryOp::And, left, right)
    }

    /// Logical OR of two expressions
    pub fn or(left: Expr, right: Expr) -> Expr {
        Self::binary(LogicalBinaryOp::Or, left, right)
    }

    /// Logical XOR of two expressions
    pub fn xor(left: Expr, right: Expr) -> Expr {
        Self::binary(LogicalBinaryOp::Xor, left, right)
    }

    /// Set difference of two expressions (left AND NOT right)
    pub fn minus(left: Expr, right: Expr) -> Expr {
        Self::binary(LogicalBinaryOp::Minus, left, right)
    }

    fn binary(op: LogicalBinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::LogicalBinary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `field <op> value`
    pub fn unary_range(
        field_id: impl Into<FieldId>,
        element_type: ElementType,
        op: Operator,
        value: Scalar,
    ) -> Expr {
        Expr::UnaryRange {
            field_id: field_id.into(),
            element_type,
            op,
            value,
        }
    }

    /// Interval check with per-bound inclusivity
    pub fn binary_range(
        field_id: impl Into<FieldId>,
        element_type: ElementType,
        lower: Scalar,
        upper: Scalar,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Expr {
        Expr::BinaryRange {
            field_id: field_id.into(),
            element_type,
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// `(field <arith_op> right_operand) <op> value`
    pub fn arith_eval_range(
        field_id: impl Into<FieldId>,
        element_type: ElementType,
        arith_op: ArithOp,
        right_operand: Scalar,
        op: Operator,
        value: Scalar,
    ) -> Expr {
        Expr::BinaryArithOpEvalRange {
            field_id: field_id.into(),
            element_type,
            arith_op,
            right_operand,
            op,
            value,
        }
    }

    /// `field IN (values...)`
    ///
    /// Sorts the list in total order and drops duplicates.
    pub fn term(
        field_id: impl Into<FieldId>,
        element_type: ElementType,
        mut values: Vec<Scalar>,
    ) -> Expr {
        values.sort_by(|a, b| {
            a.total_cmp(b).unwrap_or_else(|_| {
                // mixed-type lists are rejected at evaluation; keep the
                // sort stable by type tag until then
                a.element_type().as_u8().cmp(&b.element_type().as_u8())
            })
        });
        values.dedup();
        Expr::Term {
            field_id: field_id.into(),
            element_type,
            values,
        }
    }

    /// `left_field <op> right_field`
    pub fn compare(
        left_field_id: impl Into<FieldId>,
        left_type: ElementType,
        right_field_id: impl Into<FieldId>,
        right_type: ElementType,
        op: Operator,
    ) -> Expr {
        Expr::Compare {
            left_field_id: left_field_id.into(),
            left_type,
            right_field_id: right_field_id.into(),
            right_type,
            op,
        }
    }

    /// WebAssembly predicate call
    pub fn udf(
        func_name: impl Into<String>,
        wasm_body: impl Into<String>,
        args: Vec<UdfArg>,
    ) -> Expr {
        Expr::Udf {
            func_name: func_name.into(),
            wasm_body: wasm_body.into(),
            args,
        }
    }

    /// Sort key used by [`Expr::term`]; exposed for tests
    #[cfg(test)]
    fn term_values(&self) -> Option<&[Scalar]> {
        match self {
            Expr::Term { values, .. } => Some(values),
            _ => None,
        }
    }
}

/// Total-order helper for term scalars in tests
#[cfg(test)]
fn is_sorted_unique(values: &[Scalar]) -> bool {
    values
        .windows(2)
        .all(|w| matches!(w[0].total_cmp(&w[1]), Ok(std::cmp::Ordering::Less)))
}
