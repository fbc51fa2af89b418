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

//! Core type definitions: ElementType, Operator, ArithOp

use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// Scalar element types a segment column can hold
///
/// The primary-key-eligible subset is `{Int64, Text}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    /// Boolean true/false
    Bool = 0,

    /// 8-bit signed integer
    Int8 = 1,

    /// 16-bit signed integer
    Int16 = 2,

    /// 32-bit signed integer
    Int32 = 3,

    /// 64-bit signed integer
    Int64 = 4,

    /// 32-bit floating point number
    Float32 = 5,

    /// 64-bit floating point number
    Float64 = 6,

    /// UTF-8 text string
    Text = 7,
}

impl ElementType {
    /// Returns true if this type is numeric (integer or float)
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true if this type is a signed integer
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }

    /// Returns true if this type is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// Returns true if a primary key field may use this type
    pub fn is_primary_key_eligible(&self) -> bool {
        matches!(self, ElementType::Int64 | ElementType::Text)
    }

    /// Returns the type ID as u8 for serialization
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Create ElementType from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ElementType::Bool),
            1 => Some(ElementType::Int8),
            2 => Some(ElementType::Int16),
            3 => Some(ElementType::Int32),
            4 => Some(ElementType::Int64),
            5 => Some(ElementType::Float32),
            6 => Some(ElementType::Float64),
            7 => Some(ElementType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Bool => write!(f, "BOOL"),
            ElementType::Int8 => write!(f, "INT8"),
            ElementType::Int16 => write!(f, "INT16"),
            ElementType::Int32 => write!(f, "INT32"),
            ElementType::Int64 => write!(f, "INT64"),
            ElementType::Float32 => write!(f, "FLOAT32"),
            ElementType::Float64 => write!(f, "FLOAT64"),
            ElementType::Text => write!(f, "TEXT"),
        }
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Ok(ElementType::Bool),
            "INT8" => Ok(ElementType::Int8),
            "INT16" => Ok(ElementType::Int16),
            "INT32" | "INT" => Ok(ElementType::Int32),
            "INT64" | "BIGINT" => Ok(ElementType::Int64),
            "FLOAT32" | "FLOAT" => Ok(ElementType::Float32),
            "FLOAT64" | "DOUBLE" => Ok(ElementType::Float64),
            "TEXT" | "VARCHAR" | "STRING" => Ok(ElementType::Text),
            _ => Err(Error::InvalidSchema(format!("unknown element type: {}", s))),
        }
    }
}

/// Comparison operators for range and compare predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    /// Equality (=)
    Eq = 0,

    /// Inequality (!=)
    Ne = 1,

    /// Less than (<)
    Lt = 2,

    /// Less than or equal (<=)
    Le = 3,

    /// Greater than (>)
    Gt = 4,

    /// Greater than or equal (>=)
    Ge = 5,

    /// String prefix match; valid only for TEXT
    PrefixMatch = 6,
}

impl Operator {
    /// Returns the negation of this operator, if applicable
    pub fn negate(&self) -> Option<Self> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Lt => Some(Operator::Ge),
            Operator::Le => Some(Operator::Gt),
            Operator::Gt => Some(Operator::Le),
            Operator::Ge => Some(Operator::Lt),
            Operator::PrefixMatch => None,
        }
    }

    /// Returns true if this operator orders its operands (<, <=, >, >=)
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge
        )
    }

    /// Returns the type ID as u8 for serialization
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Ne => write!(f, "!="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
            Operator::PrefixMatch => write!(f, "PREFIX_MATCH"),
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "=" | "==" | "eq" => Ok(Operator::Eq),
            "!=" | "<>" | "ne" => Ok(Operator::Ne),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "le" | "lte" => Ok(Operator::Le),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "ge" | "gte" => Ok(Operator::Ge),
            "prefix_match" | "prefix" => Ok(Operator::PrefixMatch),
            _ => Err(Error::InvalidSchema(format!("unknown operator: {}", s))),
        }
    }
}

/// Arithmetic operators for arithmetic-then-compare predicates
///
/// Integer arithmetic wraps on overflow (two's complement). Integer
/// division and modulo truncate toward zero; division or modulo by zero
/// is an [`Error::ArithmeticFault`]. Float modulo is the IEEE-754
/// remainder with the sign of the dividend.
///
/// [`Error::ArithmeticFault`]: super::error::Error::ArithmeticFault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArithOp {
    /// Addition (+)
    Add = 0,

    /// Subtraction (-)
    Sub = 1,

    /// Multiplication (*)
    Mul = 2,

    /// Division (/)
    Div = 3,

    /// Modulo (%)
    Mod = 4,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "add"),
            ArithOp::Sub => write!(f, "sub"),
            ArithOp::Mul => write!(f, "mul"),
            ArithOp::Div => write!(f, "div"),
            ArithOp::Mod => write!(f, "mod"),
        }
    }
}

impl FromStr for ArithOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" | "+" => Ok(ArithOp::Add),
            "sub" | "-" => Ok(ArithOp::Sub),
            "mul" | "*" => Ok(ArithOp::Mul),
            "div" | "/" => Ok(ArithOp::Div),
            "mod" | "%" => Ok(ArithOp::Mod),
            _ => Err(Error::InvalidSchema(format!(
                "unknown arithmetic operator: {}",
                s
            ))),
        }
    }
}
