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

//! Scalar values and the typed element seam
//!
//! [`Scalar`] is the owned tagged union over the eight element types; it
//! is what expression nodes carry and what type-erased row accessors
//! yield. [`Element`] is the compile-time side of the same eight types:
//! chunk iteration and index queries are generic over it, so each
//! predicate is monomorphized per column type instead of matching on
//! every element.
//!
//! Comparisons never widen: a Scalar only compares against the same
//! variant, and a mismatch is an `IncompatibleOperands` error.

use std::cmp::Ordering;
use std::fmt;

use super::error::{Error, Result};
use super::types::{ArithOp, ElementType, Operator};

/// A runtime scalar value with type information
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    Int8(i8),

    /// 16-bit signed integer
    Int16(i16),

    /// 32-bit signed integer
    Int32(i32),

    /// 64-bit signed integer
    Int64(i64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 text string
    Text(String),
}

impl Scalar {
    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Returns the element type of this value
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalar::Bool(_) => ElementType::Bool,
            Scalar::Int8(_) => ElementType::Int8,
            Scalar::Int16(_) => ElementType::Int16,
            Scalar::Int32(_) => ElementType::Int32,
            Scalar::Int64(_) => ElementType::Int64,
            Scalar::Float32(_) => ElementType::Float32,
            Scalar::Float64(_) => ElementType::Float64,
            Scalar::Text(_) => ElementType::Text,
        }
    }

    /// Extract as i64 if this is an Int64
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Scalar::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as &str if this is a Text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Apply a comparison operator against another scalar
    ///
    /// Operands must be the same variant; there is no implicit numeric
    /// widening. `PrefixMatch` is valid only for text pairs. NaN compares
    /// false under `Eq` and every ordered operator, true under `Ne`.
    pub fn compare(&self, op: Operator, other: &Scalar) -> Result<bool> {
        if op == Operator::PrefixMatch {
            return match (self, other) {
                (Scalar::Text(a), Scalar::Text(b)) => Ok(a.starts_with(b.as_str())),
                (a, b) if a.element_type() == b.element_type() => Err(Error::UnsupportedOperator {
                    op,
                    element_type: a.element_type(),
                }),
                (a, b) => Err(Error::IncompatibleOperands {
                    left: a.element_type(),
                    right: b.element_type(),
                }),
            };
        }
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Int8(a), Scalar::Int8(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Int16(a), Scalar::Int16(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Int32(a), Scalar::Int32(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Int64(a), Scalar::Int64(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Float32(a), Scalar::Float32(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Float64(a), Scalar::Float64(b)) => Ok(compare_partial(a, b, op)),
            (Scalar::Text(a), Scalar::Text(b)) => Ok(compare_partial(a, b, op)),
            (a, b) => Err(Error::IncompatibleOperands {
                left: a.element_type(),
                right: b.element_type(),
            }),
        }
    }

    /// Total-order comparison against another scalar of the same variant
    ///
    /// Floats order NaN after every number and treat -0.0 and +0.0 as
    /// equal, matching the ordering used by scalar index construction.
    pub fn total_cmp(&self, other: &Scalar) -> Result<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Ok(a.cmp(b)),
            (Scalar::Int8(a), Scalar::Int8(b)) => Ok(a.cmp(b)),
            (Scalar::Int16(a), Scalar::Int16(b)) => Ok(a.cmp(b)),
            (Scalar::Int32(a), Scalar::Int32(b)) => Ok(a.cmp(b)),
            (Scalar::Int64(a), Scalar::Int64(b)) => Ok(a.cmp(b)),
            (Scalar::Float32(a), Scalar::Float32(b)) => Ok(Element::total_cmp(a, b)),
            (Scalar::Float64(a), Scalar::Float64(b)) => Ok(Element::total_cmp(a, b)),
            (Scalar::Text(a), Scalar::Text(b)) => Ok(a.cmp(b)),
            (a, b) => Err(Error::IncompatibleOperands {
                left: a.element_type(),
                right: b.element_type(),
            }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int8(v) => write!(f, "{}", v),
            Scalar::Int16(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::Text(v) => write!(f, "{}", v),
        }
    }
}

#[inline]
fn compare_partial<T: PartialOrd + PartialEq + ?Sized>(a: &T, b: &T, op: Operator) -> bool {
    match op {
        Operator::Eq => a == b,
        Operator::Ne => a != b,
        Operator::Lt => a < b,
        Operator::Le => a <= b,
        Operator::Gt => a > b,
        Operator::Ge => a >= b,
        // handled by the caller before dispatching here
        Operator::PrefixMatch => false,
    }
}

/// The compile-time side of the eight scalar element types
///
/// Chunk scans, index queries and term lookups are generic over this
/// trait, which keeps the per-element predicate monomorphic while the
/// expression tree stays type-erased.
pub trait Element: Clone + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// The runtime tag matching this element type
    const ELEMENT_TYPE: ElementType;

    /// Extract an owned element from a scalar of the matching variant
    fn from_scalar(value: &Scalar) -> Option<Self>;

    /// Wrap this element back into a scalar
    fn into_scalar(self) -> Scalar;

    /// Total-order comparison used for index sorting and term dedup
    ///
    /// Floats order NaN after every number; -0.0 and +0.0 compare equal.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Returns true for a floating point NaN
    fn is_nan(&self) -> bool {
        false
    }

    /// Returns the string slice for TEXT elements, None otherwise
    fn as_str(&self) -> Option<&str> {
        None
    }
}

macro_rules! impl_element_ord {
    ($($t:ty => $tag:expr, $variant:ident;)*) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = $tag;

                fn from_scalar(value: &Scalar) -> Option<Self> {
                    match value {
                        Scalar::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                fn total_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }
            }
        )*
    };
}

impl_element_ord! {
    bool => ElementType::Bool, Bool;
    i8 => ElementType::Int8, Int8;
    i16 => ElementType::Int16, Int16;
    i32 => ElementType::Int32, Int32;
    i64 => ElementType::Int64, Int64;
}

macro_rules! impl_element_float {
    ($($t:ty => $tag:expr, $variant:ident;)*) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = $tag;

                fn from_scalar(value: &Scalar) -> Option<Self> {
                    match value {
                        Scalar::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                fn total_cmp(&self, other: &Self) -> Ordering {
                    match self.partial_cmp(other) {
                        Some(ord) => ord,
                        None if self.is_nan() && other.is_nan() => Ordering::Equal,
                        None if self.is_nan() => Ordering::Greater,
                        None => Ordering::Less,
                    }
                }

                fn is_nan(&self) -> bool {
                    <$t>::is_nan(*self)
                }
            }
        )*
    };
}

impl_element_float! {
    f32 => ElementType::Float32, Float32;
    f64 => ElementType::Float64, Float64;
}

impl Element for String {
    const ELEMENT_TYPE: ElementType = ElementType::Text;

    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Text(self)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn as_str(&self) -> Option<&str> {
        Some(String::as_str(self))
    }
}

/// Elements supporting the arithmetic-then-compare predicate
///
/// Only the six numeric element types implement this; Bool and Text are
/// outside the arithmetic domain.
pub trait ArithElement: Element + Copy {
    /// Apply an arithmetic operator, with the crate's overflow and
    /// division-by-zero semantics
    fn arith(self, op: ArithOp, rhs: Self) -> Result<Self>;
}

macro_rules! impl_arith_int {
    ($($t:ty),*) => {
        $(
            impl ArithElement for $t {
                fn arith(self, op: ArithOp, rhs: Self) -> Result<Self> {
                    match op {
                        ArithOp::Add => Ok(self.wrapping_add(rhs)),
                        ArithOp::Sub => Ok(self.wrapping_sub(rhs)),
                        ArithOp::Mul => Ok(self.wrapping_mul(rhs)),
                        ArithOp::Div => {
                            if rhs == 0 {
                                Err(Error::ArithmeticFault { op })
                            } else {
                                Ok(self.wrapping_div(rhs))
                            }
                        }
                        ArithOp::Mod => {
                            if rhs == 0 {
                                Err(Error::ArithmeticFault { op })
                            } else {
                                Ok(self.wrapping_rem(rhs))
                            }
                        }
                    }
                }
            }
        )*
    };
}

impl_arith_int!(i8, i16, i32, i64);

macro_rules! impl_arith_float {
    ($($t:ty),*) => {
        $(
            impl ArithElement for $t {
                fn arith(self, op: ArithOp, rhs: Self) -> Result<Self> {
                    match op {
                        ArithOp::Add => Ok(self + rhs),
                        ArithOp::Sub => Ok(self - rhs),
                        ArithOp::Mul => Ok(self * rhs),
                        // IEEE-754: division by zero yields ±inf/NaN
                        ArithOp::Div => Ok(self / rhs),
                        ArithOp::Mod => Ok(self % rhs),
                    }
                }
            }
        )*
    };
}

impl_arith_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Scalar tests
    // =========================================================================

    #[test]
    fn test_scalar_element_type() {
        assert_eq!(Scalar::Bool(true).element_type(), ElementType::Bool);
        assert_eq!(Scalar::Int8(1).element_type(), ElementType::Int8);
        assert_eq!(Scalar::Int64(1).element_type(), ElementType::Int64);
        assert_eq!(Scalar::Float32(1.0).element_type(), ElementType::Float32);
        assert_eq!(Scalar::text("x").element_type(), ElementType::Text);
    }

    #[test]
    fn test_scalar_compare_same_type() {
        assert!(Scalar::Int32(3)
            .compare(Operator::Lt, &Scalar::Int32(5))
            .unwrap());
        assert!(Scalar::Int32(5)
            .compare(Operator::Ge, &Scalar::Int32(5))
            .unwrap());
        assert!(!Scalar::Int32(5)
            .compare(Operator::Ne, &Scalar::Int32(5))
            .unwrap());
        assert!(Scalar::text("abc")
            .compare(Operator::Lt, &Scalar::text("abd"))
            .unwrap());
        assert!(Scalar::Bool(true)
            .compare(Operator::Gt, &Scalar::Bool(false))
            .unwrap());
    }

    #[test]
    fn test_scalar_compare_incompatible() {
        let err = Scalar::Int32(1)
            .compare(Operator::Eq, &Scalar::Int64(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::IncompatibleOperands {
                left: ElementType::Int32,
                right: ElementType::Int64,
            }
        );

        let err = Scalar::text("1")
            .compare(Operator::Lt, &Scalar::Float64(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleOperands { .. }));
    }

    #[test]
    fn test_scalar_compare_nan() {
        let nan = Scalar::Float64(f64::NAN);
        let one = Scalar::Float64(1.0);
        for op in [Operator::Eq, Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge] {
            assert!(!nan.compare(op, &one).unwrap());
            assert!(!one.compare(op, &nan).unwrap());
            assert!(!nan.compare(op, &nan).unwrap());
        }
        assert!(nan.compare(Operator::Ne, &one).unwrap());
        assert!(nan.compare(Operator::Ne, &nan).unwrap());
    }

    #[test]
    fn test_scalar_prefix_match() {
        assert!(Scalar::text("apple")
            .compare(Operator::PrefixMatch, &Scalar::text("ap"))
            .unwrap());
        assert!(!Scalar::text("banana")
            .compare(Operator::PrefixMatch, &Scalar::text("ap"))
            .unwrap());

        let err = Scalar::Int32(1)
            .compare(Operator::PrefixMatch, &Scalar::Int32(2))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_scalar_total_cmp() {
        assert_eq!(
            Scalar::Int64(1).total_cmp(&Scalar::Int64(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Scalar::Float64(f64::NAN)
                .total_cmp(&Scalar::Float64(1.0))
                .unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Scalar::Float64(-0.0)
                .total_cmp(&Scalar::Float64(0.0))
                .unwrap(),
            Ordering::Equal
        );
        assert!(Scalar::Int32(1).total_cmp(&Scalar::Int64(1)).is_err());
    }

    // =========================================================================
    // Element tests
    // =========================================================================

    #[test]
    fn test_element_scalar_round_trip() {
        assert_eq!(i32::from_scalar(&Scalar::Int32(7)), Some(7));
        assert_eq!(i32::from_scalar(&Scalar::Int64(7)), None);
        assert_eq!(7i32.into_scalar(), Scalar::Int32(7));
        assert_eq!(
            String::from_scalar(&Scalar::text("hi")),
            Some("hi".to_string())
        );
        assert_eq!("hi".to_string().into_scalar(), Scalar::text("hi"));
    }

    #[test]
    fn test_element_float_total_cmp() {
        assert_eq!(Element::total_cmp(&1.0f64, &2.0f64), Ordering::Less);
        assert_eq!(
            Element::total_cmp(&f64::NAN, &f64::INFINITY),
            Ordering::Greater
        );
        assert_eq!(Element::total_cmp(&f64::NAN, &f64::NAN), Ordering::Equal);
        assert_eq!(Element::total_cmp(&-0.0f64, &0.0f64), Ordering::Equal);
    }

    #[test]
    fn test_element_as_str() {
        assert_eq!(Element::as_str(&"abc".to_string()), Some("abc"));
        assert_eq!(Element::as_str(&1i64), None);
    }

    // =========================================================================
    // ArithElement tests
    // =========================================================================

    #[test]
    fn test_arith_int_basic() {
        assert_eq!(10i32.arith(ArithOp::Add, 5).unwrap(), 15);
        assert_eq!(10i32.arith(ArithOp::Sub, 5).unwrap(), 5);
        assert_eq!(10i32.arith(ArithOp::Mul, 5).unwrap(), 50);
        assert_eq!(10i32.arith(ArithOp::Div, 5).unwrap(), 2);
        assert_eq!(10i32.arith(ArithOp::Mod, 3).unwrap(), 1);
    }

    #[test]
    fn test_arith_int_truncates_toward_zero() {
        assert_eq!((-7i32).arith(ArithOp::Div, 2).unwrap(), -3);
        assert_eq!((-7i32).arith(ArithOp::Mod, 2).unwrap(), -1);
        assert_eq!(7i32.arith(ArithOp::Mod, -2).unwrap(), 1);
    }

    #[test]
    fn test_arith_int_wraps() {
        assert_eq!(i8::MAX.arith(ArithOp::Add, 1).unwrap(), i8::MIN);
        assert_eq!(i64::MIN.arith(ArithOp::Div, -1).unwrap(), i64::MIN);
    }

    #[test]
    fn test_arith_int_zero_fault() {
        assert_eq!(
            1i64.arith(ArithOp::Div, 0).unwrap_err(),
            Error::ArithmeticFault { op: ArithOp::Div }
        );
        assert_eq!(
            1i64.arith(ArithOp::Mod, 0).unwrap_err(),
            Error::ArithmeticFault { op: ArithOp::Mod }
        );
    }

    #[test]
    fn test_arith_float() {
        assert_eq!(1.5f64.arith(ArithOp::Add, 0.5).unwrap(), 2.0);
        assert_eq!(7.5f64.arith(ArithOp::Mod, 2.0).unwrap(), 1.5);
        // fmod keeps the dividend's sign
        assert_eq!((-7.5f64).arith(ArithOp::Mod, 2.0).unwrap(), -1.5);
        // float division by zero follows IEEE, not a fault
        assert_eq!(1.0f64.arith(ArithOp::Div, 0.0).unwrap(), f64::INFINITY);
        assert!(0.0f64.arith(ArithOp::Div, 0.0).unwrap().is_nan());
    }
}
