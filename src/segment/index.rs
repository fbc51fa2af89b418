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

//! Per-chunk scalar index
//!
//! [`MemoryScalarIndex`] keeps the chunk's values by row offset (for
//! reverse lookup) plus the offsets sorted by value, and answers
//! membership, range and prefix queries with binary-searched partition
//! points.
//!
//! Query results are bit-for-bit identical to an element-wise scan of
//! the same chunk: NaN entries sort after every number and are excluded
//! from ordered matches, NaN probes match nothing under Eq and all
//! ordered operators, and -0.0/+0.0 compare equal.

use crate::common::Bitset;
use crate::core::{Element, Error, Operator, Result};

/// Membership and range queries over one chunk of one field
pub trait ScalarIndex<T: Element>: Send + Sync + std::fmt::Debug {
    /// Number of rows covered by this index
    fn count(&self) -> i64;

    /// Bitset of rows whose value equals any of `values`
    fn in_set(&self, values: &[T]) -> Bitset;

    /// Bitset of rows whose value equals none of `values`
    fn not_in_set(&self, values: &[T]) -> Bitset;

    /// Bitset of rows satisfying `row_value <op> value`
    fn range(&self, value: &T, op: Operator) -> Result<Bitset>;

    /// Bitset of rows inside the interval with per-bound inclusivity
    ///
    /// An empty interval yields an all-false bitset.
    fn range_between(
        &self,
        lower: &T,
        lower_inclusive: bool,
        upper: &T,
        upper_inclusive: bool,
    ) -> Bitset;

    /// Bitset of rows whose TEXT value starts with `prefix`
    fn prefix_query(&self, prefix: &str) -> Result<Bitset>;

    /// The value stored at a row offset
    fn reverse_lookup(&self, offset: i64) -> Result<T>;
}

/// In-memory sorted-offset scalar index over one chunk
#[derive(Debug)]
pub struct MemoryScalarIndex<T> {
    /// Chunk values by row offset
    values: Vec<T>,
    /// Row offsets sorted by value (total order, NaN last)
    sorted: Vec<u32>,
    /// Prefix of `sorted` holding non-NaN values
    non_nan_len: usize,
}

impl<T: Element> MemoryScalarIndex<T> {
    /// Build an index over one chunk of values
    pub fn build(values: Vec<T>) -> Self {
        let mut sorted: Vec<u32> = (0..values.len() as u32).collect();
        sorted.sort_by(|&a, &b| values[a as usize].total_cmp(&values[b as usize]));
        let non_nan_len = sorted.partition_point(|&off| !values[off as usize].is_nan());
        Self {
            values,
            sorted,
            non_nan_len,
        }
    }

    /// Count of sorted entries strictly less than `value`
    fn lower_bound(&self, value: &T) -> usize {
        self.sorted[..self.non_nan_len].partition_point(|&off| {
            self.values[off as usize].total_cmp(value) == std::cmp::Ordering::Less
        })
    }

    /// Count of sorted entries less than or equal to `value`
    fn upper_bound(&self, value: &T) -> usize {
        self.sorted[..self.non_nan_len].partition_point(|&off| {
            self.values[off as usize].total_cmp(value) != std::cmp::Ordering::Greater
        })
    }

    fn set_sorted_run(&self, bits: &mut Bitset, start: usize, end: usize) {
        for &off in &self.sorted[start..end.max(start)] {
            bits.set(off as usize, true);
        }
    }
}

impl<T: Element> ScalarIndex<T> for MemoryScalarIndex<T> {
    fn count(&self) -> i64 {
        self.values.len() as i64
    }

    fn in_set(&self, values: &[T]) -> Bitset {
        let mut bits = Bitset::new(self.values.len());
        for value in values {
            if value.is_nan() {
                continue;
            }
            let start = self.lower_bound(value);
            let end = self.upper_bound(value);
            self.set_sorted_run(&mut bits, start, end);
        }
        bits
    }

    fn not_in_set(&self, values: &[T]) -> Bitset {
        let mut bits = self.in_set(values);
        bits.flip();
        bits
    }

    fn range(&self, value: &T, op: Operator) -> Result<Bitset> {
        let mut bits = Bitset::new(self.values.len());
        if value.is_nan() {
            // NaN compares false under Eq and every ordered operator
            if op == Operator::Ne {
                bits.flip();
            }
            return Ok(bits);
        }
        match op {
            Operator::Eq => {
                self.set_sorted_run(&mut bits, self.lower_bound(value), self.upper_bound(value));
            }
            Operator::Ne => {
                self.set_sorted_run(&mut bits, self.lower_bound(value), self.upper_bound(value));
                bits.flip();
            }
            Operator::Lt => {
                self.set_sorted_run(&mut bits, 0, self.lower_bound(value));
            }
            Operator::Le => {
                self.set_sorted_run(&mut bits, 0, self.upper_bound(value));
            }
            Operator::Gt => {
                self.set_sorted_run(&mut bits, self.upper_bound(value), self.non_nan_len);
            }
            Operator::Ge => {
                self.set_sorted_run(&mut bits, self.lower_bound(value), self.non_nan_len);
            }
            Operator::PrefixMatch => {
                return Err(Error::UnsupportedOperator {
                    op,
                    element_type: T::ELEMENT_TYPE,
                });
            }
        }
        Ok(bits)
    }

    fn range_between(
        &self,
        lower: &T,
        lower_inclusive: bool,
        upper: &T,
        upper_inclusive: bool,
    ) -> Bitset {
        let mut bits = Bitset::new(self.values.len());
        if lower.is_nan() || upper.is_nan() {
            return bits;
        }
        let start = if lower_inclusive {
            self.lower_bound(lower)
        } else {
            self.upper_bound(lower)
        };
        let end = if upper_inclusive {
            self.upper_bound(upper)
        } else {
            self.lower_bound(upper)
        };
        self.set_sorted_run(&mut bits, start, end);
        bits
    }

    fn prefix_query(&self, prefix: &str) -> Result<Bitset> {
        if T::ELEMENT_TYPE != crate::core::ElementType::Text {
            return Err(Error::UnsupportedOperator {
                op: Operator::PrefixMatch,
                element_type: T::ELEMENT_TYPE,
            });
        }
        let mut bits = Bitset::new(self.values.len());
        // TEXT sorts lexicographically, so all matches form one run
        // starting at the first value >= prefix
        let start = self.sorted[..self.non_nan_len].partition_point(|&off| {
            self.values[off as usize]
                .as_str()
                .is_some_and(|s| s < prefix)
        });
        for &off in &self.sorted[start..self.non_nan_len] {
            match self.values[off as usize].as_str() {
                Some(s) if s.starts_with(prefix) => bits.set(off as usize, true),
                _ => break,
            }
        }
        Ok(bits)
    }

    fn reverse_lookup(&self, offset: i64) -> Result<T> {
        self.values
            .get(offset as usize)
            .cloned()
            .ok_or_else(|| {
                Error::invariant(format!(
                    "reverse lookup offset {} out of range {}",
                    offset,
                    self.values.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_index() -> MemoryScalarIndex<i32> {
        MemoryScalarIndex::build(vec![30, 10, 20, 10, 40])
    }

    // =========================================================================
    // Membership tests
    // =========================================================================

    #[test]
    fn test_in_set() {
        let index = int_index();
        assert_eq!(index.in_set(&[10]).to_string(), "01010");
        assert_eq!(index.in_set(&[10, 40]).to_string(), "01011");
        assert_eq!(index.in_set(&[99]).to_string(), "00000");
        assert_eq!(index.in_set(&[]).to_string(), "00000");
    }

    #[test]
    fn test_not_in_set() {
        let index = int_index();
        assert_eq!(index.not_in_set(&[10]).to_string(), "10101");
        assert_eq!(index.not_in_set(&[]).to_string(), "11111");
    }

    // =========================================================================
    // Range tests
    // =========================================================================

    #[test]
    fn test_range_operators() {
        let index = int_index();
        assert_eq!(index.range(&20, Operator::Eq).unwrap().to_string(), "00100");
        assert_eq!(index.range(&20, Operator::Ne).unwrap().to_string(), "11011");
        assert_eq!(index.range(&20, Operator::Lt).unwrap().to_string(), "01010");
        assert_eq!(index.range(&20, Operator::Le).unwrap().to_string(), "01110");
        assert_eq!(index.range(&20, Operator::Gt).unwrap().to_string(), "10001");
        assert_eq!(index.range(&20, Operator::Ge).unwrap().to_string(), "10101");
    }

    #[test]
    fn test_range_prefix_match_rejected() {
        let index = int_index();
        assert!(matches!(
            index.range(&20, Operator::PrefixMatch).unwrap_err(),
            Error::UnsupportedOperator { .. }
        ));
    }

    #[test]
    fn test_range_between() {
        let index = int_index();
        assert_eq!(index.range_between(&10, true, &30, true).to_string(), "11110");
        assert_eq!(
            index.range_between(&10, false, &30, false).to_string(),
            "00100"
        );
        assert_eq!(
            index.range_between(&10, true, &30, false).to_string(),
            "01110"
        );
        // empty interval
        assert_eq!(
            index.range_between(&30, true, &10, true).to_string(),
            "00000"
        );
    }

    // =========================================================================
    // Float tests
    // =========================================================================

    #[test]
    fn test_float_nan_excluded_from_ordered_matches() {
        let index = MemoryScalarIndex::build(vec![1.0f64, f64::NAN, 3.0]);
        assert_eq!(index.range(&0.0, Operator::Gt).unwrap().to_string(), "101");
        assert_eq!(index.range(&4.0, Operator::Lt).unwrap().to_string(), "101");
        assert_eq!(index.range(&f64::NAN, Operator::Eq).unwrap().to_string(), "000");
        // x != NaN is true for every x, NaN included
        assert_eq!(index.range(&f64::NAN, Operator::Ne).unwrap().to_string(), "111");
        assert_eq!(index.in_set(&[f64::NAN]).to_string(), "000");
        assert_eq!(index.not_in_set(&[f64::NAN]).to_string(), "111");
    }

    #[test]
    fn test_float_negative_zero() {
        let index = MemoryScalarIndex::build(vec![-0.0f64, 0.0, 1.0]);
        assert_eq!(index.range(&0.0, Operator::Eq).unwrap().to_string(), "110");
        assert_eq!(index.in_set(&[-0.0]).to_string(), "110");
    }

    // =========================================================================
    // Prefix tests
    // =========================================================================

    #[test]
    fn test_prefix_query() {
        let index = MemoryScalarIndex::build(vec![
            "apple".to_string(),
            "banana".to_string(),
            "apricot".to_string(),
        ]);
        assert_eq!(index.prefix_query("ap").unwrap().to_string(), "101");
        assert_eq!(index.prefix_query("apple").unwrap().to_string(), "100");
        assert_eq!(index.prefix_query("z").unwrap().to_string(), "000");
        assert_eq!(index.prefix_query("").unwrap().to_string(), "111");
    }

    #[test]
    fn test_prefix_query_non_text_rejected() {
        let index = int_index();
        assert!(matches!(
            index.prefix_query("a").unwrap_err(),
            Error::UnsupportedOperator { .. }
        ));
    }

    // =========================================================================
    // Reverse lookup tests
    // =========================================================================

    #[test]
    fn test_reverse_lookup() {
        let index = int_index();
        assert_eq!(index.count(), 5);
        assert_eq!(index.reverse_lookup(0).unwrap(), 30);
        assert_eq!(index.reverse_lookup(4).unwrap(), 40);
        assert!(index.reverse_lookup(5).is_err());
    }

    #[test]
    fn test_index_matches_scan() {
        // index results must equal an element-wise scan of the same data
        let data = vec![5i64, 3, 8, 3, 9, 1, 5];
        let index = MemoryScalarIndex::build(data.clone());
        for probe in [0i64, 1, 3, 5, 9, 10] {
            for op in [
                Operator::Eq,
                Operator::Ne,
                Operator::Lt,
                Operator::Le,
                Operator::Gt,
                Operator::Ge,
            ] {
                let from_index = index.range(&probe, op).unwrap();
                let from_scan = Bitset::from_bools(
                    &data
                        .iter()
                        .map(|x| {
                            x.into_scalar()
                                .compare(op, &probe.into_scalar())
                                .unwrap()
                        })
                        .collect::<Vec<_>>(),
                );
                assert_eq!(from_index, from_scan, "probe {} op {}", probe, op);
            }
        }
    }
}
