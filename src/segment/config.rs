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

//! Segment configuration
//!

/// Configuration options for a segment's chunk geometry
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Number of rows per chunk; the last chunk may be short
    /// Default: 32768
    pub size_per_chunk: i64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            size_per_chunk: 32 * 1024,
        }
    }
}

impl SegmentConfig {
    /// Creates a new SegmentConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the chunk width
    ///
    /// Values below 1 are clamped to 1.
    pub fn with_size_per_chunk(mut self, size_per_chunk: i64) -> Self {
        self.size_per_chunk = size_per_chunk.max(1);
        self
    }
}
