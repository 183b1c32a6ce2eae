// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Columnar relation model for approximate-functional-dependency analysis.
//!
//! A [`ColumnarRelation`] dictionary-encodes a string-typed table supplied
//! through the [`InputTable`] seam and hands out cached
//! [`PositionListIndex`] partitions over arbitrary column subsets. The
//! metric layer consumes those partitions through their stored clusters,
//! probing tables, and entropies.

pub mod error;
pub mod input;
pub mod numeric;
pub mod pli;
pub mod probe;
pub mod relation;

pub use error::AfdError;
pub use input::{InputTable, MemoryTable};
pub use numeric::KahanSum;
pub use pli::PositionListIndex;
pub use probe::ProbingTable;
pub use relation::ColumnarRelation;
