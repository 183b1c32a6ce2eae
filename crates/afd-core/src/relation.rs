// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AfdError;
use crate::input::InputTable;
use crate::pli::PositionListIndex;

/// One dictionary-encoded column: a dense value id per row.
#[derive(Clone, Debug)]
struct ColumnData {
    value_ids: Vec<usize>,
    num_distinct: usize,
}

/// Columnar, immutable view of a string-typed table.
///
/// Cells are dictionary-encoded at load time, so equality on any column
/// subset reduces to equality of small integers. Null semantics are fixed
/// once per relation: with `nulls_are_equal` every null of a column shares
/// one value id, otherwise each null receives a fresh id of its own (and
/// therefore ends up an implicit singleton class).
///
/// Partitions are handed out as shared [`PositionListIndex`] handles and
/// cached per normalized index set; repeated requests are O(1).
#[derive(Debug)]
pub struct ColumnarRelation {
    columns: Vec<ColumnData>,
    num_rows: usize,
    pli_cache: Mutex<HashMap<Vec<usize>, Arc<PositionListIndex>>>,
}

impl ColumnarRelation {
    /// Drains `table` and dictionary-encodes every column.
    pub fn from_input_table(
        table: &mut dyn InputTable,
        nulls_are_equal: bool,
    ) -> Result<Self, AfdError> {
        let num_columns = table.num_columns();
        let mut encoders: Vec<HashMap<String, usize>> = vec![HashMap::new(); num_columns];
        let mut null_ids: Vec<Option<usize>> = vec![None; num_columns];
        let mut columns: Vec<ColumnData> = (0..num_columns)
            .map(|_| ColumnData {
                value_ids: Vec::new(),
                num_distinct: 0,
            })
            .collect();

        let mut num_rows = 0usize;
        while let Some(row) = table.next_row() {
            if row.len() != num_columns {
                return Err(AfdError::configuration(format!(
                    "row {num_rows} has {} cells, expected {num_columns}",
                    row.len()
                )));
            }
            for (index, cell) in row.into_iter().enumerate() {
                let column = &mut columns[index];
                let id = match cell {
                    Some(value) => {
                        let fresh = column.num_distinct;
                        let id = *encoders[index].entry(value).or_insert(fresh);
                        if id == fresh {
                            column.num_distinct += 1;
                        }
                        id
                    }
                    None if nulls_are_equal => match null_ids[index] {
                        Some(id) => id,
                        None => {
                            let id = column.num_distinct;
                            column.num_distinct += 1;
                            null_ids[index] = Some(id);
                            id
                        }
                    },
                    None => {
                        let id = column.num_distinct;
                        column.num_distinct += 1;
                        id
                    }
                };
                column.value_ids.push(id);
            }
            num_rows += 1;
        }

        Ok(Self {
            columns,
            num_rows,
            pli_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the relation has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.columns.is_empty()
    }

    /// Partition of the rows by equality on `indices`.
    ///
    /// The index set is normalized (sorted, deduplicated) before the cache
    /// lookup, so the fold order of multi-column requests never leaks into
    /// the result. Single-column partitions built along the way are cached
    /// under their own keys.
    pub fn pli(&self, indices: &[usize]) -> Result<Arc<PositionListIndex>, AfdError> {
        let key = self.normalize_indices(indices)?;
        if self.num_rows == 0 {
            return Err(AfdError::logic(
                "cannot build a position list index over an empty relation",
            ));
        }

        let mut cache = self
            .pli_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(&key) {
            return Ok(Arc::clone(cached));
        }

        let mut product = self.single_column_pli(&mut cache, key[0]);
        for &index in &key[1..] {
            let next = self.single_column_pli(&mut cache, index);
            product = Arc::new(product.product(&next));
        }
        cache.insert(key, Arc::clone(&product));
        Ok(product)
    }

    fn single_column_pli(
        &self,
        cache: &mut HashMap<Vec<usize>, Arc<PositionListIndex>>,
        index: usize,
    ) -> Arc<PositionListIndex> {
        let key = vec![index];
        if let Some(cached) = cache.get(&key) {
            return Arc::clone(cached);
        }
        let column = &self.columns[index];
        let built = Arc::new(PositionListIndex::from_single_column(
            &column.value_ids,
            column.num_distinct,
        ));
        cache.insert(key, Arc::clone(&built));
        built
    }

    fn normalize_indices(&self, indices: &[usize]) -> Result<Vec<usize>, AfdError> {
        if indices.is_empty() {
            return Err(AfdError::configuration("index set must not be empty"));
        }
        let mut normalized = indices.to_vec();
        normalized.sort_unstable();
        normalized.dedup();
        if let Some(&out_of_range) = normalized.iter().find(|&&index| index >= self.num_columns()) {
            return Err(AfdError::configuration(format!(
                "column index {out_of_range} out of range for a relation with {} columns",
                self.num_columns()
            )));
        }
        Ok(normalized)
    }
}
