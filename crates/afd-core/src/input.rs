// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::VecDeque;

use crate::error::AfdError;

/// Sequential supplier of string-typed rows: the ingress seam between
/// external loaders (CSV readers, database cursors, language bindings) and
/// the relation model.
///
/// Rows are drained front to back; a `None` cell is a null and its class
/// assignment is decided by the relation's null semantics, not here.
pub trait InputTable {
    /// Number of cells every row carries.
    fn num_columns(&self) -> usize;

    /// Optional column names; when present, the length equals
    /// [`num_columns`](Self::num_columns).
    fn header(&self) -> Option<&[String]>;

    /// Next row, or `None` once the table is drained.
    fn next_row(&mut self) -> Option<Vec<Option<String>>>;
}

/// In-memory [`InputTable`] for embedders and tests.
#[derive(Clone, Debug)]
pub struct MemoryTable {
    num_columns: usize,
    header: Option<Vec<String>>,
    rows: VecDeque<Vec<Option<String>>>,
}

impl MemoryTable {
    /// Validates that the header and every row match `num_columns`.
    pub fn new(
        num_columns: usize,
        header: Option<Vec<String>>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self, AfdError> {
        if let Some(header) = &header {
            if header.len() != num_columns {
                return Err(AfdError::configuration(format!(
                    "header has {} names, expected {num_columns}",
                    header.len()
                )));
            }
        }
        for (index, row) in rows.iter().enumerate() {
            if row.len() != num_columns {
                return Err(AfdError::configuration(format!(
                    "row {index} has {} cells, expected {num_columns}",
                    row.len()
                )));
            }
        }
        Ok(Self {
            num_columns,
            header,
            rows: rows.into(),
        })
    }

    /// Builds a headerless table from plain string rows, mapping empty
    /// cells to nulls.
    pub fn from_strings(num_columns: usize, rows: &[&[&str]]) -> Result<Self, AfdError> {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            None
                        } else {
                            Some((*cell).to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(num_columns, None, rows)
    }
}

impl InputTable for MemoryTable {
    fn num_columns(&self) -> usize {
        self.num_columns
    }

    fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    fn next_row(&mut self) -> Option<Vec<Option<String>>> {
        self.rows.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::{InputTable, MemoryTable};
    use crate::error::AfdError;

    #[test]
    fn rows_drain_front_to_back() {
        let mut table = MemoryTable::new(
            2,
            None,
            vec![
                vec![Some("a".to_string()), Some("b".to_string())],
                vec![Some("c".to_string()), None],
            ],
        )
        .expect("table should be valid");

        assert_eq!(table.num_columns(), 2);
        assert_eq!(
            table.next_row(),
            Some(vec![Some("a".to_string()), Some("b".to_string())])
        );
        assert_eq!(table.next_row(), Some(vec![Some("c".to_string()), None]));
        assert_eq!(table.next_row(), None);
    }

    #[test]
    fn header_length_must_match_column_count() {
        let err = MemoryTable::new(3, Some(vec!["only".to_string()]), vec![])
            .expect_err("short header should be rejected");
        assert!(matches!(err, AfdError::Configuration(_)));
        assert!(err.to_string().contains("header has 1 names"));
    }

    #[test]
    fn ragged_rows_are_rejected_with_their_index() {
        let err = MemoryTable::new(
            2,
            None,
            vec![
                vec![Some("a".to_string()), Some("b".to_string())],
                vec![Some("c".to_string())],
            ],
        )
        .expect_err("ragged row should be rejected");
        assert!(err.to_string().contains("row 1 has 1 cells"));
    }

    #[test]
    fn from_strings_maps_empty_cells_to_nulls() {
        let mut table =
            MemoryTable::from_strings(3, &[&["x", "", "y"]]).expect("rows should be valid");
        assert_eq!(
            table.next_row(),
            Some(vec![Some("x".to_string()), None, Some("y".to_string())])
        );
    }
}
