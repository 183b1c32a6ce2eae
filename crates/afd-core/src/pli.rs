// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::iter;
use std::sync::OnceLock;

use crate::numeric::KahanSum;
use crate::probe::ProbingTable;

/// Partition of the rows of a relation by equality on a column subset.
///
/// Only clusters with two or more rows are stored; singleton classes exist
/// implicitly and their count is `num_rows − Σ|stored cluster|`. Rows are
/// ascending within every stored cluster; no order holds across clusters.
///
/// The probing table and the entropy are materialized on first use and
/// memoized for the lifetime of the index.
#[derive(Debug)]
pub struct PositionListIndex {
    clusters: Vec<Vec<usize>>,
    num_rows: usize,
    num_classes: usize,
    probing_table: OnceLock<ProbingTable>,
    entropy: OnceLock<f64>,
}

impl PositionListIndex {
    /// Groups rows by their dictionary value id on a single column.
    pub(crate) fn from_single_column(value_ids: &[usize], num_distinct: usize) -> Self {
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); num_distinct];
        for (row, &value) in value_ids.iter().enumerate() {
            groups[value].push(row);
        }
        let clusters = groups
            .into_iter()
            .filter(|group| group.len() >= 2)
            .collect();
        Self::from_parts(clusters, value_ids.len(), num_distinct)
    }

    fn from_parts(clusters: Vec<Vec<usize>>, num_rows: usize, num_classes: usize) -> Self {
        debug_assert!(
            clusters
                .iter()
                .all(|cluster| cluster.windows(2).all(|pair| pair[0] < pair[1])),
            "cluster rows must be ascending"
        );
        Self {
            clusters,
            num_rows,
            num_classes,
            probing_table: OnceLock::new(),
            entropy: OnceLock::new(),
        }
    }

    /// Stored non-singleton clusters.
    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of equivalence classes, implicit singletons included.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of rows not covered by any stored cluster.
    pub fn singleton_count(&self) -> usize {
        let covered: usize = self.clusters.iter().map(Vec::len).sum();
        self.num_rows - covered
    }

    /// Sizes of every class: stored clusters first, then one `1` per
    /// implicit singleton.
    pub fn class_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.clusters
            .iter()
            .map(Vec::len)
            .chain(iter::repeat(1).take(self.singleton_count()))
    }

    /// Dense row-to-class-id table, built on first use.
    pub fn probing_table(&self) -> &ProbingTable {
        self.probing_table
            .get_or_init(|| ProbingTable::from_clusters(&self.clusters, self.num_rows))
    }

    /// Shannon entropy of the partition in nats, built on first use.
    ///
    /// `H = ln N − (1/N)·Σ s·ln s` over class sizes; singleton classes add
    /// `1·ln 1 = 0`, so the inner sum runs over stored clusters only.
    pub fn entropy(&self) -> f64 {
        *self.entropy.get_or_init(|| {
            let n = self.num_rows as f64;
            let mut weighted = KahanSum::new();
            for cluster in &self.clusters {
                let size = cluster.len() as f64;
                weighted.add(size * size.ln());
            }
            n.ln() - weighted.value() / n
        })
    }

    /// Product partition: rows are equivalent iff equivalent under both
    /// `self` and `other`.
    ///
    /// Each stored cluster of `self` is split by `other`'s class ids; the
    /// working memory is one group map per cluster, never the cross product
    /// of the two cluster lists. Implicit singletons of `self` stay
    /// singletons in the product.
    pub fn product(&self, other: &Self) -> Self {
        debug_assert_eq!(self.num_rows, other.num_rows, "partitions must cover the same rows");

        let probe = other.probing_table();
        let mut clusters = Vec::new();
        let mut num_classes = self.singleton_count();
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();

        for cluster in &self.clusters {
            for &row in cluster {
                groups.entry(probe.class_of(row)).or_default().push(row);
            }
            num_classes += groups.len();
            for (_, group) in groups.drain() {
                if group.len() >= 2 {
                    clusters.push(group);
                }
            }
        }

        Self::from_parts(clusters, self.num_rows, num_classes)
    }
}

/// Partition equality: same rows, same class count, same clusters in any
/// storage order.
impl PartialEq for PositionListIndex {
    fn eq(&self, other: &Self) -> bool {
        fn canonical(index: &PositionListIndex) -> Vec<&Vec<usize>> {
            let mut clusters: Vec<&Vec<usize>> = index.clusters.iter().collect();
            clusters.sort_unstable_by_key(|cluster| cluster.first().copied());
            clusters
        }

        if self.num_rows != other.num_rows || self.num_classes != other.num_classes {
            return false;
        }
        canonical(self) == canonical(other)
    }
}

impl Eq for PositionListIndex {}
