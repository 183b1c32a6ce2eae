// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Quality metrics for approximate functional dependencies.
//!
//! Given a relation and two column-index sets `lhs` and `rhs`, the
//! [`AfdMetricCalculator`] reports how close `lhs → rhs` is to a strict
//! functional dependency under four measures:
//!
//! - **G2**: the fraction of rows that must be removed for the dependency
//!   to hold exactly;
//! - **τ**: the Goodman-Kruskal association coefficient, the proportional
//!   reduction in `rhs` prediction error given `lhs`;
//! - **μ⁺**: a bias-corrected τ that accounts for the size of the `lhs`
//!   domain;
//! - **FI**: mutual information `I(lhs; rhs)` normalized by `H(rhs)`.
//!
//! All four live in `[0, 1]`. The heavy lifting happens on
//! [`PositionListIndex`] partitions: stored clusters are walked once per
//! candidate and grouped through the right-hand side's probing table, so the
//! cross product of the two cluster lists is never materialized.

use std::collections::HashMap;
use std::sync::Arc;

use afd_core::{AfdError, ColumnarRelation, InputTable, KahanSum, PositionListIndex};

/// Selector for the four supported dependency-quality measures.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AfdMetric {
    G2,
    Tau,
    MuPlus,
    Fi,
}

impl AfdMetric {
    pub const ALL: [AfdMetric; 4] = [
        AfdMetric::G2,
        AfdMetric::Tau,
        AfdMetric::MuPlus,
        AfdMetric::Fi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AfdMetric::G2 => "g2",
            AfdMetric::Tau => "tau",
            AfdMetric::MuPlus => "mu_plus",
            AfdMetric::Fi => "fi",
        }
    }
}

/// All four measures for one `(lhs, rhs)` candidate.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AfdScores {
    pub g2: f64,
    pub tau: f64,
    pub mu_plus: f64,
    pub fi: f64,
}

/// Measures how close `lhs → rhs` is to a strict functional dependency on a
/// shared, read-only relation.
///
/// Every `calculate_*` method is pure: partitions come from the relation's
/// cache, results are recomputed per call, and a failed call (for instance
/// an out-of-range index) leaves the calculator fully usable.
#[derive(Debug)]
pub struct AfdMetricCalculator {
    relation: Arc<ColumnarRelation>,
}

impl AfdMetricCalculator {
    /// Wraps a pre-built relation. Rejects a relation with no rows or no
    /// columns.
    pub fn new(relation: Arc<ColumnarRelation>) -> Result<Self, AfdError> {
        if relation.is_empty() {
            return Err(AfdError::configuration(
                "empty dataset: AFD metric calculation is meaningless",
            ));
        }
        Ok(Self { relation })
    }

    /// Loads a relation from the ingress seam, then wraps it.
    pub fn from_input_table(
        table: &mut dyn InputTable,
        nulls_are_equal: bool,
    ) -> Result<Self, AfdError> {
        let relation = ColumnarRelation::from_input_table(table, nulls_are_equal)?;
        Self::new(Arc::new(relation))
    }

    pub fn relation(&self) -> &Arc<ColumnarRelation> {
        &self.relation
    }

    /// Fraction of rows that must be removed for `lhs → rhs` to hold
    /// exactly. 0 iff the dependency already holds.
    pub fn calculate_g2(&self, lhs: &[usize], rhs: &[usize]) -> Result<f64, AfdError> {
        let (x, y) = self.candidate_plis(lhs, rhs)?;
        Ok(error_rate(&x, &y))
    }

    /// Goodman-Kruskal τ: proportional reduction in `rhs` prediction error
    /// when the `lhs` value is known. 0 when `rhs` is constant.
    pub fn calculate_tau(&self, lhs: &[usize], rhs: &[usize]) -> Result<f64, AfdError> {
        let (x, y) = self.candidate_plis(lhs, rhs)?;
        Ok(tau_value(&x, &y))
    }

    /// Bias-corrected τ. 0 when `rhs` is constant or `lhs` is a key, and
    /// clamped below at 0; values above 1 are never clamped because the
    /// formula cannot exceed 1 without a bug upstream.
    pub fn calculate_mu_plus(&self, lhs: &[usize], rhs: &[usize]) -> Result<f64, AfdError> {
        let (x, y) = self.candidate_plis(lhs, rhs)?;
        Ok(mu_plus_value(&x, &y))
    }

    /// Fraction of information: `(H(rhs) − H(rhs | lhs)) / H(rhs)`.
    ///
    /// Entropies are in nats; the ratio is invariant under the logarithm
    /// base. 0 when `rhs` is constant, 1 iff `lhs → rhs` holds exactly.
    pub fn calculate_fi(&self, lhs: &[usize], rhs: &[usize]) -> Result<f64, AfdError> {
        let (x, y) = self.candidate_plis(lhs, rhs)?;
        Ok(fi_value(&x, &y))
    }

    /// Dispatches on a metric selector; behavior is identical to the named
    /// methods.
    pub fn calculate(
        &self,
        metric: AfdMetric,
        lhs: &[usize],
        rhs: &[usize],
    ) -> Result<f64, AfdError> {
        match metric {
            AfdMetric::G2 => self.calculate_g2(lhs, rhs),
            AfdMetric::Tau => self.calculate_tau(lhs, rhs),
            AfdMetric::MuPlus => self.calculate_mu_plus(lhs, rhs),
            AfdMetric::Fi => self.calculate_fi(lhs, rhs),
        }
    }

    /// Evaluates all four measures over one candidate, sharing the two
    /// partitions across the formulas.
    pub fn calculate_all(&self, lhs: &[usize], rhs: &[usize]) -> Result<AfdScores, AfdError> {
        let (x, y) = self.candidate_plis(lhs, rhs)?;
        Ok(AfdScores {
            g2: error_rate(&x, &y),
            tau: tau_value(&x, &y),
            mu_plus: mu_plus_value(&x, &y),
            fi: fi_value(&x, &y),
        })
    }

    fn candidate_plis(
        &self,
        lhs: &[usize],
        rhs: &[usize],
    ) -> Result<(Arc<PositionListIndex>, Arc<PositionListIndex>), AfdError> {
        let x = self.relation.pli(lhs)?;
        let y = self.relation.pli(rhs)?;
        Ok((x, y))
    }
}

fn error_rate(x: &PositionListIndex, y: &PositionListIndex) -> f64 {
    let probe = y.probing_table();
    let mut error_rows = 0usize;
    for cluster in x.clusters() {
        let Some((&first, rest)) = cluster.split_first() else {
            continue;
        };
        let class = probe.class_of(first);
        if rest.iter().any(|&row| probe.class_of(row) != class) {
            error_rows += cluster.len();
        }
    }
    error_rows as f64 / x.num_rows() as f64
}

/// `p1 = Σ|y|²/N²` and `p2 = (1/N)·Σ_x Σ_y |x ∩ y|²/|x|`, both summed over
/// every class of the respective side, implicit singletons included.
fn association_terms(x: &PositionListIndex, y: &PositionListIndex) -> (f64, f64) {
    let n = x.num_rows() as f64;

    let mut squared_sizes = KahanSum::new();
    for size in y.class_sizes() {
        let size = size as f64;
        squared_sizes.add(size * size);
    }
    let p1 = squared_sizes.value() / (n * n);

    let mut weighted = KahanSum::new();
    for_each_overlap(x, y, |overlap, cluster_size| {
        let overlap = overlap as f64;
        weighted.add(overlap * overlap / cluster_size as f64);
    });
    // Each implicit lhs singleton lies in exactly one rhs class and
    // contributes 1²/1 to the raw sum.
    weighted.add(x.singleton_count() as f64);
    let p2 = weighted.value() / n;

    (p1, p2)
}

fn tau_value(x: &PositionListIndex, y: &PositionListIndex) -> f64 {
    if y.num_classes() < 2 {
        return 0.0;
    }
    let (p1, p2) = association_terms(x, y);
    (p2 - p1) / (1.0 - p1)
}

fn mu_plus_value(x: &PositionListIndex, y: &PositionListIndex) -> f64 {
    if y.num_classes() < 2 {
        return 0.0;
    }
    let x_domain = x.num_classes();
    if x_domain == x.num_rows() {
        return 0.0;
    }
    let (p1, p2) = association_terms(x, y);
    let n = x.num_rows() as f64;
    let mu = 1.0 - (1.0 - p2) / (1.0 - p1) * (n - 1.0) / (n - x_domain as f64);
    mu.max(0.0)
}

fn fi_value(x: &PositionListIndex, y: &PositionListIndex) -> f64 {
    if y.num_classes() < 2 {
        return 0.0;
    }
    let entropy = y.entropy();
    let mutual_information = entropy - conditional_entropy(x, y);
    mutual_information / entropy
}

/// `H(Y|X) = −(1/N)·Σ_x Σ_y |x ∩ y|·(ln|x ∩ y| − ln|x|)` over non-empty
/// overlaps. Implicit lhs singletons contribute `1·(ln 1 − ln 1) = 0` and
/// are skipped; rhs singletons inside stored lhs clusters surface as
/// overlaps of size 1.
fn conditional_entropy(x: &PositionListIndex, y: &PositionListIndex) -> f64 {
    let mut weighted = KahanSum::new();
    for_each_overlap(x, y, |overlap, cluster_size| {
        let overlap = overlap as f64;
        weighted.add(overlap * (overlap.ln() - (cluster_size as f64).ln()));
    });
    -weighted.value() / x.num_rows() as f64
}

/// Calls `visit(|x ∩ y|, |x|)` for every stored lhs cluster and every rhs
/// class it overlaps, by grouping the cluster's rows through the rhs probing
/// table. Work memory is one group map per cluster.
fn for_each_overlap(
    x: &PositionListIndex,
    y: &PositionListIndex,
    mut visit: impl FnMut(usize, usize),
) {
    let probe = y.probing_table();
    let mut groups: HashMap<usize, usize> = HashMap::new();
    for cluster in x.clusters() {
        for &row in cluster {
            *groups.entry(probe.class_of(row)).or_insert(0) += 1;
        }
        for (_, overlap) in groups.drain() {
            visit(overlap, cluster.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AfdMetric, AfdMetricCalculator};
    use afd_core::{AfdError, MemoryTable};

    fn calculator(rows: &[&[&str]], num_columns: usize) -> AfdMetricCalculator {
        let mut table = MemoryTable::from_strings(num_columns, rows).expect("rows should be valid");
        AfdMetricCalculator::from_input_table(&mut table, true)
            .expect("non-empty table should load")
    }

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= 1.0e-12,
            "expected {expected}, got {actual}, |diff|={diff}"
        );
    }

    #[test]
    fn exact_dependency_scores_perfectly() {
        // Column 1 is a function of column 0; neither side is constant.
        let calc = calculator(
            &[&["a", "x"], &["a", "x"], &["b", "y"], &["b", "y"]],
            2,
        );
        assert_close(calc.calculate_g2(&[0], &[1]).expect("g2"), 0.0);
        assert_close(calc.calculate_tau(&[0], &[1]).expect("tau"), 1.0);
        assert_close(calc.calculate_fi(&[0], &[1]).expect("fi"), 1.0);
    }

    #[test]
    fn g2_counts_every_row_of_an_impure_cluster() {
        // The "a" cluster spans two rhs values, so all three of its rows are
        // error rows; the "b" cluster is pure.
        let calc = calculator(
            &[&["a", "x"], &["a", "x"], &["a", "y"], &["b", "z"], &["b", "z"]],
            2,
        );
        assert_close(calc.calculate_g2(&[0], &[1]).expect("g2"), 3.0 / 5.0);
    }

    #[test]
    fn tau_matches_hand_computed_value_on_a_small_table() {
        // lhs classes: {0,1},{2,3}; rhs classes: {0,2},{1,3}. Knowing lhs
        // tells nothing about rhs.
        let calc = calculator(
            &[&["a", "x"], &["a", "y"], &["b", "x"], &["b", "y"]],
            2,
        );
        // p1 = (4+4)/16 = 1/2; every overlap has size 1: p2 = (4·(1/2))/4 = 1/2.
        assert_close(calc.calculate_tau(&[0], &[1]).expect("tau"), 0.0);
    }

    #[test]
    fn constant_rhs_short_circuits_every_metric_to_zero() {
        let calc = calculator(&[&["a", "c"], &["b", "c"], &["a", "c"]], 2);
        for metric in AfdMetric::ALL {
            assert_close(calc.calculate(metric, &[0], &[1]).expect("metric"), 0.0);
        }
    }

    #[test]
    fn key_lhs_zeroes_mu_plus_and_g2() {
        let calc = calculator(&[&["r0", "x"], &["r1", "x"], &["r2", "y"]], 2);
        assert_close(calc.calculate_mu_plus(&[0], &[1]).expect("mu+"), 0.0);
        assert_close(calc.calculate_g2(&[0], &[1]).expect("g2"), 0.0);
        assert_close(calc.calculate_tau(&[0], &[1]).expect("tau"), 1.0);
        assert_close(calc.calculate_fi(&[0], &[1]).expect("fi"), 1.0);
    }

    #[test]
    fn mu_plus_is_clamped_below_at_zero() {
        // Independent columns with a small lhs domain push the raw formula
        // negative.
        let calc = calculator(
            &[
                &["a", "x"],
                &["a", "y"],
                &["b", "x"],
                &["b", "y"],
                &["a", "x"],
                &["b", "y"],
            ],
            2,
        );
        let mu = calc.calculate_mu_plus(&[0], &[1]).expect("mu+");
        assert!(mu >= 0.0);
    }

    #[test]
    fn dispatcher_matches_named_methods() {
        let calc = calculator(
            &[&["a", "x"], &["a", "y"], &["b", "x"], &["b", "x"]],
            2,
        );
        for metric in AfdMetric::ALL {
            let via_dispatch = calc.calculate(metric, &[0], &[1]).expect("dispatch");
            let via_method = match metric {
                AfdMetric::G2 => calc.calculate_g2(&[0], &[1]),
                AfdMetric::Tau => calc.calculate_tau(&[0], &[1]),
                AfdMetric::MuPlus => calc.calculate_mu_plus(&[0], &[1]),
                AfdMetric::Fi => calc.calculate_fi(&[0], &[1]),
            }
            .expect("named method");
            assert_close(via_dispatch, via_method);
        }
    }

    #[test]
    fn calculate_all_bundles_the_four_measures() {
        let calc = calculator(
            &[&["a", "x"], &["a", "y"], &["b", "x"], &["b", "x"]],
            2,
        );
        let scores = calc.calculate_all(&[0], &[1]).expect("scores");
        assert_close(scores.g2, calc.calculate_g2(&[0], &[1]).expect("g2"));
        assert_close(scores.tau, calc.calculate_tau(&[0], &[1]).expect("tau"));
        assert_close(
            scores.mu_plus,
            calc.calculate_mu_plus(&[0], &[1]).expect("mu+"),
        );
        assert_close(scores.fi, calc.calculate_fi(&[0], &[1]).expect("fi"));
    }

    #[test]
    fn empty_relation_is_rejected_at_construction() {
        let mut table = MemoryTable::from_strings(2, &[]).expect("table should be valid");
        let err = AfdMetricCalculator::from_input_table(&mut table, true)
            .expect_err("empty table should fail");
        assert_eq!(
            err.to_string(),
            "configuration error: empty dataset: AFD metric calculation is meaningless"
        );
    }

    #[test]
    fn invalid_index_sets_fail_without_poisoning_the_calculator() {
        let calc = calculator(&[&["a", "x"], &["a", "x"]], 2);

        let err = calc.calculate_g2(&[], &[1]).expect_err("empty lhs");
        assert!(matches!(err, AfdError::Configuration(_)));
        let err = calc.calculate_g2(&[0], &[7]).expect_err("bad rhs index");
        assert!(matches!(err, AfdError::Configuration(_)));

        assert_close(calc.calculate_g2(&[0], &[1]).expect("valid call"), 0.0);
    }

    #[test]
    fn metric_names_are_stable() {
        let names: Vec<&str> = AfdMetric::ALL.iter().map(|metric| metric.name()).collect();
        assert_eq!(names, vec!["g2", "tau", "mu_plus", "fi"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn metric_selector_serde_roundtrip() {
        for metric in AfdMetric::ALL {
            let encoded = serde_json::to_string(&metric).expect("metric should serialize");
            let decoded: AfdMetric =
                serde_json::from_str(&encoded).expect("metric should deserialize");
            assert_eq!(decoded, metric);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn scores_serde_roundtrip() {
        use super::AfdScores;

        let scores = AfdScores {
            g2: 1.0 / 6.0,
            tau: 78.0 / 90.0,
            mu_plus: 498.0 / 630.0,
            fi: 0.25,
        };
        let encoded = serde_json::to_string(&scores).expect("scores should serialize");
        let decoded: AfdScores = serde_json::from_str(&encoded).expect("scores should deserialize");
        assert_eq!(decoded, scores);
    }
}
