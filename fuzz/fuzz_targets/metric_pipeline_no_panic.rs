// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use afd_core::MemoryTable;
use afd_metrics::{AfdMetric, AfdMetricCalculator};
use libfuzzer_sys::fuzz_target;

const RANGE_TOL: f64 = 1.0e-9;

struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn next_u8(&mut self) -> u8 {
        let value = self.data.get(self.position).copied().unwrap_or(0);
        self.position += 1;
        value
    }
}

fn bounded(seed: u8, min: usize, max: usize) -> usize {
    min + usize::from(seed) % (max - min + 1)
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = ByteCursor::new(data);

    let num_columns = bounded(cursor.next_u8(), 1, 4);
    let num_rows = bounded(cursor.next_u8(), 0, 64);
    let nulls_are_equal = cursor.next_u8() & 1 == 0;

    let rows: Vec<Vec<Option<String>>> = (0..num_rows)
        .map(|_| {
            (0..num_columns)
                .map(|_| {
                    let seed = cursor.next_u8();
                    if seed % 7 == 0 {
                        None
                    } else {
                        Some((seed % 5).to_string())
                    }
                })
                .collect()
        })
        .collect();

    let Ok(mut table) = MemoryTable::new(num_columns, None, rows) else {
        return;
    };
    let Ok(calculator) = AfdMetricCalculator::from_input_table(&mut table, nulls_are_equal) else {
        // Zero-row tables are rejected at construction; nothing else to do.
        return;
    };

    let lhs = [usize::from(cursor.next_u8()) % num_columns];
    let rhs = [usize::from(cursor.next_u8()) % num_columns];

    for metric in AfdMetric::ALL {
        let value = calculator
            .calculate(metric, &lhs, &rhs)
            .expect("in-range single-column candidates must compute");
        assert!(
            (-RANGE_TOL..=1.0 + RANGE_TOL).contains(&value),
            "{} left [0, 1]: {value}",
            metric.name()
        );
    }

    let scores = calculator
        .calculate_all(&lhs, &rhs)
        .expect("in-range single-column candidates must compute");
    for value in [scores.g2, scores.tau, scores.mu_plus, scores.fi] {
        assert!(value.is_finite());
    }
});
