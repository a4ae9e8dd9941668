//! Local block sorting strategies.
//!
//! The distributed protocol only needs each block in non-decreasing order
//! before the first round; which algorithm gets it there is a run-time choice.
//! All strategies order values by `f64::total_cmp`.

use clap::ValueEnum;
use rayon::prelude::*;

/// Sorts one rank's block in place.
pub trait LocalSorter: Send + Sync {
    fn sort_in_place(&self, block: &mut [f64]);

    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;
}

/// Serial bubble sort. Quadratic; kept as the plain comparison baseline.
pub struct BubbleSorter;

impl LocalSorter for BubbleSorter {
    fn sort_in_place(&self, block: &mut [f64]) {
        let n = block.len();
        for pass in 1..n {
            let mut swapped = false;
            for j in 0..n - pass {
                if block[j].total_cmp(&block[j + 1]).is_gt() {
                    block.swap(j, j + 1);
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
    }

    fn name(&self) -> &'static str {
        "bubble"
    }
}

/// Standard library pattern-defeating quicksort.
pub struct StdSorter;

impl LocalSorter for StdSorter {
    fn sort_in_place(&self, block: &mut [f64]) {
        block.sort_unstable_by(f64::total_cmp);
    }

    fn name(&self) -> &'static str {
        "std"
    }
}

/// Rayon parallel sort, for large blocks on multi-core ranks.
pub struct ParallelSorter;

impl LocalSorter for ParallelSorter {
    fn sort_in_place(&self, block: &mut [f64]) {
        block.par_sort_unstable_by(f64::total_cmp);
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

/// Local sort selection, as exposed on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortStrategy {
    Bubble,
    #[default]
    Std,
    Parallel,
}

impl SortStrategy {
    pub fn sorter(self) -> Box<dyn LocalSorter> {
        match self {
            SortStrategy::Bubble => Box::new(BubbleSorter),
            SortStrategy::Std => Box::new(StdSorter),
            SortStrategy::Parallel => Box::new(ParallelSorter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_sorters() -> Vec<Box<dyn LocalSorter>> {
        vec![Box::new(BubbleSorter), Box::new(StdSorter), Box::new(ParallelSorter)]
    }

    #[test]
    fn sorters_agree_on_mixed_input() {
        let input = vec![3.5, -1.0, 0.0, 1e9, -0.0, 2.25, 3.5, -7.75];
        let mut expected = input.clone();
        expected.sort_by(f64::total_cmp);

        for sorter in all_sorters() {
            let mut block = input.clone();
            sorter.sort_in_place(&mut block);
            let bits: Vec<u64> = block.iter().map(|v| v.to_bits()).collect();
            let expected_bits: Vec<u64> = expected.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits, expected_bits, "{} disagrees", sorter.name());
        }
    }

    #[test]
    fn bubble_handles_trivial_blocks() {
        let mut empty: Vec<f64> = Vec::new();
        BubbleSorter.sort_in_place(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![4.0];
        BubbleSorter.sort_in_place(&mut single);
        assert_eq!(single, vec![4.0]);
    }

    #[test]
    fn bubble_sorts_descending_run() {
        let mut block: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        BubbleSorter.sort_in_place(&mut block);
        let expected: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(block, expected);
    }

    #[test]
    fn nan_sorts_to_the_end() {
        for sorter in all_sorters() {
            let mut block = vec![f64::NAN, 1.0, -2.0];
            sorter.sort_in_place(&mut block);
            assert_eq!(&block[..2], &[-2.0, 1.0]);
            assert!(block[2].is_nan(), "{} misplaced NaN", sorter.name());
        }
    }

    #[test]
    fn strategy_selects_named_sorter() {
        assert_eq!(SortStrategy::Bubble.sorter().name(), "bubble");
        assert_eq!(SortStrategy::Std.sorter().name(), "std");
        assert_eq!(SortStrategy::Parallel.sorter().name(), "parallel");
        assert_eq!(SortStrategy::default(), SortStrategy::Std);
    }
}
