//! Block partitioning of a sequence across ranks.
//!
//! Every rank computes the same table from `(n, num_ranks)` alone, so the
//! exchange protocol can cross-check advertised block sizes against it.

use std::ops::Range;

use crate::error::{Result, SortError};

/// Block length and starting offset for every rank.
///
/// Sizes differ by at most one. When `n` is not divisible by the number of
/// ranks the larger blocks go to the lower ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSizeTable {
    /// Block length per rank.
    sizes: Vec<usize>,
    /// Offset of each rank's first element in the full sequence.
    offsets: Vec<usize>,
}

impl BlockSizeTable {
    /// Partition a sequence of `n` elements over `num_ranks` ranks.
    ///
    /// Rank `r` receives `ceil(remaining / (num_ranks - r))` of the elements
    /// not yet assigned. Empty blocks are not permitted, so `n < num_ranks`
    /// is rejected along with an empty group.
    pub fn new(n: usize, num_ranks: usize) -> Result<Self> {
        if num_ranks < 1 {
            return Err(SortError::InvalidConfiguration(
                "process group must contain at least one rank".into(),
            ));
        }
        if n < num_ranks {
            return Err(SortError::InvalidConfiguration(format!(
                "data size {n} must be at least the number of ranks {num_ranks}"
            )));
        }

        let mut sizes = Vec::with_capacity(num_ranks);
        let mut offsets = Vec::with_capacity(num_ranks);
        let mut remaining = n;
        let mut offset = 0;
        for rank in 0..num_ranks {
            let size = remaining.div_ceil(num_ranks - rank);
            sizes.push(size);
            offsets.push(offset);
            remaining -= size;
            offset += size;
        }
        debug_assert_eq!(remaining, 0);

        Ok(BlockSizeTable { sizes, offsets })
    }

    /// Number of ranks covered by the table.
    pub fn num_ranks(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of elements (the sequence length `n`).
    pub fn total_len(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Block length owned by `rank`.
    pub fn size(&self, rank: usize) -> usize {
        self.sizes[rank]
    }

    /// Offset of `rank`'s block within the full sequence.
    pub fn offset(&self, rank: usize) -> usize {
        self.offsets[rank]
    }

    /// Index range of `rank`'s block within the full sequence.
    pub fn range(&self, rank: usize) -> Range<usize> {
        let start = self.offset(rank);
        start..start + self.size(rank)
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        let table = BlockSizeTable::new(8, 2).unwrap();
        assert_eq!(table.sizes(), &[4, 4]);
        assert_eq!(table.offsets(), &[0, 4]);
    }

    #[test]
    fn remainder_goes_to_lower_ranks() {
        let table = BlockSizeTable::new(7, 3).unwrap();
        assert_eq!(table.sizes(), &[3, 2, 2]);
        assert_eq!(table.offsets(), &[0, 3, 5]);

        let table = BlockSizeTable::new(11, 4).unwrap();
        assert_eq!(table.sizes(), &[3, 3, 3, 2]);
    }

    #[test]
    fn one_element_per_rank() {
        let table = BlockSizeTable::new(5, 5).unwrap();
        assert_eq!(table.sizes(), &[1, 1, 1, 1, 1]);
        assert_eq!(table.total_len(), 5);
    }

    #[test]
    fn single_rank_owns_everything() {
        let table = BlockSizeTable::new(9, 1).unwrap();
        assert_eq!(table.sizes(), &[9]);
        assert_eq!(table.range(0), 0..9);
    }

    #[test]
    fn ranges_tile_the_sequence() {
        let table = BlockSizeTable::new(23, 6).unwrap();
        let mut next = 0;
        for rank in 0..table.num_ranks() {
            let range = table.range(rank);
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, 23);
    }

    #[test]
    fn fewer_elements_than_ranks_is_rejected() {
        let err = BlockSizeTable::new(3, 5).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }

    #[test]
    fn empty_group_is_rejected() {
        let err = BlockSizeTable::new(3, 0).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }
}
