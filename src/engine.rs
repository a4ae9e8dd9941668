//! Odd-even transposition rounds over a distributed block sequence.
//!
//! On even rounds ranks pair as (0,1), (2,3), ...; on odd rounds as
//! (1,2), (3,4), .... Paired ranks swap their sorted blocks, merge them, and
//! the lower rank keeps the smallest `own_size` values while the upper rank
//! keeps the largest. After `num_ranks` rounds the blocks, read in rank
//! order, form one sorted sequence.

use crate::comm::CommunicationBackend;
use crate::error::{Result, SortError};
use crate::local_sort::LocalSorter;
use crate::partition::BlockSizeTable;

/// Which end of the merged pair a rank retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    Lower,
    Upper,
}

/// A rank's role in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPlan {
    /// Exchange partner, `None` when the partner would fall outside the group.
    pub neighbor: Option<usize>,
    pub keep: KeepPolicy,
}

/// What a rank did during one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Idle,
    Exchanged { peer: usize, received: usize },
}

/// Totals for one full transposition run on one rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranspositionSummary {
    pub rounds: usize,
    pub exchanges: usize,
    pub idle_rounds: usize,
    pub elements_received: usize,
}

/// Neighbor and keep-policy for `rank` in `round`.
///
/// When round parity and rank parity match the rank pairs upward and keeps
/// the lower half; otherwise it pairs downward and keeps the upper half.
pub fn round_plan(round: usize, rank: usize, num_ranks: usize) -> RoundPlan {
    if round % 2 == rank % 2 {
        let up = rank + 1;
        RoundPlan {
            neighbor: (up < num_ranks).then_some(up),
            keep: KeepPolicy::Lower,
        }
    } else {
        RoundPlan {
            neighbor: rank.checked_sub(1),
            keep: KeepPolicy::Upper,
        }
    }
}

/// Stable two-pointer merge of two sorted slices. Ties take from `own` first.
pub fn merge_sorted(own: &[f64], theirs: &[f64]) -> Vec<f64> {
    let mut merged = Vec::with_capacity(own.len() + theirs.len());
    let (mut i, mut j) = (0, 0);
    while i < own.len() && j < theirs.len() {
        if theirs[j].total_cmp(&own[i]).is_lt() {
            merged.push(theirs[j]);
            j += 1;
        } else {
            merged.push(own[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&own[i..]);
    merged.extend_from_slice(&theirs[j..]);
    merged
}

/// Merge `theirs` into `block` and keep `block.len()` values from the
/// requested end of the merged sequence.
pub fn merge_split(block: &mut [f64], theirs: &[f64], keep: KeepPolicy) {
    let merged = merge_sorted(block, theirs);
    let n = block.len();
    match keep {
        KeepPolicy::Lower => block.copy_from_slice(&merged[..n]),
        KeepPolicy::Upper => block.copy_from_slice(&merged[merged.len() - n..]),
    }
}

/// Run one transposition round for the calling rank.
///
/// `block` must already be sorted. Its length never changes.
pub fn exchange_round<C: CommunicationBackend + ?Sized>(
    comm: &C,
    table: &BlockSizeTable,
    block: &mut [f64],
    round: usize,
) -> Result<RoundOutcome> {
    let rank = comm.rank();
    let plan = round_plan(round, rank, comm.num_ranks());
    let Some(peer) = plan.neighbor else {
        tracing::trace!(round, rank, "no neighbor, idle round");
        return Ok(RoundOutcome::Idle);
    };

    let advertised = comm.exchange_len(peer, block.len())?;
    if advertised != table.size(peer) {
        return Err(SortError::ProtocolViolation(format!(
            "round {round}: rank {peer} advertised {advertised} elements, table assigns {}",
            table.size(peer)
        )));
    }

    let theirs = comm.exchange_block(peer, block)?;
    if theirs.len() != advertised {
        return Err(SortError::ProtocolViolation(format!(
            "round {round}: rank {peer} advertised {advertised} elements but sent {}",
            theirs.len()
        )));
    }

    merge_split(block, &theirs, plan.keep);
    tracing::debug!(
        round,
        rank,
        peer,
        keep = ?plan.keep,
        received = theirs.len(),
        "exchanged block"
    );

    Ok(RoundOutcome::Exchanged {
        peer,
        received: theirs.len(),
    })
}

/// Run the full `num_ranks`-round schedule on a locally sorted block.
///
/// There is no early exit; every round runs even if the sequence is already
/// in order.
pub fn transposition_sort<C: CommunicationBackend + ?Sized>(
    comm: &C,
    table: &BlockSizeTable,
    block: &mut [f64],
) -> Result<TranspositionSummary> {
    let rank = comm.rank();
    let num_ranks = comm.num_ranks();
    let _span =
        tracing::debug_span!("transposition_sort", rank, num_ranks, len = block.len()).entered();

    if table.num_ranks() != num_ranks {
        return Err(SortError::InvalidConfiguration(format!(
            "block size table covers {} ranks, group has {num_ranks}",
            table.num_ranks()
        )));
    }
    if block.len() != table.size(rank) {
        return Err(SortError::InvalidConfiguration(format!(
            "rank {rank} holds {} elements, table assigns {}",
            block.len(),
            table.size(rank)
        )));
    }

    let mut summary = TranspositionSummary::default();
    for round in 0..num_ranks {
        match exchange_round(comm, table, block, round)? {
            RoundOutcome::Idle => summary.idle_rounds += 1,
            RoundOutcome::Exchanged { received, .. } => {
                summary.exchanges += 1;
                summary.elements_received += received;
            }
        }
        summary.rounds += 1;
    }
    Ok(summary)
}

/// Locally sort `block`, then run the transposition schedule.
pub fn odd_even_sort<C: CommunicationBackend + ?Sized>(
    comm: &C,
    table: &BlockSizeTable,
    block: &mut [f64],
    sorter: &dyn LocalSorter,
) -> Result<TranspositionSummary> {
    sorter.sort_in_place(block);
    transposition_sort(comm, table, block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SingleProcessComm, ThreadComm};
    use crate::local_sort::StdSorter;
    use std::thread;

    #[test]
    fn even_round_pairs_from_zero() {
        assert_eq!(
            round_plan(0, 0, 4),
            RoundPlan { neighbor: Some(1), keep: KeepPolicy::Lower }
        );
        assert_eq!(
            round_plan(0, 1, 4),
            RoundPlan { neighbor: Some(0), keep: KeepPolicy::Upper }
        );
        assert_eq!(round_plan(0, 2, 4).neighbor, Some(3));
        assert_eq!(round_plan(0, 3, 4).neighbor, Some(2));
    }

    #[test]
    fn odd_round_pairs_from_one() {
        assert_eq!(
            round_plan(1, 0, 4),
            RoundPlan { neighbor: None, keep: KeepPolicy::Upper }
        );
        assert_eq!(
            round_plan(1, 1, 4),
            RoundPlan { neighbor: Some(2), keep: KeepPolicy::Lower }
        );
        assert_eq!(
            round_plan(1, 2, 4),
            RoundPlan { neighbor: Some(1), keep: KeepPolicy::Upper }
        );
        assert_eq!(
            round_plan(1, 3, 4),
            RoundPlan { neighbor: None, keep: KeepPolicy::Lower }
        );
    }

    #[test]
    fn pairings_are_symmetric() {
        for num_ranks in 1..8 {
            for round in 0..num_ranks {
                for rank in 0..num_ranks {
                    let plan = round_plan(round, rank, num_ranks);
                    if let Some(peer) = plan.neighbor {
                        let back = round_plan(round, peer, num_ranks);
                        assert_eq!(back.neighbor, Some(rank));
                        assert_ne!(back.keep, plan.keep);
                        assert_eq!(plan.keep == KeepPolicy::Lower, rank < peer);
                    }
                }
            }
        }
    }

    #[test]
    fn merge_interleaves_and_keeps_duplicates() {
        let merged = merge_sorted(&[1.0, 3.0, 5.0, 5.0], &[2.0, 5.0, 6.0]);
        assert_eq!(merged, vec![1.0, 2.0, 3.0, 5.0, 5.0, 5.0, 6.0]);
    }

    #[test]
    fn merge_with_empty_side() {
        assert_eq!(merge_sorted(&[], &[1.0, 2.0]), vec![1.0, 2.0]);
        assert_eq!(merge_sorted(&[1.0, 2.0], &[]), vec![1.0, 2.0]);
    }

    #[test]
    fn split_keeps_own_length_with_unequal_blocks() {
        let mut lower = vec![4.0, 6.0, 9.0];
        merge_split(&mut lower, &[1.0, 7.0], KeepPolicy::Lower);
        assert_eq!(lower, vec![1.0, 4.0, 6.0]);

        let mut upper = vec![1.0, 7.0];
        merge_split(&mut upper, &[4.0, 6.0, 9.0], KeepPolicy::Upper);
        assert_eq!(upper, vec![7.0, 9.0]);
    }

    #[test]
    fn single_rank_only_sorts_locally() {
        let table = BlockSizeTable::new(4, 1).unwrap();
        let mut block = vec![4.0, 2.0, 3.0, 1.0];
        let summary = odd_even_sort(&SingleProcessComm, &table, &mut block, &StdSorter).unwrap();
        assert_eq!(block, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.exchanges, 0);
        assert_eq!(summary.idle_rounds, 1);
    }

    #[test]
    fn block_length_must_match_table() {
        let table = BlockSizeTable::new(4, 1).unwrap();
        let mut block = vec![1.0, 2.0];
        let err = transposition_sort(&SingleProcessComm, &table, &mut block).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }

    #[test]
    fn two_ranks_sort_descending_input() {
        let table = BlockSizeTable::new(8, 2).unwrap();
        let blocks = vec![vec![8.0, 7.0, 6.0, 5.0], vec![4.0, 3.0, 2.0, 1.0]];
        let results: Vec<Vec<f64>> = thread::scope(|s| {
            let handles: Vec<_> = ThreadComm::group(2)
                .into_iter()
                .zip(blocks)
                .map(|(comm, mut block)| {
                    let table = &table;
                    s.spawn(move || {
                        odd_even_sort(&comm, table, &mut block, &StdSorter).unwrap();
                        block
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(results[1], vec![5.0, 6.0, 7.0, 8.0]);
    }
}
