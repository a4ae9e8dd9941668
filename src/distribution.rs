//! Scatter of the coordinator's sequence into per-rank blocks, and the
//! inverse gather.
//!
//! Nothing here sorts or transforms values; blocks are contiguous slices of
//! the sequence in their original order, sized by the `BlockSizeTable`.

use crate::comm::CommunicationBackend;
use crate::error::{Result, SortError};
use crate::partition::BlockSizeTable;

fn check_group<C: CommunicationBackend + ?Sized>(comm: &C, table: &BlockSizeTable) -> Result<()> {
    if table.num_ranks() != comm.num_ranks() {
        return Err(SortError::InvalidConfiguration(format!(
            "table has {} blocks for a group of {} ranks",
            table.num_ranks(),
            comm.num_ranks()
        )));
    }
    Ok(())
}

/// Split `sequence` into one block per rank.
pub fn distribute(sequence: &[f64], table: &BlockSizeTable) -> Result<Vec<Vec<f64>>> {
    if sequence.len() != table.total_len() {
        return Err(SortError::InvalidConfiguration(format!(
            "sequence holds {} elements, table covers {}",
            sequence.len(),
            table.total_len()
        )));
    }
    Ok((0..table.num_ranks())
        .map(|rank| sequence[table.range(rank)].to_vec())
        .collect())
}

/// Concatenate `blocks` in rank order. Exact inverse of [`distribute`].
pub fn collect(blocks: &[Vec<f64>], table: &BlockSizeTable) -> Result<Vec<f64>> {
    if blocks.len() != table.num_ranks() {
        return Err(SortError::ProtocolViolation(format!(
            "collected {} blocks for a group of {}",
            blocks.len(),
            table.num_ranks()
        )));
    }
    let mut sequence = Vec::with_capacity(table.total_len());
    for (rank, block) in blocks.iter().enumerate() {
        if block.len() != table.size(rank) {
            return Err(SortError::ProtocolViolation(format!(
                "rank {rank} block holds {} elements, table assigns {}",
                block.len(),
                table.size(rank)
            )));
        }
        sequence.extend_from_slice(block);
    }
    Ok(sequence)
}

/// Deliver each rank its block of the root's `sequence`.
///
/// Only the root supplies `sequence`; other ranks pass `None`.
pub fn scatter<C: CommunicationBackend + ?Sized>(
    comm: &C,
    root: usize,
    sequence: Option<&[f64]>,
    table: &BlockSizeTable,
) -> Result<Vec<f64>> {
    check_group(comm, table)?;
    if comm.rank() == root {
        match sequence {
            Some(seq) if seq.len() == table.total_len() => {}
            Some(seq) => {
                return Err(SortError::InvalidConfiguration(format!(
                    "sequence holds {} elements, table covers {}",
                    seq.len(),
                    table.total_len()
                )))
            }
            None => {
                return Err(SortError::InvalidConfiguration(
                    "root rank must supply the sequence to scatter".into(),
                ))
            }
        }
    }
    let block = comm.scatter_blocks(root, sequence, table.sizes())?;
    tracing::trace!(rank = comm.rank(), len = block.len(), "received block");
    Ok(block)
}

/// Collect every rank's block on the root, in rank order.
pub fn gather<C: CommunicationBackend + ?Sized>(
    comm: &C,
    root: usize,
    block: &[f64],
    table: &BlockSizeTable,
) -> Result<Option<Vec<f64>>> {
    check_group(comm, table)?;
    if block.len() != table.size(comm.rank()) {
        return Err(SortError::ProtocolViolation(format!(
            "rank {} holds {} elements, table assigns {}",
            comm.rank(),
            block.len(),
            table.size(comm.rank())
        )));
    }
    comm.gather_blocks(root, block, table.sizes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SingleProcessComm, ThreadComm};

    #[test]
    fn distribute_front_loads_remainder() {
        let table = BlockSizeTable::new(7, 3).unwrap();
        let data: Vec<f64> = (1..=7).map(f64::from).collect();
        let blocks = distribute(&data, &table).unwrap();
        assert_eq!(blocks, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0], vec![6.0, 7.0]]);
    }

    #[test]
    fn collect_inverts_distribute() {
        let table = BlockSizeTable::new(10, 4).unwrap();
        let data: Vec<f64> = (0..10).map(|i| (i * 7 % 10) as f64).collect();
        let blocks = distribute(&data, &table).unwrap();
        assert_eq!(collect(&blocks, &table).unwrap(), data);
    }

    #[test]
    fn distribute_rejects_length_mismatch() {
        let table = BlockSizeTable::new(4, 2).unwrap();
        let err = distribute(&[1.0, 2.0, 3.0], &table).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }

    #[test]
    fn collect_rejects_resized_block() {
        let table = BlockSizeTable::new(4, 2).unwrap();
        let blocks = vec![vec![1.0], vec![2.0, 3.0, 4.0]];
        let err = collect(&blocks, &table).unwrap_err();
        assert!(matches!(err, SortError::ProtocolViolation(_)));
    }

    #[test]
    fn scatter_gather_single_process() {
        let table = BlockSizeTable::new(3, 1).unwrap();
        let data = [2.0, 1.0, 3.0];
        let block = scatter(&SingleProcessComm, 0, Some(&data), &table).unwrap();
        assert_eq!(block, data);
        let gathered = gather(&SingleProcessComm, 0, &block, &table).unwrap();
        assert_eq!(gathered, Some(data.to_vec()));
    }

    #[test]
    fn root_without_sequence_is_rejected() {
        let table = BlockSizeTable::new(3, 1).unwrap();
        let err = scatter(&SingleProcessComm, 0, None, &table).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }

    #[test]
    fn gather_rejects_table_for_smaller_group() {
        let table = BlockSizeTable::new(4, 2).unwrap();
        let group = ThreadComm::group(3);
        let err = gather(&group[2], 0, &[1.0], &table).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }

    #[test]
    fn scatter_rejects_table_for_smaller_group_off_root() {
        let table = BlockSizeTable::new(4, 2).unwrap();
        let group = ThreadComm::group(3);
        // Would otherwise wait on a root that never sends.
        let err = scatter(&group[1], 0, None, &table).unwrap_err();
        assert!(matches!(err, SortError::InvalidConfiguration(_)));
    }
}
