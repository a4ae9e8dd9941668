//! Communication backend abstraction for the distributed sort.
//!
//! Provides a trait for the pairwise exchanges and the coordinator
//! collectives the sort needs, plus a no-op single-process implementation.
//! `ThreadComm` simulates a group in one process; `MpiComm` (feature
//! `distributed`) runs it across processes.

#[cfg(feature = "distributed")]
pub mod comm_mpi;
pub mod threaded;

pub use threaded::ThreadComm;

use crate::error::{Result, SortError};

/// Abstraction over inter-process communication for the distributed sort.
///
/// Point-to-point exchanges are a rendezvous: both partners send and both
/// receive, and the call returns once the partner's payload has arrived.
pub trait CommunicationBackend: Send + Sync {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// Total number of ranks in the group.
    fn num_ranks(&self) -> usize;

    /// Broadcast a length from `root`. Non-root callers' `len` is ignored.
    fn broadcast_len(&self, root: usize, len: usize) -> Result<usize>;

    /// Swap a block length with `peer` and return the peer's.
    fn exchange_len(&self, peer: usize, len: usize) -> Result<usize>;

    /// Swap a whole block with `peer` and return whatever the peer sent.
    ///
    /// The received length is not checked here; callers compare it against
    /// the length advertised by `exchange_len`.
    fn exchange_block(&self, peer: usize, block: &[f64]) -> Result<Vec<f64>>;

    /// Split `data` (root only) into `counts[r]`-sized contiguous pieces and
    /// deliver piece `r` to rank `r`.
    fn scatter_blocks(
        &self,
        root: usize,
        data: Option<&[f64]>,
        counts: &[usize],
    ) -> Result<Vec<f64>>;

    /// Concatenate every rank's block on `root` in rank order.
    ///
    /// Returns `Some` on the root and `None` everywhere else.
    fn gather_blocks(
        &self,
        root: usize,
        block: &[f64],
        counts: &[usize],
    ) -> Result<Option<Vec<f64>>>;

    /// Synchronization barrier.
    fn barrier(&self);
}

/// No-op communication backend for a group of one.
///
/// Collectives pass data straight through. There is never a neighbor, so any
/// point-to-point exchange is a transport failure.
pub struct SingleProcessComm;

impl SingleProcessComm {
    fn no_peer(peer: usize) -> SortError {
        SortError::TransportFailure(format!(
            "rank {peer} is unreachable from a single-process group"
        ))
    }
}

impl CommunicationBackend for SingleProcessComm {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn broadcast_len(&self, _root: usize, len: usize) -> Result<usize> {
        Ok(len)
    }

    fn exchange_len(&self, peer: usize, _len: usize) -> Result<usize> {
        Err(Self::no_peer(peer))
    }

    fn exchange_block(&self, peer: usize, _block: &[f64]) -> Result<Vec<f64>> {
        Err(Self::no_peer(peer))
    }

    fn scatter_blocks(
        &self,
        _root: usize,
        data: Option<&[f64]>,
        counts: &[usize],
    ) -> Result<Vec<f64>> {
        check_group_counts(counts, 1)?;
        let data = data.ok_or_else(|| {
            SortError::InvalidConfiguration("root rank must supply the sequence to scatter".into())
        })?;
        check_root_counts(data.len(), counts)?;
        Ok(data.to_vec())
    }

    fn gather_blocks(
        &self,
        _root: usize,
        block: &[f64],
        counts: &[usize],
    ) -> Result<Option<Vec<f64>>> {
        check_group_counts(counts, 1)?;
        Ok(Some(block.to_vec()))
    }

    fn barrier(&self) {}
}

/// Check that there is exactly one block count per rank.
pub(crate) fn check_group_counts(counts: &[usize], num_ranks: usize) -> Result<()> {
    if counts.len() != num_ranks {
        return Err(SortError::InvalidConfiguration(format!(
            "{} block counts given for a group of {num_ranks} ranks",
            counts.len()
        )));
    }
    Ok(())
}

/// Check that the scatter counts cover the root's sequence exactly.
pub(crate) fn check_root_counts(len: usize, counts: &[usize]) -> Result<()> {
    let total: usize = counts.iter().sum();
    if total != len {
        return Err(SortError::InvalidConfiguration(format!(
            "scatter counts cover {total} elements but the sequence holds {len}"
        )));
    }
    Ok(())
}
