//! MPI communication backend for the distributed sort.
//!
//! Requires the `distributed` feature flag and an MPI installation.
//! Implements `CommunicationBackend` using `mpi::traits::*`.
//!
//! # Usage
//!
//! The caller must initialize MPI before constructing `MpiComm`:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let comm = MpiComm::new();
//! ```
//!
//! MPI aborts the job on communication errors, so the transport calls here
//! only fail on count conversions and protocol checks.

use super::{check_group_counts, check_root_counts, CommunicationBackend};
use crate::error::{Result, SortError};
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Count;

/// MPI-based communication backend over the world communicator.
pub struct MpiComm;

impl MpiComm {
    /// Create a new MPI communication backend.
    ///
    /// `mpi::initialize()` must have been called first.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MpiComm {
    fn default() -> Self {
        Self::new()
    }
}

fn to_counts(counts: &[usize]) -> Result<(Vec<Count>, Vec<Count>)> {
    let mut counts_out = Vec::with_capacity(counts.len());
    let mut displs = Vec::with_capacity(counts.len());
    let mut offset: Count = 0;
    for &count in counts {
        let count = Count::try_from(count).map_err(|_| {
            SortError::InvalidConfiguration(format!(
                "block of {count} elements exceeds MPI count range"
            ))
        })?;
        counts_out.push(count);
        displs.push(offset);
        offset = offset.checked_add(count).ok_or_else(|| {
            SortError::InvalidConfiguration("sequence exceeds MPI count range".into())
        })?;
    }
    Ok((counts_out, displs))
}

impl CommunicationBackend for MpiComm {
    fn rank(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.rank() as usize
    }

    fn num_ranks(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.size() as usize
    }

    fn broadcast_len(&self, root: usize, len: usize) -> Result<usize> {
        let world = SimpleCommunicator::world();
        let mut value = len as u64;
        world.process_at_rank(root as i32).broadcast_into(&mut value);
        Ok(value as usize)
    }

    fn exchange_len(&self, peer: usize, len: usize) -> Result<usize> {
        let world = SimpleCommunicator::world();
        let my_rank = world.rank();
        let peer_process = world.process_at_rank(peer as i32);
        let send = len as u64;

        // The lower-ranked process sends first, the higher-ranked receives
        // first, so blocking sends cannot deadlock.
        let received: u64 = if my_rank < peer as i32 {
            peer_process.send(&send);
            peer_process.receive::<u64>().0
        } else {
            let (value, _status) = peer_process.receive::<u64>();
            peer_process.send(&send);
            value
        };
        Ok(received as usize)
    }

    fn exchange_block(&self, peer: usize, block: &[f64]) -> Result<Vec<f64>> {
        let world = SimpleCommunicator::world();
        let my_rank = world.rank();
        let peer_process = world.process_at_rank(peer as i32);

        let received = if my_rank < peer as i32 {
            peer_process.send(block);
            peer_process.receive_vec::<f64>().0
        } else {
            let (data, _status) = peer_process.receive_vec::<f64>();
            peer_process.send(block);
            data
        };
        Ok(received)
    }

    fn scatter_blocks(
        &self,
        root: usize,
        data: Option<&[f64]>,
        counts: &[usize],
    ) -> Result<Vec<f64>> {
        let world = SimpleCommunicator::world();
        check_group_counts(counts, world.size() as usize)?;
        let my_rank = world.rank() as usize;
        let root_process = world.process_at_rank(root as i32);
        let mut block = vec![0.0f64; counts[my_rank]];

        if my_rank == root {
            let data = data.ok_or_else(|| {
                SortError::InvalidConfiguration(
                    "root rank must supply the sequence to scatter".into(),
                )
            })?;
            check_root_counts(data.len(), counts)?;
            let (counts, displs) = to_counts(counts)?;
            let partition = Partition::new(data, counts, displs);
            root_process.scatter_varcount_into_root(&partition, &mut block[..]);
        } else {
            root_process.scatter_varcount_into(&mut block[..]);
        }
        Ok(block)
    }

    fn gather_blocks(
        &self,
        root: usize,
        block: &[f64],
        counts: &[usize],
    ) -> Result<Option<Vec<f64>>> {
        let world = SimpleCommunicator::world();
        check_group_counts(counts, world.size() as usize)?;
        let my_rank = world.rank() as usize;
        let root_process = world.process_at_rank(root as i32);

        if block.len() != counts[my_rank] {
            return Err(SortError::ProtocolViolation(format!(
                "rank {my_rank} holds {} elements but the table assigns {}",
                block.len(),
                counts[my_rank]
            )));
        }

        if my_rank == root {
            let mut gathered = vec![0.0f64; counts.iter().sum()];
            let (counts, displs) = to_counts(counts)?;
            let mut partition = PartitionMut::new(&mut gathered[..], counts, displs);
            root_process.gather_varcount_into_root(block, &mut partition);
            Ok(Some(gathered))
        } else {
            root_process.gather_varcount_into(block);
            Ok(None)
        }
    }

    fn barrier(&self) {
        let world = SimpleCommunicator::world();
        world.barrier();
    }
}
