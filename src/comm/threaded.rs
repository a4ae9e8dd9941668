//! In-process communication backend built on channels.
//!
//! `ThreadComm::group(p)` returns one handle per rank. Each ordered pair of
//! ranks gets its own channel, so messages from different sources never
//! interleave and every pair sees its messages in send order. Sends never
//! block; a paired exchange is "send, then receive from the same peer", which
//! is a rendezvous for both sides.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};

use super::{check_group_counts, check_root_counts, CommunicationBackend};
use crate::error::{Result, SortError};

/// Payload carried between ranks.
#[derive(Debug)]
enum Message {
    Len(usize),
    Block(Vec<f64>),
}

impl Message {
    fn kind(&self) -> &'static str {
        match self {
            Message::Len(_) => "length",
            Message::Block(_) => "block",
        }
    }
}

/// One rank's handle on a simulated process group.
///
/// Handles are meant to be moved onto one thread each. Dropping a handle
/// disconnects it; peers waiting on it observe a transport failure.
pub struct ThreadComm {
    rank: usize,
    /// Indexed by destination rank.
    senders: Vec<Sender<Message>>,
    /// Indexed by source rank.
    receivers: Vec<Mutex<Receiver<Message>>>,
    barrier: Arc<Barrier>,
}

impl ThreadComm {
    /// Build a fully connected group of `num_ranks` handles, in rank order.
    pub fn group(num_ranks: usize) -> Vec<ThreadComm> {
        let barrier = Arc::new(Barrier::new(num_ranks.max(1)));

        // channels[src][dst]
        let mut senders: Vec<Vec<Sender<Message>>> = (0..num_ranks).map(|_| Vec::new()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Message>>>> = (0..num_ranks)
            .map(|_| (0..num_ranks).map(|_| None).collect())
            .collect();
        for (src, row) in senders.iter_mut().enumerate() {
            for dst_receivers in receivers.iter_mut() {
                let (tx, rx) = mpsc::channel();
                row.push(tx);
                dst_receivers[src] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadComm {
                rank,
                senders,
                receivers: receivers
                    .into_iter()
                    .flatten()
                    .map(Mutex::new)
                    .collect(),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<()> {
        if peer >= self.senders.len() || peer == self.rank {
            return Err(SortError::TransportFailure(format!(
                "rank {} cannot address rank {peer} in a group of {}",
                self.rank,
                self.senders.len()
            )));
        }
        Ok(())
    }

    fn send(&self, dst: usize, message: Message) -> Result<()> {
        self.senders[dst].send(message).map_err(|_| {
            SortError::TransportFailure(format!(
                "rank {dst} disconnected before receiving from rank {}",
                self.rank
            ))
        })
    }

    fn recv(&self, src: usize) -> Result<Message> {
        let receiver = self.receivers[src].lock().map_err(|_| {
            SortError::TransportFailure(format!("receive queue from rank {src} poisoned"))
        })?;
        receiver.recv().map_err(|_| {
            SortError::TransportFailure(format!(
                "rank {src} disconnected before sending to rank {}",
                self.rank
            ))
        })
    }

    fn recv_len(&self, src: usize) -> Result<usize> {
        match self.recv(src)? {
            Message::Len(len) => Ok(len),
            other => Err(SortError::ProtocolViolation(format!(
                "rank {} expected a length from rank {src}, received a {}",
                self.rank,
                other.kind()
            ))),
        }
    }

    fn recv_block(&self, src: usize) -> Result<Vec<f64>> {
        match self.recv(src)? {
            Message::Block(block) => Ok(block),
            other => Err(SortError::ProtocolViolation(format!(
                "rank {} expected a block from rank {src}, received a {}",
                self.rank,
                other.kind()
            ))),
        }
    }
}

impl CommunicationBackend for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.senders.len()
    }

    fn broadcast_len(&self, root: usize, len: usize) -> Result<usize> {
        if self.rank == root {
            for dst in (0..self.num_ranks()).filter(|&r| r != root) {
                self.send(dst, Message::Len(len))?;
            }
            Ok(len)
        } else {
            self.check_peer(root)?;
            self.recv_len(root)
        }
    }

    fn exchange_len(&self, peer: usize, len: usize) -> Result<usize> {
        self.check_peer(peer)?;
        self.send(peer, Message::Len(len))?;
        self.recv_len(peer)
    }

    fn exchange_block(&self, peer: usize, block: &[f64]) -> Result<Vec<f64>> {
        self.check_peer(peer)?;
        self.send(peer, Message::Block(block.to_vec()))?;
        self.recv_block(peer)
    }

    fn scatter_blocks(
        &self,
        root: usize,
        data: Option<&[f64]>,
        counts: &[usize],
    ) -> Result<Vec<f64>> {
        check_group_counts(counts, self.num_ranks())?;
        if self.rank != root {
            self.check_peer(root)?;
            let block = self.recv_block(root)?;
            let expected = counts[self.rank];
            if block.len() != expected {
                return Err(SortError::ProtocolViolation(format!(
                    "rank {} expected {expected} scattered elements, received {}",
                    self.rank,
                    block.len()
                )));
            }
            return Ok(block);
        }

        let data = data.ok_or_else(|| {
            SortError::InvalidConfiguration("root rank must supply the sequence to scatter".into())
        })?;
        check_root_counts(data.len(), counts)?;

        let mut own = Vec::new();
        let mut start = 0;
        for (dst, &count) in counts.iter().enumerate() {
            let piece = &data[start..start + count];
            if dst == root {
                own = piece.to_vec();
            } else {
                self.send(dst, Message::Block(piece.to_vec()))?;
            }
            start += count;
        }
        Ok(own)
    }

    fn gather_blocks(
        &self,
        root: usize,
        block: &[f64],
        counts: &[usize],
    ) -> Result<Option<Vec<f64>>> {
        check_group_counts(counts, self.num_ranks())?;
        if self.rank != root {
            self.check_peer(root)?;
            self.send(root, Message::Block(block.to_vec()))?;
            return Ok(None);
        }

        let mut gathered = Vec::with_capacity(counts.iter().sum());
        for (src, &count) in counts.iter().enumerate() {
            let piece = if src == root {
                block.to_vec()
            } else {
                self.recv_block(src)?
            };
            if piece.len() != count {
                return Err(SortError::ProtocolViolation(format!(
                    "root expected {count} elements from rank {src}, received {}",
                    piece.len()
                )));
            }
            gathered.extend_from_slice(&piece);
        }
        Ok(Some(gathered))
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
