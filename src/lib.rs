//! Distributed odd-even transposition sort.
//!
//! A sequence of `f64` values is split into contiguous blocks, one per rank.
//! Each rank sorts its block locally, then ranks repeatedly swap blocks with
//! a neighbor, merge, and keep the half that matches their position. After
//! as many rounds as there are ranks, the blocks read in rank order are
//! globally sorted.
//!
//! Ranks talk through a [`comm::CommunicationBackend`]: threads in one
//! process ([`comm::ThreadComm`]) or MPI processes (`comm::comm_mpi::MpiComm`,
//! feature `distributed`).

pub mod comm;
pub mod data;
pub mod distribution;
pub mod driver;
pub mod engine;
pub mod error;
pub mod local_sort;
pub mod output;
pub mod partition;
pub mod stats;
pub mod verify;

pub use error::{Result, SortError};
