//! One complete distributed sort, from data generation to verification.
//!
//! `run` is executed by every rank of a group with the same `RunConfig`.
//! Rank 0 coordinates: it owns the full sequence before scatter and after
//! gather, and is the only rank that returns a report. `simulate` runs a
//! whole group on threads inside this process.

use std::io::Write;
use std::thread;
use std::time::Instant;

use crate::comm::{CommunicationBackend, ThreadComm};
use crate::data::{self, DataSource};
use crate::distribution;
use crate::engine::{self, TranspositionSummary};
use crate::error::{Result, SortError};
use crate::local_sort::SortStrategy;
use crate::output;
use crate::partition::BlockSizeTable;
use crate::stats::Stats;
use crate::verify;

/// Rank that generates, scatters, gathers and verifies the sequence.
pub const COORDINATOR: usize = 0;

/// Settings shared by every rank of a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Sequence length. Only the coordinator's value is used; it is
    /// broadcast to the other ranks.
    pub data_size: usize,
    pub source: DataSource,
    pub strategy: SortStrategy,
    pub verify: bool,
    /// Print the initial sequence and the distributed blocks before and
    /// after sorting.
    pub print: bool,
}

impl RunConfig {
    pub fn new(data_size: usize) -> Self {
        Self {
            data_size,
            source: DataSource::Dummy,
            strategy: SortStrategy::default(),
            verify: true,
            print: false,
        }
    }
}

/// Coordinator's result of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sorted: Vec<f64>,
    /// `None` when verification was disabled.
    pub verified: Option<bool>,
    /// Coordinator's transposition counters.
    pub summary: TranspositionSummary,
}

/// Time `f` and record it as a phase when stats are enabled.
fn timed<T>(
    stats: &mut Option<&mut Stats>,
    name: &'static str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    match stats {
        Some(stats) => {
            let start = Instant::now();
            let value = f()?;
            stats.add_phase(name, start.elapsed());
            Ok(value)
        }
        None => f(),
    }
}

/// Run the full distributed sort on the calling rank.
///
/// Returns `Some(report)` on the coordinator and `None` on every other rank.
pub fn run<C: CommunicationBackend + ?Sized>(
    comm: &C,
    config: &RunConfig,
    stats: Option<&mut Stats>,
) -> Result<Option<RunReport>> {
    run_with_output(comm, config, stats, &mut std::io::stdout())
}

/// [`run`] with diagnostic printing sent to `writer`.
pub fn run_with_output<C, W>(
    comm: &C,
    config: &RunConfig,
    mut stats: Option<&mut Stats>,
    writer: &mut W,
) -> Result<Option<RunReport>>
where
    C: CommunicationBackend + ?Sized,
    W: Write,
{
    let rank = comm.rank();
    let num_ranks = comm.num_ranks();
    let _span = tracing::info_span!("odd_even_run", rank, num_ranks).entered();
    let is_coordinator = rank == COORDINATOR;

    let data_size = comm.broadcast_len(COORDINATOR, config.data_size)?;
    let table = BlockSizeTable::new(data_size, num_ranks)?;
    let sorter = config.strategy.sorter();

    if let Some(stats) = stats.as_deref_mut() {
        stats.num_ranks = num_ranks;
        stats.data_size = data_size;
        stats.local_sorter = sorter.name();
    }

    let mut printed = Ok(());
    let (sequence, original) = if is_coordinator {
        let sequence = data::generate(config.source, data_size);
        let original = config.verify.then(|| sequence.clone());
        if config.print {
            printed = output::write_titled_sequence("Initial data:", &sequence, writer)
                .and_then(|()| output::write_block_table(&table, writer));
        }
        (Some(sequence), original)
    } else {
        (None, None)
    };

    let mut block = timed(&mut stats, "distribution", || {
        distribution::scatter(comm, COORDINATOR, sequence.as_deref(), &table)
    })?;
    // Held until the other ranks have their blocks.
    printed?;
    drop(sequence);

    if config.print {
        output::parallel_print(comm, "Data distribution", &block, writer)?;
    }

    timed(&mut stats, "local sort", || {
        sorter.sort_in_place(&mut block);
        Ok(())
    })?;

    let summary = timed(&mut stats, "transposition", || {
        engine::transposition_sort(comm, &table, &mut block)
    })?;
    if is_coordinator {
        tracing::info!(
            rounds = summary.rounds,
            exchanges = summary.exchanges,
            "transposition finished"
        );
    }

    if config.print {
        output::parallel_print(comm, "Sorted blocks", &block, writer)?;
    }

    let gathered = timed(&mut stats, "collection", || {
        distribution::gather(comm, COORDINATOR, &block, &table)
    })?;

    let Some(sorted) = gathered else {
        return Ok(None);
    };

    let verified = match original {
        Some(original) => {
            let ok = timed(&mut stats, "verification", || {
                Ok(verify::verify(&sorted, original))
            })?;
            if ok {
                tracing::info!(data_size, "result matches reference sort");
            } else {
                tracing::warn!(data_size, "result differs from reference sort");
            }
            Some(ok)
        }
        None => None,
    };

    if let Some(stats) = stats {
        stats.record_transposition(&summary);
        stats.verified = verified;
    }

    Ok(Some(RunReport {
        sorted,
        verified,
        summary,
    }))
}

/// Run a group of `num_ranks` ranks on threads and return the coordinator's
/// report.
///
/// Every rank runs to completion or failure. When several ranks fail the
/// lowest rank's error is returned.
pub fn simulate(
    num_ranks: usize,
    config: &RunConfig,
    stats: Option<&mut Stats>,
) -> Result<RunReport> {
    if num_ranks < 1 {
        return Err(SortError::InvalidConfiguration(
            "process group must contain at least one rank".into(),
        ));
    }

    let mut stats = stats;
    let results: Vec<Result<Option<RunReport>>> = thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::group(num_ranks)
            .into_iter()
            .map(|comm| {
                let rank_stats = if comm.rank() == COORDINATOR { stats.take() } else { None };
                s.spawn(move || run(&comm, config, rank_stats))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(SortError::TransportFailure("rank thread panicked".into()))
                })
            })
            .collect()
    });

    let mut report = None;
    for result in results {
        if let Some(r) = result? {
            report = Some(r);
        }
    }
    report.ok_or_else(|| SortError::TransportFailure("coordinator produced no result".into()))
}
