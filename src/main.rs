use clap::Parser;
use oddeven::data::DataKind;
use oddeven::driver::{self, RunConfig, RunReport};
use oddeven::local_sort::SortStrategy;
use oddeven::output;
use oddeven::stats::Stats;
use std::io::{self, BufRead, Write};

/// Distributed odd-even transposition sort
#[derive(Parser)]
#[command(name = "oddeven", version)]
struct Cli {
    /// Number of values to sort (prompted for when omitted)
    #[arg(long, short = 'n')]
    size: Option<usize>,

    /// Number of simulated ranks (ignored with --mpi)
    #[arg(long, short = 'p', default_value_t = 4)]
    ranks: usize,

    /// Input generator
    #[arg(long, value_enum, default_value_t = DataKind::Dummy)]
    data: DataKind,

    /// Seed for the random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Local sort strategy
    #[arg(long, value_enum, default_value_t = SortStrategy::Std)]
    sorter: SortStrategy,

    /// Print the distributed blocks and the sorted result
    #[arg(long)]
    print: bool,

    /// Skip the comparison against a single-process sort
    #[arg(long)]
    no_verify: bool,

    /// Print performance stats to stderr
    #[arg(long)]
    stats: bool,

    /// Write the sorted sequence as CSV to this file
    #[arg(long)]
    output: Option<String>,

    /// Run across MPI processes (launch with mpirun)
    #[cfg(feature = "distributed")]
    #[arg(long)]
    mpi: bool,
}

/// Ask for the data size until it is at least `min`.
fn prompt_data_size(min: usize) -> io::Result<usize> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter the size of data to be sorted: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no data size entered"));
        };
        match line?.trim().parse::<usize>() {
            Ok(n) if n >= min => return Ok(n),
            Ok(_) => println!("Data size should be greater than number of processes"),
            Err(_) => println!("Data size must be a non-negative integer"),
        }
    }
}

fn report_result(cli: &Cli, report: &RunReport, stats: Option<&Stats>) {
    if cli.print {
        let mut stdout = io::stdout();
        output::write_titled_sequence("Result:", &report.sorted, &mut stdout).unwrap_or_else(|e| {
            eprintln!("Output error: {}", e);
            std::process::exit(1);
        });
    }

    if let Some(path) = &cli.output {
        let write = std::fs::File::create(path)
            .map_err(Into::into)
            .and_then(|mut file| output::write_sequence_csv(&report.sorted, &mut file));
        write.unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", path, e);
            std::process::exit(1);
        });
    }

    if let Some(stats) = stats {
        stats.display();
    }

    match report.verified {
        Some(true) => println!("The data set is sorted correctly"),
        Some(false) => {
            println!("The data set is not sorted correctly");
            std::process::exit(2);
        }
        None => {}
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "distributed")]
    let universe = if cli.mpi {
        Some(mpi::initialize().unwrap_or_else(|| {
            eprintln!("MPI initialization failed");
            std::process::exit(1);
        }))
    } else {
        None
    };

    #[cfg(feature = "distributed")]
    let (rank, num_ranks) = if universe.is_some() {
        use oddeven::comm::CommunicationBackend;
        let comm = oddeven::comm::comm_mpi::MpiComm::new();
        (comm.rank(), comm.num_ranks())
    } else {
        (driver::COORDINATOR, cli.ranks)
    };
    #[cfg(not(feature = "distributed"))]
    let (rank, num_ranks) = (driver::COORDINATOR, cli.ranks);

    // Only the coordinator's size matters; the others receive it by broadcast.
    let data_size = match cli.size {
        Some(n) => n,
        None if rank == driver::COORDINATOR => prompt_data_size(num_ranks).unwrap_or_else(|e| {
            eprintln!("Input error: {}", e);
            std::process::exit(1);
        }),
        None => 0,
    };
    if rank == driver::COORDINATOR {
        println!("Sorting {} data items on {} ranks", data_size, num_ranks);
    }

    let config = RunConfig {
        data_size,
        source: cli.data.with_seed(cli.seed),
        strategy: cli.sorter,
        verify: !cli.no_verify,
        print: cli.print,
    };
    let mut stats = if cli.stats && rank == driver::COORDINATOR {
        Some(Stats::new())
    } else {
        None
    };

    #[cfg(feature = "distributed")]
    if universe.is_some() {
        let comm = oddeven::comm::comm_mpi::MpiComm::new();
        let report = driver::run(&comm, &config, stats.as_mut()).unwrap_or_else(|e| {
            eprintln!("Sort error on rank {}: {}", rank, e);
            std::process::exit(1);
        });
        if let Some(report) = report {
            report_result(&cli, &report, stats.as_ref());
        }
        return;
    }

    let report = driver::simulate(num_ranks, &config, stats.as_mut()).unwrap_or_else(|e| {
        eprintln!("Sort error: {}", e);
        std::process::exit(1);
    });
    report_result(&cli, &report, stats.as_ref());
}
