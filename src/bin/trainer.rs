use anyhow::Result;
use clap::Parser;
use pluribot::clustering::lookup::BlueprintLookup;
use pluribot::clustering::lookup::ClusterLookup;
use pluribot::gameplay::profile::Profile;
use pluribot::gameplay::rake::Rake;
use pluribot::mccfr::config::BlueprintConfig;
use pluribot::mccfr::config::BlueprintTimings;
use pluribot::mccfr::config::PokerConfig;
use pluribot::mccfr::config::SolverConfig;
use pluribot::mccfr::solver::TreeBlueprintSolver;
use std::path::PathBuf;
use std::sync::Arc;

/// train a blueprint strategy and emit periodic snapshots
#[derive(Parser)]
#[command(name = "trainer")]
struct Args {
    /// seats at the table
    #[arg(long, default_value_t = 2)]
    players: usize,
    /// starting stacks in chips
    #[arg(long, default_value_t = 10_000)]
    chips: i32,
    /// ante posted by every seat
    #[arg(long, default_value_t = 0)]
    ante: i32,
    /// total iterations to run
    #[arg(long, default_value_t = 1_000_000)]
    iterations: i64,
    /// measured iteration rate per minute, scales the schedule
    #[arg(long, default_value_t = 1_000_000)]
    rate: i64,
    /// rng seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// snapshot output directory
    #[arg(long, default_value = "snapshots")]
    snapshots: PathBuf,
    /// precomputed cluster tables; falls back to modulo buckets
    #[arg(long)]
    clusters: Option<PathBuf>,
}

fn main() -> Result<()> {
    pluribot::init();
    let args = Args::parse();
    log::info!("workers: {}", num_cpus::get());

    let poker = PokerConfig {
        n_players: args.players,
        n_chips: args.chips,
        ante: args.ante,
        straddle: false,
    };
    let profile = match args.players {
        2 => Profile::heads_up(args.chips),
        n => Profile::ring(n),
    };
    let config = SolverConfig::new(poker, Rake::none(), profile)?;
    let schedule = BlueprintConfig::from_timings(&BlueprintTimings::default(), args.rate);
    let lookup: Arc<dyn ClusterLookup> = match &args.clusters {
        Some(path) => Arc::new(BlueprintLookup::load(path)?),
        None => {
            log::warn!("no cluster tables given, using modulo buckets");
            Arc::new(BlueprintLookup::trivial())
        }
    };

    let solver = TreeBlueprintSolver::tree(config, schedule, lookup)?
        .with_seed(args.seed)
        .with_snapshot_dir(args.snapshots);

    let chunks = 100;
    let chunk = (args.iterations / chunks).max(1);
    let progress = pluribot::progress(args.iterations as usize);
    let mut remaining = args.iterations;
    while remaining > 0 {
        let step = chunk.min(remaining);
        solver.solve(step)?;
        progress.inc(step as u64);
        remaining -= step;
    }
    progress.finish();
    log::info!(
        "trained to t={}, {} regret nodes",
        solver.iteration(),
        solver.regrets().count_nodes()
    );
    Ok(())
}
