use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use louvain_community::loader::EdgeListGraph;
use louvain_community::logger::init_logger;
use louvain_community::{LevelStats, Louvain, LouvainConfig, Termination, VInt};

/// Detect communities in an undirected weighted edge list with Louvain.
#[derive(Debug, Parser)]
#[command(name = "louvain", version, about)]
struct Args {
    /// Edge list: `u v [weight]` per line, whitespace or comma separated.
    input: PathBuf,

    /// YAML file with a `LouvainConfig`; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_levels: Option<usize>,

    #[arg(long)]
    max_sweeps: Option<usize>,

    #[arg(short, long)]
    resolution: Option<f64>,

    /// Shuffle the sweep order with this seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker threads [default: number of CPUs].
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Write the result as JSON here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append log records to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct Assignment {
    vertex: u64,
    community: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    modularity: f64,
    community_count: usize,
    best_level: usize,
    termination: Termination,
    levels: &'a [LevelStats],
    partition: Vec<Assignment>,
}

fn build_config(args: &Args) -> Result<LouvainConfig> {
    let mut config = match &args.config {
        Some(path) => LouvainConfig::from_yaml_file(path)?,
        None => LouvainConfig::default(),
    };
    if let Some(max_levels) = args.max_levels {
        config.max_levels = max_levels;
    }
    if let Some(max_sweeps) = args.max_sweeps {
        config.max_sweeps_per_level = max_sweeps;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(seed) = args.seed {
        config.shuffle_seed = Some(seed);
    }
    config.threads = args.threads.or(config.threads).or_else(|| Some(num_cpus::get()));
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_file.as_deref())?;
    let config = build_config(&args)?;

    let start = Instant::now();
    let input = EdgeListGraph::from_file(&args.input)?;
    info!(
        "loaded {}: {} vertices, {} edges in {} ms",
        args.input.display(),
        input.vertex_count(),
        input.edges.len(),
        start.elapsed().as_millis()
    );

    let start = Instant::now();
    let result = Louvain::new(config)?.run(input.vertex_count(), &input.edges)?;
    info!("CD Time: {} ms.", start.elapsed().as_millis());

    let report = Report {
        modularity: result.modularity,
        community_count: result.community_count(),
        best_level: result.best_level,
        termination: result.termination,
        levels: &result.stats,
        partition: result
            .partition
            .iter()
            .enumerate()
            .map(|(vertex, &community)| Assignment {
                vertex: input.original_id(vertex as VInt),
                community,
            })
            .collect(),
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            println!(
                "{} communities, modularity {:.6}, written to {}",
                report.community_count,
                report.modularity,
                path.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &report)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
