//! CLI argument parsing for digitsort

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, TransportKind};
use crate::order::SortOrder;

#[derive(Parser, Debug)]
#[command(name = "ds")]
#[command(author, version, about = "Distributed message-passing radix sort", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Shuffle 0..N, sort it with the reference and the distributed sort, verify and report
    Sort(SortArgs),

    /// Join a socket run as a worker rank (spawned by `ds sort --transport socket`)
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Default)]
pub struct SortArgs {
    /// Number of elements to sort (default: 100)
    pub size: Option<usize>,

    /// Ranks in the world, coordinator included
    #[arg(short, long)]
    pub world_size: Option<usize>,

    /// Transport between ranks
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Bucket reassembly order
    #[arg(long, value_enum)]
    pub order: Option<SortOrder>,

    /// Shuffle seed for a reproducible input
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the array files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Do not write array files
    #[arg(long)]
    pub no_files: bool,
}

impl SortArgs {
    /// Override config values with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(size) = self.size {
            config.sort.array_size = size;
        }
        if let Some(world_size) = self.world_size {
            config.sort.world_size = world_size;
        }
        if let Some(kind) = self.transport {
            config.transport.kind = kind;
        }
        if let Some(order) = self.order {
            config.sort.order = order;
        }
        if self.seed.is_some() {
            config.sort.seed = self.seed;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.no_files {
            config.output.write_files = false;
        }
    }
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Coordinator's socket
    #[arg(long)]
    pub socket: PathBuf,

    /// This worker's rank (1-based; rank 0 is the coordinator)
    #[arg(long)]
    pub rank: usize,

    /// Ranks in the world, coordinator included
    #[arg(long)]
    pub world_size: usize,

    /// Capacity of the inbound message queue
    #[arg(long, default_value = "1024")]
    pub channel_buffer: usize,
}
