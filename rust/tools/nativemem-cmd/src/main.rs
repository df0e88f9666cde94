use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::{AllocArgs, OutputArgs};

#[derive(Parser)]
#[command(name = "nativemem-cmd")]
#[command(about = "Allocate native memory windows and display their layout")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate directly from the process heap
    Native {
        #[command(flatten)]
        alloc: AllocArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Allocate an aligned window inside an over-allocated array
    Pinned {
        #[command(flatten)]
        alloc: AllocArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Reuse an existing buffer if it is long enough, otherwise allocate
    Hybrid {
        /// Length of the existing buffer offered for reuse
        #[arg(long)]
        existing: usize,

        #[command(flatten)]
        alloc: AllocArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Native { alloc, output } => commands::native::run(alloc, output),
        Commands::Pinned { alloc, output } => commands::pinned::run(alloc, output),
        Commands::Hybrid {
            existing,
            alloc,
            output,
        } => commands::hybrid::run(existing, alloc, output),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
