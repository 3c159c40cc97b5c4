use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "endpoint-finder")]
#[command(about = "Discover web-API endpoints declared in compiled JVM artifacts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Scan {
        #[arg(value_name = "ROOT", required = true)]
        roots: Vec<PathBuf>,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, value_name = "PREFIX")]
        exclude: Vec<String>,

        #[arg(long, value_name = "SECS")]
        deadline: Option<u64>,

        #[arg(long)]
        compact: bool,
    },
}
