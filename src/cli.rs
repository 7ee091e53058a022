use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, ValueEnum, Clone, PartialEq, Eq)]
pub enum Action {
    /// Install the queue rule and rewrite matching responses
    Start,
    /// Remove the nftables table
    Stop,
}

#[derive(Parser, Debug)]
#[command(version, about = "Rewrites queued HTTP responses for registered flows", long_about = None)]
pub struct Cli {
    #[arg(short, long)]
    pub action: Action,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long, default_value = "./config/flowpatch.toml")]
    pub config: PathBuf,
}
