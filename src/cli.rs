// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vanguard-recon",
    version,
    about = "Passive web security scanning and subdomain reconnaissance"
)]
pub struct Args {
    /// JSON configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Caller key charged against the request quota
    #[arg(short, long, default_value = "cli")]
    pub key: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a single page
    Scan { url: String },
    /// Discover same-origin pages and scan each of them
    Crawl { url: String },
    /// Enumerate subdomains of the target's registrable domain
    Subdomains { url: String },
}
