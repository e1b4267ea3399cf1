// src/main.rs

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use vanguard_recon::app::App;
use vanguard_recon::config::ReconConfig;
use vanguard_recon::core::models::ScanRequest;
use vanguard_recon::logging::initialize_logging;

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    initialize_logging(args.verbose)?;

    let config = ReconConfig::load(args.config.as_deref())?;
    let app = App::from_config(config)?;

    let output = match args.command {
        Command::Scan { url } => {
            info!(%url, "Running single-page scan.");
            serde_json::to_string_pretty(&app.scan_page(&args.key, ScanRequest { url }).await?)?
        }
        Command::Crawl { url } => {
            info!(%url, "Running crawl.");
            serde_json::to_string_pretty(&app.crawl(&args.key, ScanRequest { url }).await?)?
        }
        Command::Subdomains { url } => {
            info!(%url, "Running subdomain discovery.");
            serde_json::to_string_pretty(&app.discover_subdomains(&args.key, ScanRequest { url }).await?)?
        }
    };

    println!("{output}");
    Ok(())
}
