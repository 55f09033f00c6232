mod cli;
mod config;
mod credentials;
mod database;
mod error;
mod etl;
mod logging;
mod models;
mod sheets;

use clap::Parser;

use crate::cli::Cli;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        // Logging may not be set up yet if configuration failed to load
        logging::ensure_console();
        error!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
