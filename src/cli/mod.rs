mod run;
mod show;

use crate::config::{Config, CredentialPaths, DEFAULT_CLIENT};
use crate::error::Result;
use crate::models::Feed;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "ads-sheet-etl")]
#[command(about = "Load Meta Ads and Google Ads rows from Google Sheets into SQL Server", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            None => run::execute(&self.credentials, None, &[]).await,
            Some(Commands::Run { as_of, feed }) => {
                run::execute(&self.credentials, *as_of, feed).await
            }
            Some(Commands::Show { resource }) => resource.execute(&self.credentials).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace the trailing week of each feed's table with the sheet contents
    Run {
        /// Treat this date as today when computing the window
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,

        /// Only process these feeds (default: all)
        #[arg(long, value_enum)]
        feed: Vec<Feed>,
    },
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Client whose credential file is loaded
    #[arg(long, global = true, default_value = DEFAULT_CLIENT)]
    pub client: String,

    /// Shared credential file
    #[arg(long, global = true, value_name = "PATH")]
    pub defaults: Option<PathBuf>,

    /// Client-specific credential file
    #[arg(long, global = true, value_name = "PATH")]
    pub client_credentials: Option<PathBuf>,
}

impl CredentialArgs {
    pub fn paths(&self) -> Result<CredentialPaths> {
        CredentialPaths::resolve(
            &self.client,
            self.defaults.clone(),
            self.client_credentials.clone(),
        )
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load(&self.paths()?, &self.client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults() {
        let cli = Cli::try_parse_from(["ads-sheet-etl"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.credentials.client, "muse");
        assert_eq!(cli.credentials.defaults, None);
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "ads-sheet-etl",
            "run",
            "--as-of",
            "2024-03-10",
            "--feed",
            "google-ads",
            "--client",
            "acme",
        ])
        .unwrap();

        assert_eq!(cli.credentials.client, "acme");
        match cli.command {
            Some(Commands::Run { as_of, feed }) => {
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 3, 10));
                assert_eq!(feed, vec![Feed::GoogleAds]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
