use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repo-updater", about = "Reconcile discovered repositories into the repo store")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overrides the configuration
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// External service kind to list (repeatable), overrides the configuration
    #[arg(long = "kind", global = true)]
    pub kinds: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upsert the repos in a JSON array file and print them as stored
    Upsert {
        /// File holding a JSON array of repos
        file: PathBuf,
    },
    /// List live repos that have sources, plus any named explicitly
    List {
        /// Names to include even without sources
        names: Vec<String>,
    },
}
