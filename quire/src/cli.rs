use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Quire: a live catalog of the markdown documents in a content directory.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file. Defaults to `quire.json` in the current directory, if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Content directory, overriding the configuration file.
    #[arg(long, global = true, env = "QUIRE_CONTENT")]
    pub content: Option<PathBuf>,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved directory configuration.
    Paths,
    /// Scan the content directory and print the article table.
    List(ListArgs),
    /// Show a single document.
    Show(ShowArgs),
    /// Scan, then print every change until interrupted.
    Watch,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the table as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Document identifier: the source path relative to the project base (e.g. `content/intro.md`).
    #[arg(required = true)]
    pub identifier: String,

    /// Include the content tree in the output.
    #[arg(long)]
    pub tree: bool,
}

impl Cli {
    /// The default log filter for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
