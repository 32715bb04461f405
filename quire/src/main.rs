use anyhow::{Context, Result};
use clap::Parser;
use quire::cli::{Cli, Commands};
use quire::config::Config;
use quire::{AppContext, commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level());

    let base = std::env::current_dir().context("Failed to determine the current directory")?;
    let config = Config::load(cli.config.as_deref(), &base)?.with_content(cli.content.clone());
    let cx = AppContext::new(&base, &config);

    match cli.command {
        Commands::Paths => commands::handle_paths(&cx)?,
        Commands::List(args) => commands::handle_list(&cx, args).await?,
        Commands::Show(args) => commands::handle_show(&cx, args).await?,
        Commands::Watch => commands::handle_watch(&cx).await?,
    }

    Ok(())
}

// RUST_LOG wins over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
