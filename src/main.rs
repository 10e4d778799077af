use anyhow::Result;
use clap::Parser;
use quill_quest::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "quill_quest=debug" } else { "quill_quest=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(&cli) {
        eprintln!("error: {}", cli::error_message(&e));
        std::process::exit(1);
    }
    Ok(())
}
