use anyhow::{Context, Result};
use clap::Parser;

use filtersearch::app::{Cli, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let start = std::time::Instant::now();
    let written = run(&cli)?;

    tracing::info!(
        "Done! Written {} records in {:.2}s",
        written,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
