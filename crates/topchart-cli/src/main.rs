use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use topchart_core::Error;
use topchart_local::{export, renderer_for, scrape_chart, ScrapeConfig};
use tracing::error;

mod report;

#[derive(Parser, Debug)]
#[command(name = "topchart", version)]
#[command(
    about = "Scrape the IMDb Top 250 chart into a CSV file",
    long_about = "Scrape the IMDb Top 250 chart into a CSV file.\n\n\
        Behavior is configured through TOPCHART_* environment variables \
        (URL, output path, timeouts, snapshot input). RUST_LOG controls progress logging."
)]
struct Cli {}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _cli = Cli::parse();
    init_tracing();

    let cfg = ScrapeConfig::from_env().context("invalid TOPCHART_* configuration")?;
    report::banner(cfg.headless, &cfg.url);

    let started = Instant::now();
    let renderer = renderer_for(&cfg);
    let pass = match scrape_chart(renderer.as_ref(), &cfg).await {
        Ok(p) => p,
        Err(e) => {
            error!("scraping failed: {e}");
            println!("Scraping failed: {e}");
            return Err(e).context("scrape aborted");
        }
    };

    let summary = match export::write_csv(&pass.set, &cfg.output) {
        Ok(s) => s,
        Err(Error::EmptyResult) => {
            println!("No data was scraped!");
            anyhow::bail!("no records extracted from {}", cfg.url);
        }
        Err(e) => {
            println!("Scraping failed: {e}");
            return Err(e)
                .with_context(|| format!("writing {}", cfg.output.display()));
        }
    };

    report::saved(&summary, &pass.set);
    report::final_stats(&summary, started.elapsed());
    Ok(())
}
