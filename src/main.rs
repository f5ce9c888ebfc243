use anyhow::Result;
use clap::Parser;
use rangefetch::{Args, ConsoleReporter, Reporter, Settings, logging};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let settings = Settings::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring settings file: {e:#}");
        Settings::default()
    });

    let reporter: Arc<dyn Reporter> = if args.quiet {
        Arc::new(ConsoleReporter::hidden())
    } else {
        Arc::new(ConsoleReporter::new())
    };
    let config = args.into_config(&settings);

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl+C, stopping download...");
            signal_token.cancel();
        }
    });

    rangefetch::run(&config, reporter, cancel_token).await?;

    Ok(())
}
