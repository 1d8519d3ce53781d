mod api;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod mutation;
mod platform;
mod session;
mod ui;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tavern")]
#[command(about = "A terminal client for tabletop-RPG community platforms")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tavern/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Page size for list views
  #[arg(short, long)]
  page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override page size if specified on command line
  let config = if let Some(page_size) = args.page_size {
    config::Config { page_size, ..config }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config).await?;
  app.run().await?;

  Ok(())
}

/// Log to a daily file under the data dir; the terminal is in raw mode and
/// stderr output would corrupt the alternate screen.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("tavern").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::daily(&log_dir, "tavern.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tavern=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .init();

  Ok(guard)
}
