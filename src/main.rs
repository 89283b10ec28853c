use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use gitdash::cache::{CacheService, SystemClock};
use gitdash::config::{Config, ProviderKind};
use gitdash::controller::Dispatcher;
use gitdash::provider::SnapshotApi;
use gitdash::report::render_outcome;
use gitdash::view::View;

#[derive(Parser, Debug)]
#[command(name = "gitdash")]
#[command(about = "A dashboard of GitHub and GitLab work items and build statuses")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/gitdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// View to display
  #[arg(short, long, value_enum, default_value_t = View::Assigned)]
  view: View,

  /// Repeat the dispatch every status cache update interval until Ctrl-C
  #[arg(short, long)]
  watch: bool,

  /// Write logs to this file instead of stderr
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Root of the provider snapshots (overrides snapshot_dir)
  #[arg(long)]
  snapshots: Option<PathBuf>,
}

/// Log filter from RUST_LOG, `info` by default. The guard must be kept alive
/// while logging to a file.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let Some(path) = log_file else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .try_init()
      .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
    return Ok(None);
  };

  let name = path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file: {}", path.display()))?;
  let dir = path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
  Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging(args.log_file.as_deref())?;

  let config = Arc::new(Config::load(args.config.as_deref())?);
  let snapshots = args
    .snapshots
    .clone()
    .or_else(|| config.snapshot_dir.clone())
    .unwrap_or_else(|| PathBuf::from("snapshots"));
  info!(
    providers = config.providers.len(),
    snapshots = %snapshots.display(),
    "Starting"
  );

  let cache = CacheService::new(
    Arc::new(SystemClock),
    config.cache_intervals(),
    config.provider_ids(),
  );
  let api = Arc::new(SnapshotApi::new(snapshots));
  let dispatcher = Dispatcher::new(config.clone(), cache)
    .with_api(ProviderKind::GitHub, api.clone())
    .with_api(ProviderKind::GitLab, api);

  if !args.watch {
    let outcome = dispatcher.dispatch(args.view).await;
    print!("{}", render_outcome(&outcome));
    return Ok(());
  }

  let mut ticker = tokio::time::interval(Duration::from_secs(config.status_cache_update_time));
  loop {
    tokio::select! {
      _ = ticker.tick() => {
        let outcome = dispatcher.dispatch(args.view).await;
        print!("{}", render_outcome(&outcome));
      }
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted");
        break;
      }
    }
  }
  Ok(())
}
