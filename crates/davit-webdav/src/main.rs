//! davit-webdav server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! configured storage backend, and serves WebDAV over HTTP.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use davit_store_fs::FsStore;
use davit_store_sqlite::SqliteStore;
use davit_webdav::{AppState, Backend, ServerConfig, lock::LockManager};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Davit WebDAV server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,

  /// Rebuild the SQLite metadata index from the storage root and exit.
  #[arg(long)]
  reindex: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("backend", "fs")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DAVIT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  match server_cfg.backend {
    Backend::Fs => {
      if cli.reindex {
        anyhow::bail!("--reindex requires backend = \"sqlite\"");
      }
      let store = FsStore::new(&server_cfg.storage_root);
      serve(store, server_cfg, &address).await
    }
    Backend::Sqlite => {
      let index_path = server_cfg
        .index_path
        .clone()
        .context("backend = \"sqlite\" requires index_path")?;
      let store = SqliteStore::open(&server_cfg.storage_root, &index_path)
        .await
        .with_context(|| format!("failed to open index at {index_path:?}"))?;

      if cli.reindex {
        let count = store.rebuild_index().await?;
        tracing::info!(resources = count, "index rebuilt");
        return Ok(());
      }
      serve(store, server_cfg, &address).await
    }
  }
}

async fn serve<S>(
  store: S,
  config: ServerConfig,
  address: &str,
) -> anyhow::Result<()>
where
  S: davit_core::store::ResourceStore + 'static,
{
  let locks = LockManager::new();
  locks.spawn_sweeper();

  let state = AppState {
    store: Arc::new(store),
    locks,
    config: Arc::new(config),
  };

  let app = davit_webdav::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
