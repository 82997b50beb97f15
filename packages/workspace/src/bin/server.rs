use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use storyloom_common::RealFileSystem;
use storyloom_workspace::{
    register_open_in_editor, serve, AppState, CommandLauncher, Config, FileWatcher, IndexCache,
    ServerChannel,
};
use tracing_subscriber::EnvFilter;

/// Storyloom index server - serves the story index and keeps it live
#[derive(Parser, Debug)]
#[command(name = "storyloom-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project root directory
    root: Option<PathBuf>,

    /// Config file (defaults to storyloom.config.json in the root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Build the index once and serve it without watching for changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    // Watch events carry canonical paths; the root must match them
    let root = root
        .canonicalize()
        .with_context(|| format!("project root {} not found", root.display()))?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(&root)?,
    };

    let generator = config
        .generator(&root, Arc::new(RealFileSystem))
        .context("nothing to index")?;
    let directories = generator.resolvable_directories();

    let channel = ServerChannel::new();
    let cache = Arc::new(IndexCache::new(Arc::new(generator)).with_channel(channel.clone()));
    let snapshot = cache.initialize().await?;
    for diagnostic in &snapshot.diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    register_open_in_editor(
        &channel,
        root.clone(),
        Arc::new(CommandLauncher::resolve(config.editor.as_deref())),
    );

    if !args.no_watch {
        let watcher = FileWatcher::new(&directories)?;
        let batches = watcher.into_debounced(config.debounce());
        tokio::spawn(cache.clone().watch(batches));
    }

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(root = %root.display(), %address, entries = snapshot.index.len(), "storyloom server ready");
    serve(listener, AppState { cache, channel }).await?;

    Ok(())
}
