mod packages;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tgzfs_core::types::{FileMetadata, LogLevel, TgzfsConfig};
use tgzfs_core::{archive, primitives, InterceptionSession};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packages::Registry;

#[derive(Parser)]
#[command(name = "tgzfs")]
#[command(about = "Serve the contents of .tgz packages through a virtual filesystem overlay")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the packages appear under (overrides `modules_root`)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every entry of an archive with its size and SHA-256
    List {
        archive: PathBuf,
    },

    /// Print the content of one archive entry
    Cat {
        archive: PathBuf,

        /// Path inside the archive, e.g. package/package.json
        path: String,
    },

    /// Load every package archive in a directory and print the registry
    Scan {
        dir: PathBuf,
    },

    /// Answer a filesystem query with the packages in DIR mounted under the root
    Query {
        dir: PathBuf,

        path: PathBuf,

        #[arg(long, value_enum, default_value_t = QueryOp::Stat)]
        op: QueryOp,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QueryOp {
    Read,
    List,
    Stat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let level = config.log_level.as_str();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tgzfs={},tgzfs_core={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::List { archive } => list_archive(&archive).await?,
        Commands::Cat { archive, path } => cat_entry(&archive, &path).await?,
        Commands::Scan { dir } => scan_directory(&dir, &config).await?,
        Commands::Query { dir, path, op } => query(&dir, &path, op, &config).await?,
    }

    Ok(())
}

/// Config file first, then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<TgzfsConfig> {
    let mut config = match &cli.config {
        Some(path) => TgzfsConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TgzfsConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.modules_root = root.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    if let Err(problems) = config.validate() {
        bail!("invalid configuration: {}", problems.join("; "));
    }

    if config.modules_root.is_relative() {
        config.modules_root = std::env::current_dir()?.join(&config.modules_root);
    }
    Ok(config)
}

async fn decode_file(path: &Path) -> Result<Vec<archive::ArchiveEntry>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    archive::decode_in_background(raw.into())
        .await
        .with_context(|| format!("failed to decode {}", path.display()))
}

async fn list_archive(path: &Path) -> Result<()> {
    let entries = decode_file(path).await?;
    for entry in &entries {
        println!(
            "{:>10}  {:x}  {}",
            entry.content.len(),
            Sha256::digest(&entry.content),
            entry.path
        );
    }
    info!(archive = %path.display(), entries = entries.len(), "listed archive");
    Ok(())
}

async fn cat_entry(path: &Path, entry_path: &str) -> Result<()> {
    let entries = decode_file(path).await?;
    let Some(entry) = entries.iter().rev().find(|entry| entry.path == entry_path) else {
        bail!("{} has no entry {}", path.display(), entry_path);
    };
    std::io::stdout().write_all(&entry.content)?;
    Ok(())
}

async fn scan_directory(dir: &Path, config: &TgzfsConfig) -> Result<()> {
    let registry = Registry::load_directory(dir, config).await?;
    if registry.is_empty() {
        println!("no packages found in {}", dir.display());
        return Ok(());
    }

    for package in registry.packages() {
        println!(
            "{}@{}  {} entries  {}",
            package.name,
            package.version,
            package.entries.len(),
            package.archive.display()
        );
    }
    Ok(())
}

async fn query(dir: &Path, path: &Path, op: QueryOp, config: &TgzfsConfig) -> Result<()> {
    let registry = Registry::load_directory(dir, config).await?;
    let files = registry.file_map(&config.modules_root, &config.package_prefix);
    info!(
        root = %config.modules_root.display(),
        files = files.len(),
        bytes = files.total_bytes(),
        "mounting packages"
    );

    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };
    let path = path.as_path();

    let mut session = InterceptionSession::new(&config.modules_root, Arc::new(files));
    let _active = session.enable_scoped()?;

    match op {
        QueryOp::Read => {
            let content = primitives::read_file_async(path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            std::io::stdout().write_all(&content)?;
        }
        QueryOp::List => {
            let names = primitives::read_dir_async(path)
                .await
                .with_context(|| format!("list {}", path.display()))?;
            for name in names {
                println!("{}", name);
            }
        }
        QueryOp::Stat => {
            let metadata = primitives::stat_async(path)
                .await
                .with_context(|| format!("stat {}", path.display()))?;
            print_metadata(path, &metadata);
        }
    }
    Ok(())
}

fn print_metadata(path: &Path, metadata: &FileMetadata) {
    let kind = if metadata.is_dir() {
        "directory"
    } else if metadata.is_symlink() {
        "symlink"
    } else {
        "file"
    };
    let modified: DateTime<Local> = metadata.modified.into();

    println!("path:     {}", path.display());
    println!("type:     {}", kind);
    println!("size:     {}", metadata.size);
    println!("modified: {}", modified.to_rfc3339());
}
