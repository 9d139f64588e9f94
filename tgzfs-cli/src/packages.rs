//! Package discovery and registry.
//!
//! Finds `.tgz` archives in a directory, decodes each one, reads its
//! `package.json` for the name and version, and lays the files out under
//! `<modules_root>/<name>/`.

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tgzfs_core::archive::{self, ArchiveEntry};
use tgzfs_core::types::TgzfsConfig;
use tgzfs_core::file_map::normalize_key;
use tgzfs_core::FileMap;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: String,
    version: String,
}

/// One decoded archive.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub archive: PathBuf,
    pub entries: Vec<ArchiveEntry>,
}

/// Lists archives in `directory` whose extension is `extension`, sorted by path.
pub fn scan_for_archives(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let listing = std::fs::read_dir(directory)
        .with_context(|| format!("failed to read directory {}", directory.display()))?;

    for entry in listing {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            archives.push(path);
        }
    }

    archives.sort();
    debug!(directory = %directory.display(), count = archives.len(), "scanned for archives");
    Ok(archives)
}

/// Decodes one archive and reads its manifest.
pub async fn load_package(archive_path: &Path, package_prefix: &str) -> Result<Package> {
    let raw = tokio::fs::read(archive_path)
        .await
        .with_context(|| format!("failed to read {}", archive_path.display()))?;
    let entries = archive::decode_in_background(Bytes::from(raw))
        .await
        .with_context(|| format!("failed to decode {}", archive_path.display()))?;

    let manifest_path = format!("{}package.json", package_prefix);
    let manifest_key = normalize_key(Path::new(&manifest_path));
    // Last occurrence wins, same as in the file map.
    let manifest = entries
        .iter()
        .rev()
        .find(|entry| normalize_key(Path::new(&entry.path)) == manifest_key)
        .ok_or_else(|| anyhow!("no {} found in {}", manifest_path, archive_path.display()))?;
    let manifest: PackageManifest = serde_json::from_slice(&manifest.content)
        .with_context(|| format!("invalid {} in {}", manifest_path, archive_path.display()))?;

    Ok(Package {
        name: manifest.name,
        version: manifest.version,
        archive: archive_path.to_path_buf(),
        entries,
    })
}

/// Packages by name.
#[derive(Debug, Default)]
pub struct Registry {
    packages: BTreeMap<String, Package>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every archive in `directory` concurrently.
    ///
    /// Two archives declaring the same name: the one whose path sorts last
    /// wins.
    pub async fn load_directory(directory: &Path, config: &TgzfsConfig) -> Result<Self> {
        let archives = scan_for_archives(directory, &config.archive_extension)?;

        let mut tasks = JoinSet::new();
        for (index, path) in archives.into_iter().enumerate() {
            let prefix = config.package_prefix.clone();
            tasks.spawn(async move { (index, load_package(&path, &prefix).await) });
        }

        let mut loaded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, package) = joined.context("package loader task failed")?;
            loaded.push((index, package?));
        }
        loaded.sort_by_key(|(index, _)| *index);

        let mut registry = Self::new();
        for (_, package) in loaded {
            registry.insert(package);
        }
        info!(packages = registry.len(), "registry loaded");
        Ok(registry)
    }

    pub fn insert(&mut self, package: Package) {
        if let Some(previous) = self.packages.get(&package.name) {
            warn!(
                name = %package.name,
                previous = %previous.archive.display(),
                replacement = %package.archive.display(),
                "duplicate package name, keeping the later archive"
            );
        }
        self.packages.insert(package.name.clone(), package);
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Places every package's files under `<modules_root>/<name>/`.
    pub fn file_map(&self, modules_root: &Path, package_prefix: &str) -> FileMap {
        let mut files = FileMap::new();
        for package in self.packages() {
            let root = modules_root.join(&package.name);
            files.insert_entries_under(
                &root.to_string_lossy(),
                package_prefix,
                package.entries.iter().cloned(),
            );
        }
        files
    }
}
