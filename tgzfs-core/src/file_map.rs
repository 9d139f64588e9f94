//! In-memory storage for virtual file contents.
//!
//! A flat map from absolute path string to content. Directories are never
//! stored; the overlay infers them from key prefixes. Iteration follows
//! insertion order, so listings built from the map are deterministic.
//!
//! Keys are normalized on the way in and on lookup with [`normalize_key`], so
//! `/v/./a//b.txt` and `/v/a/b.txt` name the same file.

use crate::archive::ArchiveEntry;
use bytes::Bytes;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Normalized string form of a path.
///
/// `.` components, repeated separators and trailing separators are dropped
/// and separators become forward slashes. `..` is kept as is.
pub fn normalize_key(path: &Path) -> String {
    // components() keeps a leading `.`, so it is filtered here too.
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let key = normalized.to_string_lossy().into_owned();
    if cfg!(windows) {
        key.replace('\\', "/")
    } else {
        key
    }
}

/// Storage form of a key. A trailing separator survives so that directory
/// headers from an archive stay distinguishable from files.
fn storage_key(path: &str) -> String {
    let key = normalize_key(Path::new(path));
    let is_dir_marker = path.ends_with('/') || (cfg!(windows) && path.ends_with('\\'));
    if is_dir_marker && !key.is_empty() && !key.ends_with('/') {
        format!("{}/", key)
    } else {
        key
    }
}

/// Path-keyed store of file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMap {
    entries: IndexMap<String, Bytes>,
}

impl FileMap {
    /// Creates an empty FileMap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects archive entries keyed by their archive path.
    ///
    /// When a path repeats, the last occurrence's content wins and the key
    /// keeps the position of its first occurrence.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ArchiveEntry>,
    {
        let mut map = Self::new();
        for entry in entries {
            map.insert(entry.path, entry.content);
        }
        map
    }

    /// Inserts or replaces a file. `path` is normalized first.
    ///
    /// # Arguments
    /// * `path` - Absolute key for the file
    /// * `content` - File content
    ///
    /// # Returns
    /// The content that was replaced, if the path already existed
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Option<Bytes> {
        let path: String = path.into();
        self.entries.insert(storage_key(&path), content.into())
    }

    /// Re-keys archive entries under `root` and inserts them.
    ///
    /// Each key becomes `root/<path>` with `strip_prefix` removed from the
    /// front of the archive path when present. Later duplicates overwrite
    /// earlier ones.
    ///
    /// # Arguments
    /// * `root` - Destination directory, e.g. `/app/node_modules/left-pad`
    /// * `strip_prefix` - Archive-internal prefix such as `package/`
    /// * `entries` - Decoded archive entries
    ///
    /// # Returns
    /// Number of entries inserted (duplicates included)
    pub fn insert_entries_under<I>(&mut self, root: &str, strip_prefix: &str, entries: I) -> usize
    where
        I: IntoIterator<Item = ArchiveEntry>,
    {
        let root = root.trim_end_matches('/');
        let mut count = 0;
        for entry in entries {
            let archive_path = storage_key(&entry.path);
            let relative = archive_path
                .strip_prefix(strip_prefix)
                .unwrap_or(&archive_path)
                .trim_start_matches('/');
            let key = format!("{}/{}", root, relative);
            if self.insert(key, entry.content).is_some() {
                debug!(path = %entry.path, "archive entry overwrote an earlier one");
            }
            count += 1;
        }
        count
    }

    /// Gets the content stored at `path`.
    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.entries.get(&normalize_key(Path::new(path)))
    }

    /// Checks if `path` is an exact key.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_key(Path::new(path)))
    }

    /// All keys in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All `(path, content)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Gets the number of files in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total content bytes held by the map.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(Bytes::len).sum()
    }
}

impl FromIterator<ArchiveEntry> for FileMap {
    fn from_iter<I: IntoIterator<Item = ArchiveEntry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut map = FileMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert("/v/a.txt", &b"hi"[..]), None);
        assert_eq!(map.get("/v/a.txt"), Some(&Bytes::from_static(b"hi")));
        assert!(map.contains("/v/a.txt"));
        assert!(!map.contains("/v"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.total_bytes(), 2);
    }

    #[test]
    fn test_last_duplicate_wins_first_position_kept() {
        let map = FileMap::from_entries(vec![
            ArchiveEntry::new("a", &b"1"[..]),
            ArchiveEntry::new("b", &b"2"[..]),
            ArchiveEntry::new("a", &b"3"[..]),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Bytes::from_static(b"3")));
        assert_eq!(map.paths().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_insert_entries_under_root() {
        let mut map = FileMap::new();
        let count = map.insert_entries_under(
            "/app/node_modules/demo/",
            "package/",
            vec![
                ArchiveEntry::new("package/package.json", &b"{}"[..]),
                ArchiveEntry::new("package/lib/index.js", &b"x"[..]),
                ArchiveEntry::new("README", &b"r"[..]),
            ],
        );
        assert_eq!(count, 3);
        assert_eq!(
            map.paths().collect::<Vec<_>>(),
            vec![
                "/app/node_modules/demo/package.json",
                "/app/node_modules/demo/lib/index.js",
                "/app/node_modules/demo/README",
            ]
        );
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(Path::new("/v/./a//b.txt")), "/v/a/b.txt");
        assert_eq!(normalize_key(Path::new("./package/index.js")), "package/index.js");
        assert_eq!(normalize_key(Path::new("/v/a/")), "/v/a");
        assert_eq!(normalize_key(Path::new("/v/../a")), "/v/../a");
    }

    #[test]
    fn test_keys_are_normalized_on_insert_and_lookup() {
        let mut map = FileMap::new();
        map.insert("/v//a/./b.txt", &b"hi"[..]);
        assert_eq!(map.paths().collect::<Vec<_>>(), vec!["/v/a/b.txt"]);
        assert_eq!(map.get("/v//a/./b.txt"), Some(&Bytes::from_static(b"hi")));
        assert!(map.contains("/v/a/b.txt"));

        // same file under another spelling replaces it
        assert!(map.insert("/v/a/b.txt", &b"new"[..]).is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_directory_marker_keeps_trailing_slash() {
        let mut map = FileMap::new();
        map.insert("/v/lib//", &b""[..]);
        assert_eq!(map.paths().collect::<Vec<_>>(), vec!["/v/lib/"]);
        assert!(!map.contains("/v/lib"));
    }

    #[test]
    fn test_insert_entries_under_strips_dot_prefixed_archive_paths() {
        let mut map = FileMap::new();
        map.insert_entries_under(
            "/v/demo",
            "package/",
            vec![
                ArchiveEntry::new("./package/index.js", &b"x"[..]),
                ArchiveEntry::new("package//lib/util.js", &b"u"[..]),
            ],
        );
        assert_eq!(
            map.paths().collect::<Vec<_>>(),
            vec!["/v/demo/index.js", "/v/demo/lib/util.js"]
        );
    }

    #[test]
    fn test_collect_from_iterator() {
        let map: FileMap = vec![ArchiveEntry::new("x", &b""[..])].into_iter().collect();
        assert!(map.contains("x"));
        assert_eq!(map.iter().count(), 1);
    }
}
