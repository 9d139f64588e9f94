//! Pass-through to the host filesystem.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use crate::traits::{AsyncFileSystem, FileSystem};
use crate::types::{Bytes, FileMetadata};

/// The host filesystem: `std::fs` for blocking calls, `tokio::fs` for async.
///
/// Errors are returned exactly as the operating system reports them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read(&self, path: &Path) -> io::Result<Bytes> {
        std::fs::read(path).map(Bytes::from)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn stat(&self, path: &Path) -> io::Result<FileMetadata> {
        std::fs::metadata(path).map(FileMetadata::from)
    }
}

#[async_trait]
impl AsyncFileSystem for RealFs {
    async fn read_async(&self, path: &Path) -> io::Result<Bytes> {
        tokio::fs::read(path).await.map(Bytes::from)
    }

    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn stat_async(&self, path: &Path) -> io::Result<FileMetadata> {
        tokio::fs::metadata(path).await.map(FileMetadata::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"real").unwrap();

        let fs = RealFs::new();
        assert_eq!(fs.read(&dir.path().join("x.txt")).unwrap(), Bytes::from_static(b"real"));
        assert_eq!(fs.read_dir(dir.path()).unwrap(), vec!["x.txt".to_string()]);
        assert!(fs.stat(dir.path()).unwrap().is_dir());
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFs.read(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_async_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("y.txt"), b"async").unwrap();

        let fs = RealFs::new();
        let path = dir.path().join("y.txt");
        assert_eq!(fs.read_async(&path).await.unwrap(), Bytes::from_static(b"async"));
        assert_eq!(fs.stat_async(&path).await.unwrap().size, 5);
        assert_eq!(fs.read_dir_async(dir.path()).await.unwrap(), vec!["y.txt".to_string()]);
    }
}
