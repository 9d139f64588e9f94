use std::time::SystemTime;

/// Represents the type of a file system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
}

/// Metadata returned by a `stat` call, real or synthetic.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    /// Type of file system entry
    pub file_type: FileType,
    /// Size in bytes
    pub size: u64,
    /// Last access time
    pub accessed: SystemTime,
    /// Last modification time
    pub modified: SystemTime,
    /// Last status change time
    pub changed: SystemTime,
    /// Creation time
    pub created: SystemTime,
}

impl FileMetadata {
    /// Creates a new FileMetadata instance.
    pub fn new(
        file_type: FileType,
        size: u64,
        accessed: SystemTime,
        modified: SystemTime,
        changed: SystemTime,
        created: SystemTime,
    ) -> Self {
        Self {
            file_type,
            size,
            accessed,
            modified,
            changed,
            created,
        }
    }

    /// Metadata for an in-memory file; every timestamp is `now`.
    pub fn synthetic_file(size: u64, now: SystemTime) -> Self {
        Self::new(FileType::File, size, now, now, now, now)
    }

    /// Metadata for an inferred directory; size 0, every timestamp is `now`.
    pub fn synthetic_directory(now: SystemTime) -> Self {
        Self::new(FileType::Directory, 0, now, now, now, now)
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}

impl From<std::fs::Metadata> for FileMetadata {
    fn from(meta: std::fs::Metadata) -> Self {
        let file_type = if meta.is_dir() {
            FileType::Directory
        } else if meta.file_type().is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let accessed = meta.accessed().unwrap_or(modified);
        // Not every filesystem records a birth time.
        let created = meta.created().unwrap_or(modified);

        #[cfg(unix)]
        let changed = {
            use std::os::unix::fs::MetadataExt;
            let secs = meta.ctime();
            let nanos = meta.ctime_nsec();
            if secs >= 0 {
                SystemTime::UNIX_EPOCH + std::time::Duration::new(secs as u64, nanos as u32)
            } else {
                modified
            }
        };
        #[cfg(not(unix))]
        let changed = modified;

        Self::new(file_type, meta.len(), accessed, modified, changed, created)
    }
}
