//! Install/restore of an overlay into the process-wide primitive table.
//!
//! # State machine
//!
//! ```text
//! Inactive --enable()--> Active --disable()--> Inactive
//! ```
//!
//! - `enable()` snapshots the installed [`Primitives`], installs a
//!   [`VirtualOverlay`] that delegates to that snapshot, and claims the
//!   process-wide session slot.
//! - `disable()` reinstalls exactly the snapshot and releases the slot. It is
//!   a no-op on an inactive session.
//! - A second `enable()` on an active session, or any `enable()` while another
//!   session holds the slot, fails with [`SessionStateError`] and leaves the
//!   table and the stored snapshot untouched.
//! - Dropping an active session disables it.
//!
//! The table is shared by the whole process: while a session is active, every
//! caller of [`crate::primitives`] sees the overlay, not just the session's
//! owner.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SessionStateError};
use crate::file_map::FileMap;
use crate::overlay::VirtualOverlay;
use crate::primitives::{self, Primitives};

/// Set while some session owns the primitive table.
static SESSION_SLOT: AtomicBool = AtomicBool::new(false);

#[derive(Debug)]
enum SessionState {
    Inactive,
    Active {
        /// Primitives installed immediately before `enable()`
        originals: Primitives,
    },
}

/// Governs interception of the primitive table for one path prefix.
#[derive(Debug)]
pub struct InterceptionSession {
    id: Uuid,
    main_directory: PathBuf,
    files: Arc<FileMap>,
    state: SessionState,
}

impl InterceptionSession {
    /// Creates an inactive session.
    ///
    /// # Arguments
    /// * `main_directory` - Prefix to intercept
    /// * `files` - File contents to serve; shared, not copied
    pub fn new(main_directory: impl Into<PathBuf>, files: Arc<FileMap>) -> Self {
        Self {
            id: Uuid::new_v4(),
            main_directory: main_directory.into(),
            files,
            state: SessionState::Inactive,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn main_directory(&self) -> &Path {
        &self.main_directory
    }

    pub fn files(&self) -> &Arc<FileMap> {
        &self.files
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// True iff `path` lies at or below `main_directory`.
    pub fn might_intercept(&self, path: &Path) -> bool {
        let normalized: PathBuf = self.main_directory.components().collect();
        path.starts_with(normalized)
    }

    /// Installs the overlay into the process-wide primitive table.
    pub fn enable(&mut self) -> Result<()> {
        if self.is_active() {
            warn!(session = %self.id, "enable() on an already active session rejected");
            return Err(SessionStateError::AlreadyActive {
                main_directory: self.main_directory.display().to_string(),
            }
            .into());
        }

        if SESSION_SLOT
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(session = %self.id, "enable() rejected, another session is active");
            return Err(SessionStateError::AnotherSessionActive.into());
        }

        let originals = primitives::installed();
        let overlay = VirtualOverlay::new(&self.main_directory, self.files.clone(), originals.clone());
        let displaced = primitives::swap(Primitives::from_provider(Arc::new(overlay)));
        debug_assert!(displaced.ptr_eq(&originals));

        info!(
            session = %self.id,
            main_directory = %self.main_directory.display(),
            files = self.files.len(),
            "interception enabled"
        );
        self.state = SessionState::Active { originals };
        Ok(())
    }

    /// Restores the primitives captured by the last successful `enable()`.
    ///
    /// Safe to call on an inactive session.
    pub fn disable(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Inactive) {
            SessionState::Inactive => {
                debug!(session = %self.id, "disable() on inactive session ignored");
            }
            SessionState::Active { originals } => {
                primitives::swap(originals);
                SESSION_SLOT.store(false, Ordering::Release);
                info!(session = %self.id, "interception disabled");
            }
        }
    }

    /// Enables the session for the lifetime of the returned guard.
    ///
    /// The guard disables the session when dropped, including during unwinding.
    pub fn enable_scoped(&mut self) -> Result<SessionGuard<'_>> {
        self.enable()?;
        Ok(SessionGuard { session: self })
    }
}

impl Drop for InterceptionSession {
    fn drop(&mut self) {
        if self.is_active() {
            self.disable();
        }
    }
}

/// Keeps a session enabled until dropped.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    session: &'a mut InterceptionSession,
}

impl SessionGuard<'_> {
    pub fn session(&self) -> &InterceptionSession {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TgzfsError;
    use crate::primitives::test_lock;
    use crate::types::Bytes;
    use std::io;

    fn files() -> Arc<FileMap> {
        let mut files = FileMap::new();
        files.insert("/v/a/b.txt", &b"hi"[..]);
        Arc::new(files)
    }

    #[test]
    fn test_enable_disable_restores_identical_primitives() {
        let _guard = test_lock();
        let before = primitives::installed();

        let mut session = InterceptionSession::new("/v", files());
        assert!(!session.is_active());
        session.enable().unwrap();
        assert!(session.is_active());
        assert!(!primitives::installed().ptr_eq(&before));

        session.disable();
        assert!(!session.is_active());
        assert!(primitives::installed().ptr_eq(&before));

        // second disable is a no-op
        session.disable();
        assert!(primitives::installed().ptr_eq(&before));
    }

    #[test]
    fn test_enabled_session_serves_through_free_functions() {
        let _guard = test_lock();
        let mut session = InterceptionSession::new("/v", files());
        session.enable().unwrap();

        assert_eq!(primitives::read_file("/v/a/b.txt").unwrap(), Bytes::from_static(b"hi"));
        assert_eq!(primitives::read_dir("/v/a").unwrap(), vec!["b.txt".to_string()]);
        assert!(primitives::stat("/v/a").unwrap().is_dir());
        let err = primitives::read_file("/v/a/missing.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        session.disable();
        // with the overlay gone the virtual path no longer exists
        let err = primitives::read_file("/v/a/b.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_double_enable_is_rejected_and_keeps_originals() {
        let _guard = test_lock();
        let before = primitives::installed();

        let mut session = InterceptionSession::new("/v", files());
        session.enable().unwrap();
        let during = primitives::installed();

        let err = session.enable().unwrap_err();
        assert!(matches!(
            err,
            TgzfsError::SessionState(SessionStateError::AlreadyActive { .. })
        ));
        assert!(session.is_active());
        assert!(primitives::installed().ptr_eq(&during));

        session.disable();
        assert!(primitives::installed().ptr_eq(&before));
    }

    #[test]
    fn test_second_session_is_rejected_while_one_is_active() {
        let _guard = test_lock();
        let before = primitives::installed();

        let mut first = InterceptionSession::new("/v", files());
        let mut second = InterceptionSession::new("/w", files());
        first.enable().unwrap();
        let during = primitives::installed();

        let err = second.enable().unwrap_err();
        assert!(matches!(
            err,
            TgzfsError::SessionState(SessionStateError::AnotherSessionActive)
        ));
        assert!(!second.is_active());
        assert!(primitives::installed().ptr_eq(&during));

        // disabling the rejected session must not touch the table
        second.disable();
        assert!(primitives::installed().ptr_eq(&during));

        first.disable();
        second.enable().unwrap();
        second.disable();
        assert!(primitives::installed().ptr_eq(&before));
    }

    #[test]
    fn test_reenable_after_disable() {
        let _guard = test_lock();
        let before = primitives::installed();
        let mut session = InterceptionSession::new("/v", files());

        for _ in 0..3 {
            session.enable().unwrap();
            assert!(primitives::stat("/v/a/b.txt").unwrap().is_file());
            session.disable();
            assert!(primitives::installed().ptr_eq(&before));
        }
    }

    #[test]
    fn test_scoped_guard_disables_on_drop() {
        let _guard = test_lock();
        let before = primitives::installed();
        let mut session = InterceptionSession::new("/v", files());

        {
            let scoped = session.enable_scoped().unwrap();
            assert!(scoped.session().is_active());
            assert!(!primitives::installed().ptr_eq(&before));
        }

        assert!(!session.is_active());
        assert!(primitives::installed().ptr_eq(&before));
    }

    #[test]
    fn test_scoped_guard_disables_on_panic() {
        let _guard = test_lock();
        let before = primitives::installed();
        let mut session = InterceptionSession::new("/v", files());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scoped = session.enable_scoped().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(primitives::installed().ptr_eq(&before));
    }

    #[test]
    fn test_dropping_active_session_restores() {
        let _guard = test_lock();
        let before = primitives::installed();
        {
            let mut session = InterceptionSession::new("/v", files());
            session.enable().unwrap();
        }
        assert!(primitives::installed().ptr_eq(&before));

        // the slot was released too
        let mut next = InterceptionSession::new("/v", files());
        next.enable().unwrap();
        next.disable();
    }

    #[test]
    fn test_might_intercept() {
        let session = InterceptionSession::new("/v/", files());
        assert!(session.might_intercept(Path::new("/v/a")));
        assert!(!session.might_intercept(Path::new("/w/a")));
    }

    #[tokio::test]
    async fn test_async_free_functions_while_active() {
        let _guard = test_lock();
        let mut session = InterceptionSession::new("/v", files());
        let scoped = session.enable_scoped().unwrap();

        assert_eq!(
            primitives::read_file_async("/v/a/b.txt").await.unwrap(),
            Bytes::from_static(b"hi")
        );
        assert_eq!(primitives::stat_async("/v/a/b.txt").await.unwrap().size, 2);
        assert_eq!(primitives::read_dir_async("/v").await.unwrap(), vec!["a".to_string()]);
        drop(scoped);
    }
}
