use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tgzfs_core::archive::{self, TarBuilder};
use tgzfs_core::{primitives, FileMap, InterceptionSession, SessionStateError, TgzfsError};

// Tests in this file share the process-wide primitive table.
fn serial() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spec_map() -> Arc<FileMap> {
    let mut files = FileMap::new();
    files.insert("/v/a/b.txt", &b"hi"[..]);
    files.insert("/v/a/c.txt", &b"see"[..]);
    Arc::new(files)
}

#[test]
fn read_stat_list_through_session() {
    let _serial = serial();
    let outside = tempfile::tempdir().unwrap();
    let real_file = outside.path().join("x");
    std::fs::write(&real_file, b"real").unwrap();

    let mut session = InterceptionSession::new("/v", spec_map());
    let _active = session.enable_scoped().unwrap();

    assert_eq!(primitives::read_file("/v/a/b.txt").unwrap(), Bytes::from_static(b"hi"));
    let err = primitives::read_file("/v/a/missing.txt").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert_eq!(primitives::read_file(&real_file).unwrap(), Bytes::from_static(b"real"));

    let file = primitives::stat("/v/a/b.txt").unwrap();
    assert!(file.is_file());
    assert_eq!(file.size, 2);
    assert!(primitives::stat("/v/a").unwrap().is_dir());
    assert_eq!(
        primitives::stat("/v/z").unwrap_err().kind(),
        io::ErrorKind::NotFound
    );

    let names: HashSet<String> = primitives::read_dir("/v/a").unwrap().into_iter().collect();
    assert_eq!(names, HashSet::from(["b.txt".to_string(), "c.txt".to_string()]));
    assert!(primitives::read_dir("/v/empty").unwrap().is_empty());
}

#[test]
fn virtual_and_real_absence_look_the_same() {
    let _serial = serial();
    let outside = tempfile::tempdir().unwrap();

    let mut session = InterceptionSession::new("/v", spec_map());
    let _active = session.enable_scoped().unwrap();

    let virtual_err = primitives::read_file("/v/nothing").unwrap_err();
    let real_err = primitives::read_file(outside.path().join("nothing")).unwrap_err();
    assert_eq!(virtual_err.kind(), real_err.kind());
}

#[test]
fn enable_disable_is_exact_and_idempotent() {
    let _serial = serial();
    let before = primitives::installed();

    let mut session = InterceptionSession::new("/v", spec_map());
    session.enable().unwrap();

    let during = primitives::installed();
    assert!(matches!(
        session.enable(),
        Err(TgzfsError::SessionState(SessionStateError::AlreadyActive { .. }))
    ));
    assert!(primitives::installed().ptr_eq(&during));

    session.disable();
    assert!(primitives::installed().ptr_eq(&before));
    session.disable();
    assert!(primitives::installed().ptr_eq(&before));
}

#[tokio::test]
async fn decoded_packages_are_served_async() {
    let _serial = serial();

    let mut builder = TarBuilder::new();
    builder
        .append("package/package.json", br#"{"name":"left-pad","version":"1.3.0"}"#)
        .unwrap()
        .append("package/index.js", b"module.exports = leftPad;")
        .unwrap()
        .append("package/lib/util.js", b"// util")
        .unwrap();
    let tgz = builder.finish_gzip().unwrap();

    let entries = archive::decode_in_background(Bytes::from(tgz)).await.unwrap();
    let mut files = FileMap::new();
    files.insert_entries_under("/srv/node_modules/left-pad", "package/", entries);

    let mut session = InterceptionSession::new("/srv/node_modules", Arc::new(files));
    let active = session.enable_scoped().unwrap();

    let manifest = primitives::read_file_async("/srv/node_modules/left-pad/package.json")
        .await
        .unwrap();
    assert!(manifest.starts_with(b"{\"name\":\"left-pad\""));

    let mut root: Vec<String> = primitives::read_dir_async("/srv/node_modules/left-pad")
        .await
        .unwrap();
    root.sort();
    assert_eq!(root, vec!["index.js", "lib", "package.json"]);

    assert!(primitives::stat_async(Path::new("/srv/node_modules/left-pad/lib"))
        .await
        .unwrap()
        .is_dir());
    assert!(primitives::stat_async("/srv/node_modules/right-pad")
        .await
        .is_err());

    drop(active);
    assert!(primitives::read_file("/srv/node_modules/left-pad/package.json").is_err());
}
