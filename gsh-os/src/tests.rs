use std::time::Duration;

use gsh_ore::assert_err;

use crate::config::{FilesystemConfig, PoolKind};
use crate::filesystem::Filesystem;
use crate::{Error, OpenMode};

fn filesystem(max_handles: usize) -> Filesystem {
    let config = FilesystemConfig {
        worker_threads: 2,
        max_handles: Some(max_handles),
        pool: PoolKind::Rayon,
    };
    Filesystem::new(&config).unwrap()
}

fn path_str(path: &std::path::Path) -> String {
    path.to_str().unwrap().to_string()
}

/// Wait for handles closed in the background to hand back their permits.
async fn wait_for_permits(filesystem: &Filesystem, expected: usize) {
    for _ in 0..200 {
        if filesystem.available_permits() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {expected} permits, have {}",
        filesystem.available_permits()
    );
}

#[tokio::test]
async fn smoketest_open_directory() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.txt"), b"hello").unwrap();
    std::fs::create_dir(temp.path().join("nested")).unwrap();

    let filesystem = filesystem(4);
    let mut handle = filesystem
        .open(path_str(temp.path()))
        .diagnostics("listing for test")
        .as_directory()
        .await
        .unwrap();
    assert_eq!(filesystem.available_permits(), 3);
    assert_eq!(handle.path(), temp.path().to_str().unwrap());

    let mut entries = handle.entries().await.unwrap();
    entries.sort_by(|a, b| a.name().cmp(b.name()));

    let names: Vec<_> = entries.iter().map(|entry| entry.name().to_string()).collect();
    assert_eq!(names, ["a.txt", "nested"]);

    let file = entries[0].attributes();
    assert!(file.exists());
    assert!(file.is_regular());
    assert_eq!(file.details().and_then(|details| details.size()), Some(5));
    assert!(entries[1].attributes().is_directory());

    // Everything has been listed.
    assert_eq!(handle.next_entry().await.unwrap(), None);

    handle.close().await.unwrap();
    assert_eq!(filesystem.available_permits(), 4);
}

#[tokio::test]
async fn smoketest_next_entry() {
    let temp = tempfile::TempDir::new().unwrap();
    for name in ["one", "two", "three"] {
        std::fs::write(temp.path().join(name), name).unwrap();
    }

    let filesystem = filesystem(4);
    let mut handle = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Some(entry) = handle.next_entry().await.unwrap() {
        names.push(entry.name().to_string());
    }
    names.sort();
    assert_eq!(names, ["one", "three", "two"]);

    // Stays exhausted.
    assert_eq!(handle.next_entry().await.unwrap(), None);
}

#[tokio::test]
async fn smoketest_dropped_handle_is_closed() {
    let temp = tempfile::TempDir::new().unwrap();
    let filesystem = filesystem(2);

    let first = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();
    let second = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();
    assert_eq!(filesystem.available_permits(), 0);
    assert_ne!(first.id(), second.id());

    drop(first);
    drop(second);
    wait_for_permits(&filesystem, 2).await;

    // Permits are usable again.
    let third = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();
    third.close().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn smoketest_entries_with_raw_names() {
    use std::os::unix::ffi::OsStrExt;

    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("good"), b"").unwrap();
    std::fs::write(temp.path().join(std::ffi::OsStr::from_bytes(b"bad\xff")), b"").unwrap();

    let filesystem = filesystem(4);
    let mut handle = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();

    let mut names: Vec<_> = handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.name().as_bytes().to_vec())
        .collect();
    names.sort();
    assert_eq!(names, [b"bad\xff".to_vec(), b"good".to_vec()]);

    assert!(handle.entries().await.unwrap().is_empty());
    handle.close().await.unwrap();
}

#[tokio::test]
async fn smoketest_open_directory_failures() {
    let temp = tempfile::TempDir::new().unwrap();
    let file = temp.path().join("file.txt");
    std::fs::write(&file, b"").unwrap();

    let filesystem = filesystem(4);
    assert_err!(
        filesystem.open_directory(path_str(&file)).await,
        Error::NotADirectory
    );
    assert_err!(
        filesystem
            .open_directory(path_str(&temp.path().join("missing")))
            .await,
        Error::NotFound
    );
    assert_err!(filesystem.open_directory("").await, Error::NotFound);

    // Failed opens don't hold on to a permit.
    assert_eq!(filesystem.available_permits(), 4);
}

#[tokio::test]
async fn smoketest_files() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = path_str(&temp.path().join("log.txt"));
    let filesystem = filesystem(4);

    let mut file = filesystem.open_file(&path, OpenMode::Write).await.unwrap();
    assert_eq!(file.mode(), OpenMode::Write);
    file.write_all(b"first\n".to_vec()).await.unwrap();
    file.fsync().await.unwrap();
    file.close().await.unwrap();

    let mut file = filesystem.open_file(&path, OpenMode::Append).await.unwrap();
    file.write_all(b"second\n".to_vec()).await.unwrap();
    file.close().await.unwrap();

    let mut file = filesystem.open_file(&path, OpenMode::Read).await.unwrap();
    let contents = file.read_to_end().await.unwrap();
    assert_eq!(contents, b"first\nsecond\n");
    file.close().await.unwrap();

    let attributes = filesystem.attributes(&path).await.unwrap();
    assert!(attributes.is_regular());
    assert_eq!(
        attributes.details().and_then(|details| details.size()),
        Some(13)
    );

    let missing = filesystem
        .attributes(path_str(&temp.path().join("missing")))
        .await
        .unwrap();
    assert!(!missing.exists());
    assert_eq!(missing.error(), 0);
    assert_eq!(filesystem.available_permits(), 4);
}

#[tokio::test]
async fn smoketest_read_missing_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let filesystem = filesystem(4);
    assert_err!(
        filesystem
            .open_file(path_str(&temp.path().join("nope")), OpenMode::Read)
            .await,
        Error::NotFound
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn smoketest_tokio_pool() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("only"), b"").unwrap();

    let config = FilesystemConfig {
        worker_threads: 1,
        max_handles: Some(8),
        pool: PoolKind::Tokio,
    };
    let filesystem = Filesystem::new(&config).unwrap();

    let mut handle = filesystem
        .open_directory(path_str(temp.path()))
        .await
        .unwrap();
    let entry = handle.next_entry().await.unwrap().unwrap();
    assert_eq!(entry.name().to_str(), Some("only"));

    drop(handle);
    wait_for_permits(&filesystem, 8).await;
}

#[test]
fn tokio_pool_requires_runtime() {
    let config = FilesystemConfig {
        pool: PoolKind::Tokio,
        ..Default::default()
    };
    assert_err!(Filesystem::new(&config), Error::InvalidConfig(_));
}

#[test]
fn errno_round_trip() {
    let codes = [
        libc::ENOENT,
        libc::EACCES,
        libc::EPERM,
        libc::ENOTDIR,
        libc::EISDIR,
        libc::EEXIST,
        libc::ESRCH,
        libc::ENAMETOOLONG,
        libc::EBADF,
        libc::EIO,
        libc::ENOSPC,
    ];
    for code in codes {
        assert_eq!(Error::from_errno(code).code(), code);
    }

    let name_error = Error::from(crate::NameError::TooLong { len: 600 });
    assert_eq!(name_error.code(), libc::ENAMETOOLONG);
    assert_eq!(Error::InvalidData("bad".into()).code(), libc::EINVAL);
}
