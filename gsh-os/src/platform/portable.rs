//! Platform built entirely on `std::fs`, used where we don't talk to the OS directly.
//!
//! It's always compiled so it stays tested, even on platforms that use a native implementation.

use std::ffi::OsStr;
use std::fs::{File, Metadata, ReadDir};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::platform::{OpenOptions, Platform, PlatformPath};
use crate::{Details, DirectoryEntry, EntryName, FileAttributes, Permissions, PriorityClass};

/// Open file limit of the Windows C runtime, a conservative guess everywhere else.
const DEFAULT_FILE_HANDLE_MAX: usize = 512;

pub struct PortablePlatform;

/// Directory being listed by the [`PortablePlatform`].
#[derive(Debug)]
pub struct PortableDirStream {
    /// Directory we're listing, entries are queried relative to it.
    root: PathBuf,
    inner: Option<ReadDir>,
}

impl Platform for PortablePlatform {
    type Path = PathBuf;

    type Handle = Arc<File>;
    type DirStream = PortableDirStream;

    fn open(path: Self::Path, options: OpenOptions) -> Result<Self::Handle, crate::Error> {
        let mut open_options = std::fs::OpenOptions::new();
        open_options
            .read(options.intersects(OpenOptions::READ_ONLY | OpenOptions::READ_WRITE))
            .write(options.intersects(OpenOptions::WRITE_ONLY | OpenOptions::READ_WRITE))
            .append(options.contains(OpenOptions::APPEND))
            .truncate(options.contains(OpenOptions::TRUNCATE));
        if options.contains(OpenOptions::EXCLUSIVE) {
            open_options.create_new(true);
        } else {
            open_options.create(options.contains(OpenOptions::CREATE));
        }

        if options.contains(OpenOptions::DIRECTORY) && !path.is_dir() {
            return Err(missing_or(&path, crate::Error::NotADirectory));
        }

        let file = open_options.open(path)?;
        Ok(Arc::new(file))
    }

    fn close(handle: Self::Handle) -> Result<(), crate::Error> {
        drop(handle);
        Ok(())
    }

    fn read(handle: &Self::Handle, buf: &mut [u8]) -> Result<usize, crate::Error> {
        let read = (&**handle).read(buf)?;
        Ok(read)
    }

    fn write(handle: &Self::Handle, data: &[u8]) -> Result<usize, crate::Error> {
        let written = (&**handle).write(data)?;
        Ok(written)
    }

    fn fsync(handle: &Self::Handle) -> Result<(), crate::Error> {
        handle.sync_all()?;
        Ok(())
    }

    fn attributes(path: Self::Path) -> Result<FileAttributes, crate::Error> {
        attributes(&path)
    }

    fn opendir(path: Self::Path) -> Result<Self::DirStream, crate::Error> {
        if !path.is_dir() {
            return Err(missing_or(&path, crate::Error::NotADirectory));
        }
        let inner = std::fs::read_dir(&path)?;
        Ok(PortableDirStream {
            root: path,
            inner: Some(inner),
        })
    }

    fn readdir(stream: &mut Self::DirStream) -> Result<Option<DirectoryEntry>, crate::Error> {
        let inner = stream.inner.as_mut().ok_or(crate::Error::Closed)?;
        let Some(entry) = inner.next() else {
            return Ok(None);
        };
        let entry = entry?;

        let raw_name = entry.file_name();
        let name = entry_name(&raw_name)?;

        let path = stream.root.join(raw_name);
        let attributes = match attributes(&path) {
            Ok(attributes) => attributes,
            Err(err) => {
                tracing::debug!(%name, %err, "failed to query entry attributes");
                FileAttributes::failed(err.code())
            }
        };

        Ok(Some(DirectoryEntry::new(name, attributes)))
    }

    fn closedir(mut stream: Self::DirStream) -> Result<(), crate::Error> {
        stream.inner.take().ok_or(crate::Error::Closed)?;
        Ok(())
    }

    fn set_priority(_pid: u32, class: PriorityClass) -> Result<(), crate::Error> {
        match class {
            PriorityClass::Inherit => Ok(()),
            _ => Err(crate::Error::Unsupported("setting process priority")),
        }
    }

    fn file_handle_max() -> Result<usize, crate::Error> {
        Ok(DEFAULT_FILE_HANDLE_MAX)
    }
}

impl PlatformPath for PathBuf {
    fn try_new(val: String) -> Result<Self, crate::Error> {
        if val.is_empty() {
            return Err(crate::Error::NotFound);
        }
        Ok(PathBuf::from(val))
    }
}

#[cfg(unix)]
fn entry_name(raw: &OsStr) -> Result<EntryName, crate::NameError> {
    use std::os::unix::ffi::OsStrExt;
    EntryName::from_bytes(raw.as_bytes())
}

#[cfg(not(unix))]
fn entry_name(raw: &OsStr) -> Result<EntryName, crate::NameError> {
    match raw.to_str() {
        Some(name) => EntryName::new(name),
        None => Err(crate::NameError::InvalidUtf8),
    }
}

/// [`crate::Error::NotFound`] if nothing exists at `path`, otherwise `err`.
fn missing_or(path: &Path, err: crate::Error) -> crate::Error {
    match std::fs::symlink_metadata(path) {
        Ok(_) => err,
        Err(io_err) => io_err.into(),
    }
}

fn attributes(path: &Path) -> Result<FileAttributes, crate::Error> {
    let link = match std::fs::symlink_metadata(path) {
        Ok(link) => link,
        Err(err) => match crate::Error::from(err) {
            crate::Error::NotFound | crate::Error::NotADirectory => {
                return Ok(FileAttributes::Missing)
            }
            err => return Err(err),
        },
    };

    let symbolic_link = link.file_type().is_symlink();
    let target = if symbolic_link {
        match std::fs::metadata(path) {
            Ok(target) => Some(target),
            Err(err) => match crate::Error::from(err) {
                // Dangling or looping links still exist, they just don't resolve.
                crate::Error::NotFound | crate::Error::NotADirectory => None,
                #[cfg(unix)]
                crate::Error::Os(libc::ELOOP) => None,
                err => return Err(err),
            },
        }
    } else {
        Some(link.clone())
    };

    let permissions = match &target {
        Some(target) => permissions(path, target),
        None => Permissions::empty(),
    };
    let resolved = target.as_ref().unwrap_or(&link);

    Ok(FileAttributes::Present(Details {
        permissions,
        symbolic_link,
        regular: target.as_ref().is_some_and(Metadata::is_file),
        directory: target.as_ref().is_some_and(Metadata::is_dir),
        stamp: resolved.modified().map(unix_seconds).unwrap_or_default(),
        length: i64::try_from(resolved.len()).unwrap_or(i64::MAX),
    }))
}

/// Access we have to the entry at `path`, found by trying to open it.
///
/// Only regular files and directories are opened, anything else could block on open so its
/// permission bits are used instead.
fn permissions(path: &Path, metadata: &Metadata) -> Permissions {
    let (readable, writable) = if metadata.is_file() {
        (
            File::open(path).is_ok(),
            std::fs::OpenOptions::new().write(true).open(path).is_ok(),
        )
    } else if metadata.is_dir() {
        (
            std::fs::read_dir(path).is_ok(),
            !metadata.permissions().readonly(),
        )
    } else {
        (true, !metadata.permissions().readonly())
    };

    let mut permissions = Permissions::empty();
    permissions.set(Permissions::READABLE, readable);
    permissions.set(Permissions::WRITABLE, writable);
    permissions.set(Permissions::EXECUTABLE, executable(path, metadata));
    permissions
}

#[cfg(unix)]
fn executable(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn executable(path: &Path, metadata: &Metadata) -> bool {
    static EXTENSIONS: &[&str] = &["exe", "com", "bat", "cmd"];

    metadata.is_dir()
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |secs| -secs),
    }
}
