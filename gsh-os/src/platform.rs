//! Abstract interface for a specific platform, e.g. `unix`, or anything `std` supports.

use bitflags::bitflags;
use std::fmt::Debug;

use crate::{DirectoryEntry, Error, FileAttributes, OpenMode, PriorityClass};

pub mod portable;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct OpenOptions: u32 {
        const READ_ONLY = 0b0000_0001;
        const WRITE_ONLY = 0b0000_0010;
        const READ_WRITE = 0b0000_0100;

        const APPEND = 0b0000_1000;
        const CREATE = 0b0001_0000;
        const EXCLUSIVE = 0b0010_0000;
        const TRUNCATE = 0b0100_0000;

        /// Restrict opening to just directories.
        const DIRECTORY = 0b1000_0000;
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions::READ_ONLY
    }
}

impl From<OpenMode> for OpenOptions {
    fn from(mode: OpenMode) -> Self {
        match mode {
            OpenMode::Read => OpenOptions::READ_ONLY,
            OpenMode::Write => OpenOptions::WRITE_ONLY | OpenOptions::CREATE | OpenOptions::TRUNCATE,
            OpenMode::Append => OpenOptions::WRITE_ONLY | OpenOptions::CREATE | OpenOptions::APPEND,
        }
    }
}

/// Platform specific filesystem and process operations.
///
/// Every method blocks, callers that care should run them on a worker, see
/// [`FilesystemWorker`](crate::filesystem::FilesystemWorker).
pub trait Platform {
    type Path: PlatformPath;

    /// An open file.
    type Handle: Debug + Clone + Send + 'static;
    /// A cursor over the entries of an open directory.
    ///
    /// Dropping a stream releases it, [`Platform::closedir`] does the same but reports errors.
    type DirStream: Debug + Send + 'static;

    fn open(path: Self::Path, options: OpenOptions) -> Result<Self::Handle, Error>;
    fn close(handle: Self::Handle) -> Result<(), Error>;

    fn read(handle: &Self::Handle, buf: &mut [u8]) -> Result<usize, Error>;
    fn write(handle: &Self::Handle, data: &[u8]) -> Result<usize, Error>;
    fn fsync(handle: &Self::Handle) -> Result<(), Error>;

    /// Query the attributes of the entry at `path`.
    ///
    /// A missing entry is not an error, it's reported as [`FileAttributes::Missing`].
    fn attributes(path: Self::Path) -> Result<FileAttributes, Error>;

    /// Open a directory for listing.
    fn opendir(path: Self::Path) -> Result<Self::DirStream, Error>;
    /// Return the next entry in the directory, `None` once the listing is complete.
    ///
    /// `.` and `..` are never returned. When an entry has a name we can't represent an error is
    /// returned for that entry, but the stream has still advanced past it.
    fn readdir(stream: &mut Self::DirStream) -> Result<Option<DirectoryEntry>, Error>;
    fn closedir(stream: Self::DirStream) -> Result<(), Error>;

    /// Set the scheduling priority of the process `pid`.
    fn set_priority(pid: u32, class: PriorityClass) -> Result<(), Error>;

    /// Maximum number of handles this process can have open.
    fn file_handle_max() -> Result<usize, Error>;
}

pub trait PlatformPath: Debug + Clone + Send + 'static {
    fn try_new(val: String) -> Result<Self, crate::Error>;
}

/// Type alias for the [`Platform::Handle`] associated type for the current [`FilesystemPlatform`].
pub type PlatformHandleType = <FilesystemPlatform as Platform>::Handle;
/// Type alias for the [`Platform::Path`] associated type for the current [`FilesystemPlatform`].
pub type PlatformPathType = <FilesystemPlatform as Platform>::Path;
/// Type alias for the [`Platform::DirStream`] associated type for the current [`FilesystemPlatform`].
pub type PlatformDirStreamType = <FilesystemPlatform as Platform>::DirStream;

cfg_if::cfg_if! {
    if #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
    ))] {
        mod unix;
        pub use unix::UnixPlatform as FilesystemPlatform;
    } else {
        pub use portable::PortablePlatform as FilesystemPlatform;
    }
}
