//! Uniform view of file metadata, directory listings, and process priorities across platforms.
//!
//! There are three layers:
//!
//! * [`platform`]: blocking, platform specific operations behind the [`Platform`] trait.
//! * [`filesystem`]: an async [`Filesystem`] that runs platform operations on a worker pool and
//!   hands out [`Handle`]s that are always released, even when they're dropped.
//! * [`ffi`]: a C ABI for callers that want the raw records from [`gsh_types::abi`].
//!
//! [`Platform`]: crate::platform::Platform
//! [`Filesystem`]: crate::filesystem::Filesystem
//! [`Handle`]: crate::handle::Handle

use std::borrow::Cow;

pub use gsh_types::{
    Details, DirectoryEntry, EntryName, FileAttributes, NameError, OpenMode, Permissions,
    PriorityClass,
};

pub mod config;
pub mod ffi;
pub mod filesystem;
pub mod handle;
pub mod platform;
pub mod process;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("operation not permitted")]
    NotPermitted,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("already exists")]
    AlreadyExists,
    #[error("no such process")]
    NoProcess,
    #[error("name too long")]
    NameTooLong,
    #[error("handle is closed")]
    Closed,
    #[error("filesystem is shutting down")]
    ShuttingDown,
    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),
    #[error("invalid data: {0}")]
    InvalidData(Cow<'static, str>),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("os error {0}")]
    Os(i32),
}

impl Error {
    /// Create an [`Error`] from an `errno` value.
    pub fn from_errno(code: i32) -> Self {
        match code {
            libc::ENOENT => Error::NotFound,
            libc::EACCES => Error::PermissionDenied,
            libc::EPERM => Error::NotPermitted,
            libc::ENOTDIR => Error::NotADirectory,
            libc::EISDIR => Error::IsADirectory,
            libc::EEXIST => Error::AlreadyExists,
            libc::ESRCH => Error::NoProcess,
            libc::ENAMETOOLONG => Error::NameTooLong,
            libc::EBADF => Error::Closed,
            code => Error::Os(code),
        }
    }

    /// The `errno` value that describes this [`Error`].
    ///
    /// For errors that came from the platform this is the original value, so
    /// `Error::from_errno(code).code() == code`.
    pub fn code(&self) -> i32 {
        match self {
            Error::NotFound => libc::ENOENT,
            Error::PermissionDenied => libc::EACCES,
            Error::NotPermitted => libc::EPERM,
            Error::NotADirectory => libc::ENOTDIR,
            Error::IsADirectory => libc::EISDIR,
            Error::AlreadyExists => libc::EEXIST,
            Error::NoProcess => libc::ESRCH,
            Error::NameTooLong | Error::InvalidName(NameError::TooLong { .. }) => {
                libc::ENAMETOOLONG
            }
            Error::Closed => libc::EBADF,
            Error::ShuttingDown => libc::EIO,
            Error::Unsupported(_) => libc::ENOSYS,
            Error::InvalidName(_) | Error::InvalidData(_) | Error::InvalidConfig(_) => {
                libc::EINVAL
            }
            Error::Os(code) => *code,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        // Elsewhere raw OS errors aren't `errno` values.
        #[cfg(unix)]
        if let Some(code) = err.raw_os_error() {
            return Error::from_errno(code);
        }

        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => Error::AlreadyExists,
            _ => Error::InvalidData(err.to_string().into()),
        }
    }
}
