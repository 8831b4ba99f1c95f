use std::num::NonZeroI32;
use std::time::{Duration, SystemTime};

use bitflags::bitflags;
use serde::Serialize;

/// Error code recorded when a failure didn't come with one.
const UNKNOWN_ERROR: NonZeroI32 = match NonZeroI32::new(-1) {
    Some(code) => code,
    None => unreachable!(),
};

bitflags! {
    /// Access the querying process has to an entry.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
    pub struct Permissions: u8 {
        const READABLE = 0b0000_0001;
        const WRITABLE = 0b0000_0010;
        const EXECUTABLE = 0b0000_0100;
    }
}

/// State of a single filesystem entry at the moment it was queried.
///
/// A query either failed, found nothing, or found an entry. Only the last case carries
/// [`Details`], so there is no way to look at the kind, permissions, size, or timestamp of an
/// entry without first handling the error and existence checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileAttributes {
    /// The query itself failed, `error` is the platform error code (e.g. `errno`).
    Failed { error: NonZeroI32 },
    /// Nothing exists at the queried location.
    Missing,
    /// The entry exists.
    Present(Details),
}

impl FileAttributes {
    /// Attributes for a query that failed with the platform error `code`.
    ///
    /// A `code` of `0` is not a failure, so it's mapped to `-1`.
    pub fn failed(code: i32) -> Self {
        let error = NonZeroI32::new(code).unwrap_or(UNKNOWN_ERROR);
        FileAttributes::Failed { error }
    }

    /// Collapses the result of an attribute query into the in-band representation, where the
    /// failure is recorded in [`FileAttributes::error`].
    pub fn from_result<E, F>(result: Result<FileAttributes, E>, code: F) -> Self
    where
        F: FnOnce(&E) -> i32,
    {
        match result {
            Ok(attributes) => attributes,
            Err(err) => FileAttributes::failed(code(&err)),
        }
    }

    /// Status code of the query, `0` means it succeeded.
    pub fn error(&self) -> i32 {
        match self {
            FileAttributes::Failed { error } => error.get(),
            FileAttributes::Missing | FileAttributes::Present(_) => 0,
        }
    }

    /// Returns if the query succeeded and found an entry.
    pub fn exists(&self) -> bool {
        matches!(self, FileAttributes::Present(_))
    }

    /// Details about the entry, `None` if the query failed or nothing exists.
    pub fn details(&self) -> Option<&Details> {
        match self {
            FileAttributes::Present(details) => Some(details),
            FileAttributes::Failed { .. } | FileAttributes::Missing => None,
        }
    }

    pub fn is_regular(&self) -> bool {
        self.details().is_some_and(|d| d.regular)
    }

    pub fn is_directory(&self) -> bool {
        self.details().is_some_and(|d| d.directory)
    }

    pub fn is_symbolic_link(&self) -> bool {
        self.details().is_some_and(|d| d.symbolic_link)
    }
}

/// Everything we know about an entry that exists.
///
/// `symbolic_link`, `regular`, and `directory` are not mutually exclusive. A symbolic link is
/// resolved and the kind of its target is reported alongside `symbolic_link`. A dangling link is
/// only a `symbolic_link`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Details {
    /// Access the querying process has.
    pub permissions: Permissions,
    /// The entry itself is a symbolic link.
    pub symbolic_link: bool,
    /// The entry, after resolving links, is a regular file.
    pub regular: bool,
    /// The entry, after resolving links, is a directory.
    pub directory: bool,
    /// Last modification time, in seconds since the Unix epoch.
    pub stamp: i64,
    /// Size in bytes, see [`Details::size`].
    pub length: i64,
}

impl Details {
    pub fn readable(&self) -> bool {
        self.permissions.contains(Permissions::READABLE)
    }

    pub fn writable(&self) -> bool {
        self.permissions.contains(Permissions::WRITABLE)
    }

    pub fn executable(&self) -> bool {
        self.permissions.contains(Permissions::EXECUTABLE)
    }

    /// Size of the entry in bytes, only meaningful for regular files.
    pub fn size(&self) -> Option<u64> {
        if self.regular {
            u64::try_from(self.length).ok()
        } else {
            None
        }
    }

    /// [`Details::stamp`] as a [`SystemTime`].
    pub fn modified(&self) -> SystemTime {
        let offset = Duration::from_secs(self.stamp.unsigned_abs());
        if self.stamp >= 0 {
            SystemTime::UNIX_EPOCH + offset
        } else {
            SystemTime::UNIX_EPOCH - offset
        }
    }
}
