//! Resources handed out by the unix platform.

use std::ptr::NonNull;

/// An open file descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnixHandle {
    fd: libc::c_int,
}

impl UnixHandle {
    pub(crate) fn from_raw(fd: libc::c_int) -> Self {
        UnixHandle { fd }
    }

    pub(crate) fn into_raw(self) -> libc::c_int {
        self.fd
    }
}

/// An open directory stream, i.e. a `DIR *`.
///
/// Owns the stream and the file descriptor underneath it, both are released by
/// [`UnixPlatform::closedir`](super::UnixPlatform) or on drop.
#[derive(Debug)]
pub struct UnixDirStream {
    dir: Option<NonNull<libc::DIR>>,
}

// SAFETY: A `DIR *` can be used from any thread as long as it's not used from two at once,
// which `&mut` access guarantees.
unsafe impl Send for UnixDirStream {}

impl UnixDirStream {
    pub(crate) fn from_raw(dir: NonNull<libc::DIR>) -> Self {
        UnixDirStream { dir: Some(dir) }
    }

    pub(crate) fn as_ptr(&self) -> Option<*mut libc::DIR> {
        self.dir.map(NonNull::as_ptr)
    }

    pub(crate) fn take(&mut self) -> Option<NonNull<libc::DIR>> {
        self.dir.take()
    }
}

impl Drop for UnixDirStream {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let result = unsafe { libc::closedir(dir.as_ptr()) };
            if result == -1 {
                let err = std::io::Error::last_os_error();
                tracing::warn!(%err, "failed to close dropped directory stream");
            }
        }
    }
}
