//! C ABI over the [`FilesystemPlatform`].
//!
//! Failures are reported the way C callers expect: a null handle or a negative return value,
//! with the `errno` style code available from [`__gsh_last_error`]. Attribute queries report
//! their failure in-band, in [`RawFileAttributes::error`].
//!
//! Every directory handle returned by [`__gsh_open_directory`] must be released with
//! [`__gsh_close_directory`], exactly once.

use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CStr};

use gsh_types::abi::{RawDirEntry, RawFileAttributes};

use crate::platform::{
    FilesystemPlatform, Platform, PlatformDirStreamType, PlatformPath, PlatformPathType,
};
use crate::FileAttributes;

std::thread_local! {
    /// Code of the most recent failure on this thread.
    static LAST_ERROR: Cell<c_int> = const { Cell::new(0) };
}

fn record(err: &crate::Error) -> c_int {
    let code = err.code();
    LAST_ERROR.with(|last| last.set(code));
    code
}

/// # Safety
///
/// `path` must be null or point to a NUL terminated string.
unsafe fn path_from_raw(path: *const c_char) -> Result<PlatformPathType, crate::Error> {
    if path.is_null() {
        return Err(crate::Error::InvalidData("null path".into()));
    }
    let path = unsafe { CStr::from_ptr(path) }
        .to_str()
        .map_err(|_| crate::Error::InvalidData("path is not valid UTF-8".into()))?;
    PlatformPathType::try_new(path.to_string())
}

/// Begin listing the directory at `path`.
///
/// Returns an opaque handle owned by the caller, or null if `path` doesn't exist, isn't a
/// directory, or can't be read. See [`__gsh_last_error`] for why.
///
/// # Safety
///
/// `path` must be null or point to a NUL terminated string.
#[no_mangle]
pub unsafe extern "C" fn __gsh_open_directory(path: *const c_char) -> *mut c_void {
    let result = unsafe { path_from_raw(path) }.and_then(FilesystemPlatform::opendir);
    match result {
        Ok(stream) => Box::into_raw(Box::new(stream)).cast(),
        Err(err) => {
            tracing::debug!(%err, "failed to open directory");
            record(&err);
            std::ptr::null_mut()
        }
    }
}

/// Write the next entry of the listing into `entry`.
///
/// Returns `1` when an entry was written, `0` at the end of the listing, and `-1` on error. An
/// entry whose name can't be represented is an error, but the listing moves past it.
///
/// # Safety
///
/// `handle` must come from [`__gsh_open_directory`] and not have been closed, `entry` must be
/// valid for writes. Neither may be used from another thread during the call.
#[no_mangle]
pub unsafe extern "C" fn __gsh_read_directory(handle: *mut c_void, entry: *mut RawDirEntry) -> c_int {
    if handle.is_null() || entry.is_null() {
        record(&crate::Error::InvalidData("null argument".into()));
        return -1;
    }
    let stream = unsafe { &mut *handle.cast::<PlatformDirStreamType>() };

    match FilesystemPlatform::readdir(stream) {
        Ok(Some(next)) => {
            unsafe { entry.write(RawDirEntry::from(&next)) };
            1
        }
        Ok(None) => 0,
        Err(err) => {
            record(&err);
            -1
        }
    }
}

/// Release a handle returned by [`__gsh_open_directory`].
///
/// Returns `0` on success and `-1` on error, the handle is released either way. Closing a null
/// handle does nothing.
///
/// # Safety
///
/// `handle` must be null or come from [`__gsh_open_directory`] and not have been closed.
#[no_mangle]
pub unsafe extern "C" fn __gsh_close_directory(handle: *mut c_void) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let stream = unsafe { Box::from_raw(handle.cast::<PlatformDirStreamType>()) };

    match FilesystemPlatform::closedir(*stream) {
        Ok(()) => 0,
        Err(err) => {
            record(&err);
            -1
        }
    }
}

/// Query the attributes of the entry at `path` into `attributes`.
///
/// # Safety
///
/// `path` must be null or point to a NUL terminated string, `attributes` must be null or valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn __gsh_file_information(
    path: *const c_char,
    attributes: *mut RawFileAttributes,
) {
    if attributes.is_null() {
        return;
    }

    let result = unsafe { path_from_raw(path) }.and_then(FilesystemPlatform::attributes);
    let queried = FileAttributes::from_result(result, record);
    unsafe { attributes.write(RawFileAttributes::from(&queried)) };
}

/// The error code of the most recent failure on the calling thread, `0` if nothing has failed.
#[no_mangle]
pub extern "C" fn __gsh_last_error() -> c_int {
    LAST_ERROR.with(Cell::get)
}
