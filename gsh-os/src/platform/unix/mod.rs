use std::ffi::CStr;
use std::ptr::NonNull;

use crate::platform::unix::types::{UnixDirStream, UnixHandle};
use crate::platform::{OpenOptions, Platform};
use crate::{Details, DirectoryEntry, EntryName, FileAttributes, Permissions, PriorityClass};

mod path;
mod types;


pub use path::UnixPath;

pub struct UnixPlatform;

fn check_result(val: libc::c_int) -> Result<libc::c_int, crate::Error> {
    if val == -1 {
        Err(last_error())
    } else {
        Ok(val)
    }
}

fn check_size(val: isize) -> Result<usize, crate::Error> {
    if val < 0 {
        Err(last_error())
    } else {
        Ok(val.unsigned_abs())
    }
}

fn last_error() -> crate::Error {
    crate::Error::from_errno(errno::get())
}

impl Platform for UnixPlatform {
    type Path = UnixPath;

    type Handle = UnixHandle;
    type DirStream = UnixDirStream;

    fn open(path: Self::Path, options: OpenOptions) -> Result<Self::Handle, crate::Error> {
        let flags = open_flags(options);
        let mode: libc::c_uint = 0o666;

        let result = unsafe { libc::open(path.as_c_str().as_ptr(), flags, mode) };
        let fd = check_result(result)?;

        Ok(UnixHandle::from_raw(fd))
    }

    fn close(handle: Self::Handle) -> Result<(), crate::Error> {
        let result = unsafe { libc::close(handle.into_raw()) };
        check_result(result)?;
        Ok(())
    }

    fn read(handle: &Self::Handle, buf: &mut [u8]) -> Result<usize, crate::Error> {
        let result = unsafe { libc::read(handle.into_raw(), buf.as_mut_ptr().cast(), buf.len()) };
        check_size(result)
    }

    fn write(handle: &Self::Handle, data: &[u8]) -> Result<usize, crate::Error> {
        let result = unsafe { libc::write(handle.into_raw(), data.as_ptr().cast(), data.len()) };
        check_size(result)
    }

    fn fsync(handle: &Self::Handle) -> Result<(), crate::Error> {
        let result = unsafe { libc::fsync(handle.into_raw()) };
        check_result(result)?;
        Ok(())
    }

    fn attributes(path: Self::Path) -> Result<FileAttributes, crate::Error> {
        Location::Cwd(path.as_c_str()).attributes()
    }

    fn opendir(path: Self::Path) -> Result<Self::DirStream, crate::Error> {
        // Open the descriptor ourselves so `O_DIRECTORY` rejects anything that isn't a
        // directory with `ENOTDIR`.
        let handle = Self::open(path, OpenOptions::READ_ONLY | OpenOptions::DIRECTORY)?;
        let fd = handle.into_raw();

        // On success the stream owns `fd`.
        let dir = unsafe { libc::fdopendir(fd) };
        match NonNull::new(dir) {
            Some(dir) => Ok(UnixDirStream::from_raw(dir)),
            None => {
                let err = last_error();
                unsafe { libc::close(fd) };
                Err(err)
            }
        }
    }

    fn readdir(stream: &mut Self::DirStream) -> Result<Option<DirectoryEntry>, crate::Error> {
        let dir = stream.as_ptr().ok_or(crate::Error::Closed)?;

        loop {
            // `readdir` returns NULL at the end of the stream and on error, the only way to
            // tell them apart is `errno`.
            errno::clear();
            let dirent = unsafe { libc::readdir(dir) };
            if dirent.is_null() {
                return match errno::get() {
                    0 => Ok(None),
                    code => Err(crate::Error::from_errno(code)),
                };
            }

            // The name is only valid until the next call to `readdir`.
            let raw_name = unsafe { CStr::from_ptr((*dirent).d_name.as_ptr()) };
            if matches!(raw_name.to_bytes(), b"." | b"..") {
                continue;
            }
            let name = EntryName::from_bytes(raw_name.to_bytes())?;

            let dirfd = unsafe { libc::dirfd(dir) };
            let attributes = match Location::At(dirfd, raw_name).attributes() {
                Ok(attributes) => attributes,
                Err(err) => {
                    tracing::debug!(%name, %err, "failed to query entry attributes");
                    FileAttributes::failed(err.code())
                }
            };

            return Ok(Some(DirectoryEntry::new(name, attributes)));
        }
    }

    fn closedir(mut stream: Self::DirStream) -> Result<(), crate::Error> {
        let dir = stream.take().ok_or(crate::Error::Closed)?;
        let result = unsafe { libc::closedir(dir.as_ptr()) };
        check_result(result)?;
        Ok(())
    }

    fn set_priority(pid: u32, class: PriorityClass) -> Result<(), crate::Error> {
        let Some(nice) = class.nice_value() else {
            return Ok(());
        };
        let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, libc::id_t::from(pid), nice) };
        check_result(result)?;
        Ok(())
    }

    fn file_handle_max() -> Result<usize, crate::Error> {
        let mut limits = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let result = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limits as *mut _) };
        check_result(result)?;

        Ok(usize::try_from(limits.rlim_cur).unwrap_or(usize::MAX))
    }
}

fn open_flags(options: OpenOptions) -> libc::c_int {
    let mut flags = libc::O_CLOEXEC;

    if options.contains(OpenOptions::READ_WRITE) {
        flags |= libc::O_RDWR;
    } else if options.contains(OpenOptions::WRITE_ONLY) {
        flags |= libc::O_WRONLY;
    } else {
        flags |= libc::O_RDONLY;
    }

    for (option, flag) in [
        (OpenOptions::APPEND, libc::O_APPEND),
        (OpenOptions::CREATE, libc::O_CREAT),
        (OpenOptions::EXCLUSIVE, libc::O_EXCL),
        (OpenOptions::TRUNCATE, libc::O_TRUNC),
        (OpenOptions::DIRECTORY, libc::O_DIRECTORY),
    ] {
        if options.contains(option) {
            flags |= flag;
        }
    }

    flags
}

/// Where an entry lives, either relative to the working directory or to an open directory.
#[derive(Debug, Copy, Clone)]
enum Location<'a> {
    Cwd(&'a CStr),
    At(libc::c_int, &'a CStr),
}

impl Location<'_> {
    fn parts(&self) -> (libc::c_int, &CStr) {
        match self {
            Location::Cwd(path) => (libc::AT_FDCWD, path),
            Location::At(dirfd, name) => (*dirfd, name),
        }
    }

    fn stat(&self, flags: libc::c_int) -> Result<libc::stat, crate::Error> {
        let (dirfd, path) = self.parts();
        // SAFETY: `stat` is plain old data, all zeroes is a valid value.
        let mut raw_stat: libc::stat = unsafe { std::mem::zeroed() };

        let result = unsafe { libc::fstatat(dirfd, path.as_ptr(), &mut raw_stat as *mut _, flags) };
        check_result(result)?;

        Ok(raw_stat)
    }

    /// Checked against our effective ids, the same ones `open` uses.
    fn access(&self, mode: libc::c_int) -> bool {
        let (dirfd, path) = self.parts();
        unsafe { libc::faccessat(dirfd, path.as_ptr(), mode, libc::AT_EACCESS) == 0 }
    }

    fn attributes(&self) -> Result<FileAttributes, crate::Error> {
        // Look at the entry itself first, so we know if it's a link.
        let link = match self.stat(libc::AT_SYMLINK_NOFOLLOW) {
            Ok(link) => link,
            Err(crate::Error::NotFound | crate::Error::NotADirectory) => {
                return Ok(FileAttributes::Missing)
            }
            Err(err) => return Err(err),
        };

        let symbolic_link = file_kind(&link) == libc::S_IFLNK;
        let target = if symbolic_link {
            match self.stat(0) {
                Ok(target) => Some(target),
                // Dangling or looping links still exist, they just don't resolve.
                Err(crate::Error::NotFound | crate::Error::NotADirectory) => None,
                Err(crate::Error::Os(libc::ELOOP)) => None,
                Err(err) => return Err(err),
            }
        } else {
            Some(link)
        };

        let mut permissions = Permissions::empty();
        if target.is_some() {
            permissions.set(Permissions::READABLE, self.access(libc::R_OK));
            permissions.set(Permissions::WRITABLE, self.access(libc::W_OK));
            permissions.set(Permissions::EXECUTABLE, self.access(libc::X_OK));
        }

        let resolved = target.as_ref().unwrap_or(&link);
        let kind = target.as_ref().map(file_kind);

        Ok(FileAttributes::Present(Details {
            permissions,
            symbolic_link,
            regular: kind == Some(libc::S_IFREG),
            directory: kind == Some(libc::S_IFDIR),
            stamp: i64::from(resolved.st_mtime),
            length: i64::from(resolved.st_size),
        }))
    }
}

fn file_kind(stat: &libc::stat) -> libc::mode_t {
    stat.st_mode & libc::S_IFMT
}

/// Thread local `errno` access.
mod errno {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "linux", target_os = "android"))] {
            unsafe fn location() -> *mut libc::c_int {
                libc::__errno_location()
            }
        } else if #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))] {
            unsafe fn location() -> *mut libc::c_int {
                libc::__error()
            }
        } else {
            unsafe fn location() -> *mut libc::c_int {
                libc::__errno()
            }
        }
    }

    pub(super) fn get() -> libc::c_int {
        unsafe { *location() }
    }

    pub(super) fn clear() {
        unsafe { *location() = 0 }
    }
}
