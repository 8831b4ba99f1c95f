//! Unix specific paths.

use std::ffi::{CStr, CString};

use crate::platform::PlatformPath;

/// A path on a unix filesystem.
///
/// Unix paths are arbitrary bytes except for NUL, we additionally require them to be UTF-8
/// since they start life as a [`String`]. The NUL check happens once when the path is created
/// so every syscall can borrow it as a [`CStr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixPath {
    inner: CString,
}

impl UnixPath {
    pub fn as_c_str(&self) -> &CStr {
        self.inner.as_c_str()
    }
}

impl PlatformPath for UnixPath {
    fn try_new(val: String) -> Result<Self, crate::Error> {
        if val.is_empty() {
            return Err(crate::Error::NotFound);
        }
        let inner = CString::new(val)
            .map_err(|err| crate::Error::InvalidData(format!("path contains {err}").into()))?;
        Ok(UnixPath { inner })
    }
}

impl From<UnixPath> for CString {
    fn from(path: UnixPath) -> Self {
        path.inner
    }
}
