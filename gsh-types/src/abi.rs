//! `#[repr(C)]` records and constants for crossing a C ABI boundary.
//!
//! Consumers on the other side read these structures at fixed offsets, so the field order and
//! widths here must never change.

use std::fmt;

use static_assertions::const_assert_eq;

use crate::{Details, DirectoryEntry, EntryName, FileAttributes, NameError, OpenMode, Permissions};
use crate::{PriorityClass, MAX_NAME_LEN};

pub const READ_MODE: i32 = OpenMode::Read.as_raw();
pub const WRITE_MODE: i32 = OpenMode::Write.as_raw();
pub const APPEND_MODE: i32 = OpenMode::Append.as_raw();

pub const P_INHERIT: i32 = PriorityClass::Inherit.as_raw();
pub const P_IDLE: i32 = PriorityClass::Idle.as_raw();
pub const P_BELOW_NORMAL: i32 = PriorityClass::BelowNormal.as_raw();
pub const P_NORMAL: i32 = PriorityClass::Normal.as_raw();
pub const P_ABOVE_NORMAL: i32 = PriorityClass::AboveNormal.as_raw();
pub const P_HIGH: i32 = PriorityClass::High.as_raw();

/// Size of the name buffer in a [`RawDirEntry`], including the NUL terminator.
pub const NAME_BUFFER_LEN: usize = MAX_NAME_LEN + 1;

/// C layout of [`FileAttributes`].
///
/// Booleans are `0` or `1`. When `error` is non-zero or `exists` is `0` every other field is
/// zeroed.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RawFileAttributes {
    pub error: i32,

    pub exists: u8,

    pub writable: u8,
    pub readable: u8,
    pub executable: u8,

    pub symbolic_link: u8,
    pub regular: u8,
    pub directory: u8,

    pub stamp: i64,
    pub length: i64,
}

/// C layout of [`DirectoryEntry`], the name is NUL terminated.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct RawDirEntry {
    pub fi: RawFileAttributes,
    pub name: [u8; NAME_BUFFER_LEN],
}

// `i64` is only 8 byte aligned on 64-bit targets.
#[cfg(target_pointer_width = "64")]
mod layout {
    use super::*;

    const_assert_eq!(std::mem::size_of::<RawFileAttributes>(), 32);
    const_assert_eq!(std::mem::align_of::<RawFileAttributes>(), 8);
    const_assert_eq!(std::mem::offset_of!(RawFileAttributes, error), 0);
    const_assert_eq!(std::mem::offset_of!(RawFileAttributes, exists), 4);
    const_assert_eq!(std::mem::offset_of!(RawFileAttributes, directory), 10);
    const_assert_eq!(std::mem::offset_of!(RawFileAttributes, stamp), 16);
    const_assert_eq!(std::mem::offset_of!(RawFileAttributes, length), 24);

    const_assert_eq!(std::mem::size_of::<RawDirEntry>(), 544);
    const_assert_eq!(std::mem::offset_of!(RawDirEntry, name), 32);
}

impl From<&FileAttributes> for RawFileAttributes {
    fn from(attributes: &FileAttributes) -> Self {
        match attributes {
            FileAttributes::Failed { error } => RawFileAttributes {
                error: error.get(),
                ..Default::default()
            },
            FileAttributes::Missing => RawFileAttributes::default(),
            FileAttributes::Present(details) => RawFileAttributes {
                error: 0,
                exists: 1,
                writable: u8::from(details.writable()),
                readable: u8::from(details.readable()),
                executable: u8::from(details.executable()),
                symbolic_link: u8::from(details.symbolic_link),
                regular: u8::from(details.regular),
                directory: u8::from(details.directory),
                stamp: details.stamp,
                length: details.length,
            },
        }
    }
}

impl From<RawFileAttributes> for FileAttributes {
    fn from(raw: RawFileAttributes) -> Self {
        if raw.error != 0 {
            return FileAttributes::failed(raw.error);
        }
        if raw.exists == 0 {
            return FileAttributes::Missing;
        }

        let mut permissions = Permissions::empty();
        permissions.set(Permissions::READABLE, raw.readable != 0);
        permissions.set(Permissions::WRITABLE, raw.writable != 0);
        permissions.set(Permissions::EXECUTABLE, raw.executable != 0);

        FileAttributes::Present(Details {
            permissions,
            symbolic_link: raw.symbolic_link != 0,
            regular: raw.regular != 0,
            directory: raw.directory != 0,
            stamp: raw.stamp,
            length: raw.length,
        })
    }
}

impl RawDirEntry {
    /// The bytes of the name, up to but not including the NUL terminator.
    ///
    /// If there is no terminator the entire buffer is returned, which is one byte longer than
    /// any valid name.
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(NAME_BUFFER_LEN);
        &self.name[..len]
    }
}

impl Default for RawDirEntry {
    fn default() -> Self {
        RawDirEntry {
            fi: RawFileAttributes::default(),
            name: [0; NAME_BUFFER_LEN],
        }
    }
}

impl fmt::Debug for RawDirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDirEntry")
            .field("fi", &self.fi)
            .field("name", &String::from_utf8_lossy(self.name_bytes()))
            .finish()
    }
}

impl From<&DirectoryEntry> for RawDirEntry {
    fn from(entry: &DirectoryEntry) -> Self {
        let mut raw = RawDirEntry {
            fi: RawFileAttributes::from(entry.attributes()),
            ..Default::default()
        };
        // `EntryName` is at most `MAX_NAME_LEN` bytes, so there is always room for the NUL.
        let name = entry.name().as_bytes();
        raw.name[..name.len()].copy_from_slice(name);
        raw
    }
}

impl TryFrom<&RawDirEntry> for DirectoryEntry {
    type Error = NameError;

    fn try_from(raw: &RawDirEntry) -> Result<Self, Self::Error> {
        let name = EntryName::from_bytes(raw.name_bytes())?;
        Ok(DirectoryEntry::new(name, FileAttributes::from(raw.fi)))
    }
}
