use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Serialize, Serializer};

use crate::FileAttributes;

/// Maximum length of an [`EntryName`] in bytes.
///
/// Names cross the C ABI in a 512 byte buffer that also holds a NUL terminator.
pub const MAX_NAME_LEN: usize = 511;

/// Base name of an entry in a directory, never a full path.
///
/// * Non-empty.
/// * At most [`MAX_NAME_LEN`] bytes.
/// * No NUL bytes or path separators.
///
/// Names are whatever bytes the platform hands us, they don't have to be UTF-8. Valid UTF-8 is
/// always stored as text, so two names are equal exactly when their bytes are.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntryName(Repr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Text(CompactString),
    Bytes(Box<[u8]>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("entry name is empty")]
    Empty,
    #[error("entry name is {len} bytes, the maximum is {MAX_NAME_LEN}")]
    TooLong { len: usize },
    #[error("entry name contains a NUL byte")]
    Nul,
    #[error("entry name contains a path separator")]
    Separator,
    #[error("entry name can't be represented on this platform")]
    InvalidUtf8,
}

impl EntryName {
    pub fn new(name: &str) -> Result<Self, NameError> {
        Self::validate(name.as_bytes())?;
        Ok(EntryName(Repr::Text(CompactString::from(name))))
    }

    /// Creates an [`EntryName`] from the raw bytes a platform handed us.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NameError> {
        Self::validate(bytes)?;
        let repr = match std::str::from_utf8(bytes) {
            Ok(text) => Repr::Text(CompactString::from(text)),
            Err(_) => Repr::Bytes(bytes.into()),
        };
        Ok(EntryName(repr))
    }

    fn validate(bytes: &[u8]) -> Result<(), NameError> {
        if bytes.is_empty() {
            return Err(NameError::Empty);
        }
        if bytes.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong { len: bytes.len() });
        }
        if bytes.contains(&0) {
            return Err(NameError::Nul);
        }
        // Every separator is ASCII, so this holds for names that aren't UTF-8 too.
        if bytes
            .iter()
            .any(|b| b.is_ascii() && std::path::is_separator(char::from(*b)))
        {
            return Err(NameError::Separator);
        }
        Ok(())
    }

    /// The name as text, `None` if it isn't valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        match &self.0 {
            Repr::Text(text) => Some(text.as_str()),
            Repr::Bytes(_) => None,
        }
    }

    /// The name as text, with invalid sequences replaced by `U+FFFD`.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match &self.0 {
            Repr::Text(text) => Cow::Borrowed(text.as_str()),
            Repr::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Text(text) => text.as_bytes(),
            Repr::Bytes(bytes) => &bytes[..],
        }
    }

    /// Length of the name in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Always `false`, names are never empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl AsRef<[u8]> for EntryName {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialOrd for EntryName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte order, which matches `str` order for names that are text.
impl Ord for EntryName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Text(text) => fmt::Debug::fmt(text.as_str(), f),
            Repr::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
        }
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Serialize for EntryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl FromStr for EntryName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryName::new(s)
    }
}

impl TryFrom<&str> for EntryName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        EntryName::new(value)
    }
}

impl TryFrom<String> for EntryName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntryName::new(&value)
    }
}

/// One item produced while listing a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    name: EntryName,
    attributes: FileAttributes,
}

impl DirectoryEntry {
    pub fn new(name: EntryName, attributes: FileAttributes) -> Self {
        DirectoryEntry { name, attributes }
    }

    pub fn name(&self) -> &EntryName {
        &self.name
    }

    pub fn attributes(&self) -> &FileAttributes {
        &self.attributes
    }

    pub fn into_parts(self) -> (EntryName, FileAttributes) {
        (self.name, self.attributes)
    }
}
