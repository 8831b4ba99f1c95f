use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A raw value or name that doesn't map to any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct InvalidValue {
    kind: &'static str,
    value: String,
}

/// How a file handle gets opened.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Read from the start of an existing file.
    Read = 0,
    /// Create or truncate the file, then write to it.
    Write = 1,
    /// Create the file if needed, writes always go to the end.
    Append = 2,
}

impl OpenMode {
    pub const ALL: [OpenMode; 3] = [OpenMode::Read, OpenMode::Write, OpenMode::Append];

    /// The stable numeric value of this mode.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            OpenMode::Read => "read",
            OpenMode::Write => "write",
            OpenMode::Append => "append",
        }
    }

    /// Returns if a handle opened with this mode can be written to.
    pub const fn is_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::Append)
    }
}

impl TryFrom<i32> for OpenMode {
    type Error = InvalidValue;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        OpenMode::ALL
            .into_iter()
            .find(|mode| mode.as_raw() == value)
            .ok_or_else(|| InvalidValue {
                kind: "open mode",
                value: value.to_string(),
            })
    }
}

impl FromStr for OpenMode {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpenMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| InvalidValue {
                kind: "open mode",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse scheduling hint for a process, ordered from lowest to highest priority.
///
/// [`PriorityClass::Inherit`] sorts first but isn't a priority at all, it keeps whatever the
/// parent process has.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Inherit = 0,
    Idle = 1,
    BelowNormal = 2,
    Normal = 3,
    AboveNormal = 4,
    High = 5,
}

impl PriorityClass {
    pub const ALL: [PriorityClass; 6] = [
        PriorityClass::Inherit,
        PriorityClass::Idle,
        PriorityClass::BelowNormal,
        PriorityClass::Normal,
        PriorityClass::AboveNormal,
        PriorityClass::High,
    ];

    /// The stable numeric value of this class.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            PriorityClass::Inherit => "inherit",
            PriorityClass::Idle => "idle",
            PriorityClass::BelowNormal => "below_normal",
            PriorityClass::Normal => "normal",
            PriorityClass::AboveNormal => "above_normal",
            PriorityClass::High => "high",
        }
    }

    /// The unix "nice" value for this class, `None` for [`PriorityClass::Inherit`].
    pub const fn nice_value(self) -> Option<i32> {
        match self {
            PriorityClass::Inherit => None,
            PriorityClass::Idle => Some(19),
            PriorityClass::BelowNormal => Some(10),
            PriorityClass::Normal => Some(0),
            PriorityClass::AboveNormal => Some(-5),
            PriorityClass::High => Some(-10),
        }
    }
}

impl TryFrom<i32> for PriorityClass {
    type Error = InvalidValue;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        PriorityClass::ALL
            .into_iter()
            .find(|class| class.as_raw() == value)
            .ok_or_else(|| InvalidValue {
                kind: "priority class",
                value: value.to_string(),
            })
    }
}

impl FromStr for PriorityClass {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        PriorityClass::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| InvalidValue {
                kind: "priority class",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
