//! Value types shared by the `gsh` crates.
//!
//! The goal of this crate is to be very lightweight, so take care with adding dependencies.
//! Everything here is plain data: the types are produced by the platform layer in `gsh-os`
//! and consumed by whatever runtime sits on top of it.

pub mod abi;
mod attributes;
mod entry;
mod modes;

pub use attributes::{Details, FileAttributes, Permissions};
pub use entry::{DirectoryEntry, EntryName, NameError, MAX_NAME_LEN};
pub use modes::{InvalidValue, OpenMode, PriorityClass};

#[cfg(test)]
mod tests;
