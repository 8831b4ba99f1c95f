//! Pieces of the `gsh` command line tool.

pub mod listing;
pub mod logging;
