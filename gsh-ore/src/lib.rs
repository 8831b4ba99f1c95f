//! Odds and ends shared by the `gsh` crates.

pub mod assert;
pub mod env;
pub mod id_gen;
