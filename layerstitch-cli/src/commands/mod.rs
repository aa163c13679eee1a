//! Subcommand implementations.

pub mod cache;
pub mod common;
pub mod config;
pub mod preview;
pub mod stitch;
