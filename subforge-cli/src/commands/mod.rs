//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Chapter export.
pub mod chapters;
/// The main pipeline: inspect, plan, extract, convert.
pub mod extract;
/// Track listing.
pub mod info;
/// Subtitle insertion into a container copy.
pub mod insert;
/// SRT timing shift and encoding repair.
pub mod srt;
