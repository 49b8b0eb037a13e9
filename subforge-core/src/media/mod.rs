//! Container inspection.
//!
//! This module turns the metadata tool's identification output into a typed
//! list of tracks and rejects anything that is not a Matroska container.

pub mod probe;
pub mod track;

// Re-export commonly used types
pub use probe::{inspect, parse_identification, validate_container_path};
pub use track::{ContainerInfo, ContainerTrack, TrackType};
