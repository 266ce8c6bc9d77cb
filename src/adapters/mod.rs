//! Tracker adapters
//!
//! This module provides adapters that turn raw tracker frames into the
//! pipeline's canonical [`TrackerSample`]. The core pipeline is
//! adapter-agnostic: any tracker that can produce a sample per frame plugs
//! in here without the downstream stages special-casing it.

mod landmark;
mod point;

pub use landmark::{landmark_indices, LandmarkTrackerAdapter};
pub use point::PointTrackerAdapter;

use crate::error::ComputeError;
use crate::schema::RawFrame;
use crate::types::TrackerSample;

/// Trait for tracker frame adapters
pub trait TrackerAdapter {
    /// Validate and convert a raw frame to a canonical tracker sample
    fn adapt(&self, frame: &RawFrame) -> Result<TrackerSample, ComputeError>;
}
