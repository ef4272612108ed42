// src/job.rs
//
// Degradation job parameters.
// Cheap to construct and copy - the expensive work happens in the engine.

use serde::Deserialize;

use crate::engine::{ITERATIONS_MAX, ITERATIONS_MIN, QUALITY_MAX, QUALITY_MIN};
use crate::error::{JpegmeError, Result};

fn default_quality() -> u8 {
    50
}

fn default_iterations() -> u32 {
    1
}

/// One Iteration-Count Engine invocation, fully described.
///
/// Constructed by the request parsers (query string or JSON body) and
/// validated there; the engine never mutates it and re-clamps into locals as
/// a last line of defense.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct DistortJob {
    /// JPEG quality for every non-interleaved generation, 1-100
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Number of encode/decode generations, 1-10
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Encode even-indexed generations as GIF instead of JPEG
    #[serde(default, rename = "interleave_gif")]
    pub interleave: bool,
}

impl Default for DistortJob {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            iterations: default_iterations(),
            interleave: false,
        }
    }
}

impl DistortJob {
    /// Bounds-check the job. Callers must reject invalid jobs before the
    /// engine runs; the engine only clamps.
    pub fn validate(&self) -> Result<()> {
        if self.quality < QUALITY_MIN || self.quality > QUALITY_MAX {
            return Err(JpegmeError::invalid_parameter(
                "quality",
                self.quality.to_string(),
                "quality must be between 1 and 100 (inclusive)",
            ));
        }
        if self.iterations < ITERATIONS_MIN || self.iterations > ITERATIONS_MAX {
            return Err(JpegmeError::invalid_parameter(
                "iterations",
                self.iterations.to_string(),
                "iterations must be between 1 and 10 (inclusive)",
            ));
        }
        Ok(())
    }
}
