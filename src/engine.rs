// src/engine.rs
//
// The core of jpegme: the iterative lossy-degradation engine.
// Two variants share one codec registry and one set of clamping helpers:
// 1. Quality-Ramp Engine (CLI path) - walks quality from 100 down to a target
// 2. Iteration-Count Engine (service path) - fixed generation count with
//    optional GIF interleaving, base64-wrapped output
//
// This file is a facade over the decomposed modules in engine/

// =============================================================================
// ENGINE LIMITS
// =============================================================================

/// Lowest encode quality any generation may use.
pub const QUALITY_MIN: u8 = 1;

/// Highest encode quality; also the fixed quality of the final output encode.
pub const QUALITY_MAX: u8 = 100;

/// Minimum ramp step. Guarantees forward progress: every generation moves the
/// quality by at least one unit.
pub const STEP_MIN: u8 = 1;

/// Maximum ramp step. Keeps each generation's loss comparable - no more than
/// a 10-unit quality jump per encode.
pub const STEP_MAX: u8 = 10;

/// Minimum generation count on the service path.
pub const ITERATIONS_MIN: u32 = 1;

/// Maximum generation count on the service path.
pub const ITERATIONS_MAX: u32 = 10;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod codec;
mod generations;
mod quality;
mod ramp;

pub use codec::{Codec, CodecRegistry, Format, GifCodec, JpegCodec, PngCodec};
pub use generations::distort;
pub use quality::{bounded, step_size};
pub use ramp::distort_ramp;
