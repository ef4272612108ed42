// lib.rs
//
// jpegme: iterative lossy image degradation ("generation loss") engine,
// exposed as a local command and an HTTP endpoint.
//
// Design notes:
// - Two engine variants share one codec registry: a quality ramp for the CLI
//   path and a fixed generation count (with optional GIF interleaving) for
//   the service path.
// - Codecs are an explicit registry injected into the engines - no global
//   decoder registration.
// - Degradation is the intended output, not a defect.

pub mod acquire;
pub mod cli;
pub mod engine;
pub mod error;
pub mod job;
pub mod server;

pub use engine::{distort, distort_ramp, CodecRegistry, Format};
pub use error::{ErrorCategory, JpegmeError};
pub use job::DistortJob;
