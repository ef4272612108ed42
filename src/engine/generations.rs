// src/engine/generations.rs
//
// Iteration-Count Engine (service path): a fixed number of encode/decode
// generations, optionally alternating GIF on even generation indexes, then a
// final full-quality JPEG encode wrapped in base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use std::io::Write;

use crate::engine::quality::bounded;
use crate::engine::{CodecRegistry, Format, ITERATIONS_MAX, ITERATIONS_MIN, QUALITY_MAX, QUALITY_MIN};
use crate::error::{JpegmeError, Result};

/// Run `image` through `job.iterations` generations of lossy re-encoding and
/// write the transport-safe result to `out`.
///
/// Generation `i` encodes GIF when `job.interleave` is set and `i` is even,
/// otherwise JPEG at `job.quality`; each generation's decode feeds the next.
/// After the loop the final raster is encoded once as JPEG at quality 100 and
/// base64-wrapped.
///
/// `out` is written exactly once, on success - a failed generation aborts
/// with the underlying codec error and the sink stays untouched. The job is
/// never mutated; out-of-range values are clamped into locals.
pub fn distort<W: Write>(
    image: DynamicImage,
    job: &crate::job::DistortJob,
    out: &mut W,
    registry: &CodecRegistry,
) -> Result<()> {
    let quality = bounded(job.quality, QUALITY_MIN, QUALITY_MAX);
    let iterations = bounded(job.iterations, ITERATIONS_MIN, ITERATIONS_MAX);
    let jpeg = registry.get(Format::Jpeg)?;
    let gif = if job.interleave {
        Some(registry.get(Format::Gif)?)
    } else {
        None
    };

    let mut img = image;
    for i in 0..iterations {
        let (codec, q) = match gif {
            Some(gif) if i % 2 == 0 => (gif, None),
            _ => (jpeg, Some(quality)),
        };
        let encoded = codec.encode(&img, q)?;
        img = codec.decode(&encoded)?;
    }

    let final_bytes = jpeg.encode(&img, Some(QUALITY_MAX))?;
    let wrapped = STANDARD.encode(final_bytes);
    out.write_all(wrapped.as_bytes())
        .map_err(|e| JpegmeError::encode_failed("jpeg", format!("failed to write output: {e}")))?;
    Ok(())
}
