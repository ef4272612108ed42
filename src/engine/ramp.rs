// src/engine/ramp.rs
//
// Quality-Ramp Engine (command-line path): one lossy codec, quality walked
// from 100 down to a target in derived steps, one generation per step.

use image::DynamicImage;
use std::io::Write;

use crate::engine::quality::{bounded, step_size};
use crate::engine::{CodecRegistry, Format, QUALITY_MAX, QUALITY_MIN};
use crate::error::{JpegmeError, Result};

/// Run `image` through a quality ramp and write the result to `out`.
///
/// The ramp starts at quality 100 and decrements by the derived step while
/// the current quality is still at or above `target`; every visited quality
/// is one full encode/decode generation. The accumulator raster is rebound
/// each generation - the decode of generation `i` feeds the encode of
/// generation `i+1`.
///
/// The final output encode always runs at full quality (100) regardless of
/// where the ramp stopped; the degradation is already baked into the pixels
/// and a fixed final quality normalizes output size.
///
/// Any encode or decode failure aborts the whole call; nothing is written to
/// `out` on failure.
pub fn distort_ramp<W: Write>(
    image: DynamicImage,
    out: &mut W,
    target: u8,
    iterations: u32,
    registry: &CodecRegistry,
) -> Result<()> {
    let target = bounded(target, QUALITY_MIN, QUALITY_MAX);
    let step = i32::from(step_size(target, iterations));
    let jpeg = registry.get(Format::Jpeg)?;

    let mut img = image;
    let mut quality = i32::from(QUALITY_MAX);
    while quality >= i32::from(target) {
        let q = bounded(quality, i32::from(QUALITY_MIN), i32::from(QUALITY_MAX)) as u8;
        let encoded = jpeg.encode(&img, Some(q))?;
        img = jpeg.decode(&encoded)?;
        quality -= step;
    }

    let final_bytes = jpeg.encode(&img, Some(QUALITY_MAX))?;
    out.write_all(&final_bytes)
        .map_err(|e| JpegmeError::encode_failed("jpeg", format!("failed to write output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn test_ramp_output_is_decodable_jpeg() {
        let registry = CodecRegistry::builtin();
        let mut out = Vec::new();
        distort_ramp(create_test_image(9, 9), &mut out, 40, 3, &registry).unwrap();

        assert_eq!(&out[0..2], &[0xFF, 0xD8]);
        let decoded = registry.get(Format::Jpeg).unwrap().decode(&out).unwrap();
        assert_eq!(decoded.dimensions(), (9, 9));
    }

    #[test]
    fn test_ramp_accepts_quality_extremes() {
        let registry = CodecRegistry::builtin();

        let mut out = Vec::new();
        distort_ramp(create_test_image(4, 4), &mut out, 1, 10, &registry).unwrap();
        assert!(!out.is_empty());

        let mut out = Vec::new();
        distort_ramp(create_test_image(4, 4), &mut out, 100, 1, &registry).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_ramp_clamps_out_of_range_target() {
        let registry = CodecRegistry::builtin();
        let mut out = Vec::new();
        // target 0 is caller error; the defensive clamp turns it into 1
        distort_ramp(create_test_image(4, 4), &mut out, 0, 2, &registry).unwrap();
        assert_eq!(&out[0..2], &[0xFF, 0xD8]);
    }
}
