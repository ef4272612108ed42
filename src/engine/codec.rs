// src/engine/codec.rs
//
// Explicit codec registry: a mapping from format identifier to encode/decode
// pairs, injected into the engines. Replaces the hidden global decoder
// registration the original design relied on - "decode without knowing the
// format up front" is preserved via magic-byte sniffing with a probe
// fallback.
//
// JPEG rides mozjpeg (libjpeg-turbo) for both directions; GIF and PNG go
// through the image crate.

use image::{DynamicImage, ImageFormat, RgbImage};
use mozjpeg::{ColorSpace, Compress, Decompress};
use std::fmt;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{JpegmeError, Result};

/// Formats the builtin registry knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Format A: lossy, quality-parameterized. The primary degradation codec.
    Jpeg,
    /// Format B: palette-quantized, no quality knob. The interleave codec.
    Gif,
    /// Lossless; CLI output target only, never part of a degradation loop.
    Png,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Jpeg => "jpeg",
            Format::Gif => "gif",
            Format::Png => "png",
        }
    }

    /// Map an output-file extension onto a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Format::Jpeg),
            "gif" => Some(Format::Gif),
            "png" => Some(Format::Png),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registered encode/decode pair.
///
/// Codecs are stateless; quality is per-call. Codecs without a quality knob
/// ignore the parameter.
pub trait Codec: Send + Sync {
    fn format(&self) -> Format;

    /// Magic-byte probe. Cheap, never decodes.
    fn sniff(&self, bytes: &[u8]) -> bool;

    fn encode(&self, image: &DynamicImage, quality: Option<u8>) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage>;
}

/// mozjpeg reports fatal errors by unwinding out of the C error handler.
/// Contain that so a bad generation surfaces as a codec error instead of
/// taking the invocation down.
fn run_contained<T>(what: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(JpegmeError::decode_failed(format!("{what}: {message}")))
        }
    }
}

// =============================================================================
// JPEG (format A)
// =============================================================================

pub struct JpegCodec;

impl Codec for JpegCodec {
    fn format(&self) -> Format {
        Format::Jpeg
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&[0xFF, 0xD8])
    }

    fn encode(&self, image: &DynamicImage, quality: Option<u8>) -> Result<Vec<u8>> {
        let quality = quality.unwrap_or(crate::engine::QUALITY_MAX).min(100);
        run_contained("encode:jpeg", || {
            let rgb = image.to_rgb8();
            let (w, h) = rgb.dimensions();
            if w == 0 || h == 0 {
                return Err(JpegmeError::encode_failed(
                    "jpeg",
                    "image has zero width or height",
                ));
            }
            let pixels: &[u8] = rgb.as_raw();

            let mut comp = Compress::new(ColorSpace::JCS_RGB);
            comp.set_size(w as usize, h as usize);
            comp.set_color_space(ColorSpace::JCS_YCbCr);
            comp.set_quality(f32::from(quality));
            comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));

            let estimated = (w as usize * h as usize * 3 / 10).max(4096);
            let mut output = Vec::with_capacity(estimated);
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                JpegmeError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    JpegmeError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                JpegmeError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;

            Ok(output)
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        run_contained("decode:jpeg", || {
            // mozjpeg tolerates truncated streams; require the EOI marker so a
            // cut-off source fails the generation instead of half-decoding.
            if !bytes.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
                return Err(JpegmeError::decode_failed("jpeg: missing EOI marker"));
            }

            let decompress = Decompress::new_mem(bytes).map_err(|e| {
                JpegmeError::decode_failed(format!("mozjpeg: decompress init failed: {e:?}"))
            })?;

            let mut decompress = decompress.rgb().map_err(|e| {
                JpegmeError::decode_failed(format!("mozjpeg: rgb conversion failed: {e:?}"))
            })?;

            let width = decompress.width();
            let height = decompress.height();

            let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
                JpegmeError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
            })?;

            let flat: Vec<u8> = pixels.into_iter().flatten().collect();
            let rgb = RgbImage::from_raw(width as u32, height as u32, flat).ok_or_else(|| {
                JpegmeError::decode_failed("mozjpeg: failed to build image from raw data")
            })?;

            Ok(DynamicImage::ImageRgb8(rgb))
        })
    }
}

// =============================================================================
// GIF (format B)
// =============================================================================

pub struct GifCodec;

impl Codec for GifCodec {
    fn format(&self) -> Format {
        Format::Gif
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
    }

    // GIF has no quality knob; degradation comes from palette quantization.
    fn encode(&self, image: &DynamicImage, _quality: Option<u8>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .map_err(|e| JpegmeError::encode_failed("gif", format!("GIF encode failed: {e}")))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory_with_format(bytes, ImageFormat::Gif)
            .map_err(|e| JpegmeError::decode_failed(format!("gif: decode failed: {e}")))
    }
}

// =============================================================================
// PNG (lossless CLI target)
// =============================================================================

pub struct PngCodec;

impl Codec for PngCodec {
    fn format(&self) -> Format {
        Format::Png
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    fn encode(&self, image: &DynamicImage, _quality: Option<u8>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| JpegmeError::encode_failed("png", format!("PNG encode failed: {e}")))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| JpegmeError::decode_failed(format!("png: decode failed: {e}")))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered collection of codecs. Lookup is first-match, so a test double
/// registered ahead of a builtin shadows it.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// All builtin codecs: JPEG, GIF, PNG.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JpegCodec));
        registry.register(Box::new(GifCodec));
        registry.register(Box::new(PngCodec));
        registry
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.push(codec);
    }

    pub fn get(&self, format: Format) -> Result<&dyn Codec> {
        self.codecs
            .iter()
            .map(AsRef::as_ref)
            .find(|c| c.format() == format)
            .ok_or_else(|| {
                JpegmeError::encode_failed(format.name(), "no codec registered for format")
            })
    }

    /// Decode without knowing the format up front: sniff magic bytes first,
    /// then fall back to probing each registered decoder in order.
    pub fn sniff_decode(&self, bytes: &[u8]) -> Result<(DynamicImage, Format)> {
        for codec in &self.codecs {
            if codec.sniff(bytes) {
                return codec.decode(bytes).map(|img| (img, codec.format()));
            }
        }
        for codec in &self.codecs {
            if let Ok(img) = codec.decode(bytes) {
                return Ok((img, codec.format()));
            }
        }
        Err(JpegmeError::decode_failed(
            "no registered codec recognizes the input",
        ))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
