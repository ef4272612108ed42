// src/cli.rs
//
// One-shot file conversion: decode a local image, run it through the
// Quality-Ramp Engine (JPEG targets) or a plain re-encode (PNG/GIF targets),
// write the result atomically.

use clap::Args;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::acquire;
use crate::engine::{distort_ramp, CodecRegistry, Format};
use crate::error::{JpegmeError, Result};

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input image file (jpeg, png, or gif)
    #[arg(long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output file; the output codec is inferred from the extension
    #[arg(long = "out", value_name = "PATH")]
    pub output: PathBuf,

    /// Ramp target quality when the output is JPEG
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    let registry = CodecRegistry::builtin();

    let bytes = acquire::load_file(&args.input)?;
    let (image, detected) = acquire::decode_bytes(&bytes, &registry)?;
    println!("Found {detected} file");

    let extension = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let format = Format::from_extension(extension)
        .ok_or_else(|| JpegmeError::unsupported_output_format(extension.to_string()))?;

    let mut out = Vec::new();
    match format {
        Format::Jpeg => distort_ramp(image, &mut out, args.quality, 1, &registry)?,
        // PNG is lossless, so no options; GIF degrades through its palette
        Format::Png | Format::Gif => {
            out = registry.get(format)?.encode(&image, None)?;
        }
    }

    write_atomic(&args.output, &out)?;
    log::info!("wrote {} bytes to {}", out.len(), args.output.display());
    Ok(())
}

/// Write through a temp file in the destination directory, then persist.
/// A failed conversion never leaves a partial output behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let display = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| JpegmeError::file_write_failed(display.clone(), e))?;
    tmp.write_all(bytes)
        .map_err(|e| JpegmeError::file_write_failed(display.clone(), e))?;
    tmp.persist(path)
        .map_err(|e| JpegmeError::file_write_failed(display, e.error))?;
    Ok(())
}
