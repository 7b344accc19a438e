use image::imageops::FilterType;
use jpeg_encoder::{ColorType, Encoder};
use std::path::{Path, PathBuf};

use crate::snapshot::types::{SnapshotError, SnapshotResult};

/// Generate a unique raw capture filename: `<prefix>_<unix millis>_<seq>.png`
pub fn generate_filename(prefix: &str, millis: i64, seq: u64) -> String {
    format!("{}_{}_{:03}.png", prefix, millis, seq)
}

/// MIME type for an image path, judged by extension
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Re-encode a raw capture as a resized progressive JPEG next to it.
///
/// Scaled dimensions are truncated, never below one pixel. Returns the JPEG
/// path and its dimensions. The source file is left alone.
pub fn normalize_to_jpeg(raw: &Path, scale: f64, quality: u8) -> SnapshotResult<(PathBuf, u32, u32)> {
    let rgb = image::open(raw)?.to_rgb8();
    let width = ((f64::from(rgb.width()) * scale).floor() as u32).max(1);
    let height = ((f64::from(rgb.height()) * scale).floor() as u32).max(1);
    let (w16, h16) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(SnapshotError::Capture(format!(
                "{}x{} exceeds the JPEG size limit",
                width, height
            )));
        }
    };
    let resized = image::imageops::resize(&rgb, width, height, FilterType::Lanczos3);

    let jpg_path = raw.with_extension("jpg");
    let mut encoder = Encoder::new_file(&jpg_path, quality.clamp(1, 100))?;
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);
    encoder.encode(resized.as_raw(), w16, h16, ColorType::Rgb)?;
    Ok((jpg_path, width, height))
}
