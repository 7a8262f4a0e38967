// src/transforms/image/mod.rs

//! Lossy/structural image compression, dispatched on file extension.

pub mod raster;
pub mod svg;

use tracing::debug;

use crate::config::ImageSection;
use crate::pipeline::{Artifact, Transform, TransformError};

/// Compress JPEG, PNG and SVG files; copy everything else untouched.
///
/// Output is never larger than the input: when compression does not pay
/// off the original bytes are kept.
#[derive(Debug, Clone)]
pub struct ImageMin {
    jpeg_quality: u8,
    png_colors: usize,
    svg_preserve_viewbox: bool,
}

impl ImageMin {
    pub fn new(section: &ImageSection) -> Self {
        Self {
            jpeg_quality: section.jpeg_quality,
            png_colors: section.png_colors,
            svg_preserve_viewbox: section.svg_preserve_viewbox,
        }
    }
}

impl Transform for ImageMin {
    fn name(&self) -> &'static str {
        "imagemin"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let ext = artifact
            .rel_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let compressed = match ext.as_str() {
            "jpg" | "jpeg" => raster::recompress_jpeg(&artifact.contents, self.jpeg_quality)?,
            "png" => raster::quantize_png(&artifact.contents, self.png_colors)?,
            "svg" => svg::optimize(artifact.text()?, self.svg_preserve_viewbox)?.into_bytes(),
            _ => return Ok(artifact),
        };

        if compressed.len() < artifact.contents.len() {
            debug!(
                file = ?artifact.rel_path,
                before = artifact.contents.len(),
                after = compressed.len(),
                "image compressed"
            );
            artifact.contents = compressed;
        } else {
            debug!(file = ?artifact.rel_path, "compression did not pay off; keeping original");
        }
        Ok(artifact)
    }
}
