// src/transforms/image/raster.rs

//! JPEG re-encoding and PNG palette quantization.

use color_quant::NeuQuant;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};

use crate::pipeline::TransformError;

/// NeuQuant sampling factor: 1 is slowest/best, 30 fastest.
const NEUQUANT_SAMPLE: i32 = 10;
/// Below this many pixels every pixel is sampled.
const FULL_SAMPLE_BELOW: usize = 64 * 64;

fn codec(e: impl std::fmt::Display) -> TransformError {
    TransformError::codec(e.to_string())
}

/// Decode and re-encode as baseline JPEG at `quality` (1..=100).
pub fn recompress_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, TransformError> {
    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(codec)?
        .to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(codec)?;
    Ok(out)
}

/// Quantize to at most `colors` palette entries and encode as indexed PNG.
pub fn quantize_png(bytes: &[u8], colors: usize) -> Result<Vec<u8>, TransformError> {
    let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(codec)?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba.as_raw();

    let opaque = pixels.chunks_exact(4).all(|px| px[3] == u8::MAX);
    let sample = if pixels.len() / 4 < FULL_SAMPLE_BELOW { 1 } else { NEUQUANT_SAMPLE };
    let quant = NeuQuant::new(sample, colors, pixels);
    let map = quant.color_map_rgba();
    let indices: Vec<u8> = pixels
        .chunks_exact(4)
        .map(|px| quant.index_of(px) as u8)
        .collect();

    let palette: Vec<u8> = map.chunks_exact(4).flat_map(|c| [c[0], c[1], c[2]]).collect();
    let alpha: Vec<u8> = map.chunks_exact(4).map(|c| c[3]).collect();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(palette);
        if !opaque {
            encoder.set_trns(alpha);
        }
        let mut writer = encoder.write_header().map_err(codec)?;
        writer.write_image_data(&indices).map_err(codec)?;
        writer.finish().map_err(codec)?;
    }
    Ok(out)
}
