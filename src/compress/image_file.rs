//! Standalone raster image compression
//!
//! Flattens transparency onto white and re-encodes as JPEG at falling
//! quality until the output fits the target.

use image::{DynamicImage, ExtendedColorType, RgbImage};

use super::resample::encode_jpeg;
use crate::config::defaults::FLATTEN_BACKGROUND;
use crate::config::Settings;
use crate::document::{megabytes, DocumentHandle};
use crate::error::CompressError;

/// JPEG output of [`compress_image`]
#[derive(Debug, Clone)]
pub struct ImageCompressionResult {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub size: u64,
    pub target_size: Option<u64>,
    /// Quality of the returned encoding
    pub quality: u8,
}

impl ImageCompressionResult {
    pub fn met_target(&self) -> bool {
        self.target_size.map_or(true, |target| self.size <= target)
    }
}

/// Re-encode an image as JPEG, seeking `target_mb` when given.
///
/// Without a target a single encode at the starting quality is made. When
/// the sweep bottoms out the lowest-quality encoding is returned.
pub fn compress_image(
    input: &DocumentHandle,
    target_mb: Option<f64>,
    settings: &Settings,
) -> Result<ImageCompressionResult, CompressError> {
    let original = input.read_bytes()?;
    let original_size = original.len() as u64;

    let image =
        image::load_from_memory(&original).map_err(|e| CompressError::ImageDecode(e.to_string()))?;
    drop(original);

    let rgb = flatten_to_rgb(&image);
    let (width, height) = rgb.dimensions();

    let target_size = target_mb.map(|mb| settings.target_bytes(original_size, Some(mb)));
    let qualities = match target_size {
        Some(_) => settings.image_quality_sweep(),
        None => vec![settings.image_quality.clamp(1, 100)],
    };

    let mut encoded: Option<(Vec<u8>, u8)> = None;
    for quality in qualities {
        let data = encode_jpeg(rgb.as_raw(), width, height, ExtendedColorType::Rgb8, quality)
            .map_err(|e| CompressError::ImageEncode(e.to_string()))?;
        log::debug!("Image at quality {} is {} bytes", quality, data.len());

        let fits = target_size.is_some_and(|target| data.len() as u64 <= target);
        encoded = Some((data, quality));
        if fits {
            break;
        }
    }

    let (data, quality) =
        encoded.ok_or_else(|| CompressError::ImageEncode("no quality levels to try".to_string()))?;

    let result = ImageCompressionResult {
        size: data.len() as u64,
        data,
        original_size,
        target_size,
        quality,
    };

    log::info!(
        "Image compressed from {:.2} MB to {:.2} MB at quality {}",
        megabytes(original_size),
        megabytes(result.size),
        quality
    );
    if !result.met_target() {
        log::warn!("Image target not reached; returning quality {}", quality);
    }

    Ok(result)
}

/// Composite any alpha channel onto the flatten background and drop it
pub fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8, background: u8| {
            let alpha = a as u32;
            ((channel as u32 * alpha + background as u32 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([
            blend(r, FLATTEN_BACKGROUND[0]),
            blend(g, FLATTEN_BACKGROUND[1]),
            blend(b, FLATTEN_BACKGROUND[2]),
        ])
    })
}
