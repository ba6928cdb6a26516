//! Image resampler
//!
//! Turns embedded PDF image streams into decoded pixels and re-encodes them
//! as JPEG at a reduced scale and quality.

use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::ResampleError;

/// Color space of a re-encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    /// PDF name for the image dictionary
    pub fn pdf_name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// JPEG payload plus the metadata needed to rebuild an image XObject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampledImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
}

/// `floor(width * scale) x floor(height * scale)`
pub fn target_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        (width as f64 * scale).floor() as u32,
        (height as f64 * scale).floor() as u32,
    )
}

/// Resize by `scale` and re-encode at `quality`.
///
/// Returns `Ok(None)` when either scaled side would fall below
/// `min_dimension`; the caller keeps the original image in that case.
pub fn resample(
    image: &DynamicImage,
    scale: f64,
    quality: u8,
    min_dimension: u32,
) -> Result<Option<ResampledImage>, ResampleError> {
    if !(scale > 0.0 && scale <= 1.0) {
        return Err(ResampleError::InvalidScale(scale));
    }

    let (width, height) = target_dimensions(image.width(), image.height(), scale);
    if width < min_dimension || height < min_dimension {
        return Ok(None);
    }

    let resized = if (width, height) == (image.width(), image.height()) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image.resize_exact(width, height, FilterType::Lanczos3))
    };

    let quality = quality.clamp(1, 100);

    // Grayscale stays grayscale, everything else is normalized to RGB
    let (data, color_space) = if resized.color().has_color() {
        let rgb = resized.to_rgb8();
        let data = encode_jpeg(rgb.as_raw(), width, height, ExtendedColorType::Rgb8, quality)?;
        (data, ColorSpace::Rgb)
    } else {
        let gray = resized.to_luma8();
        let data = encode_jpeg(gray.as_raw(), width, height, ExtendedColorType::L8, quality)?;
        (data, ColorSpace::Gray)
    };

    Ok(Some(ResampledImage {
        data,
        width,
        height,
        color_space,
    }))
}

/// Baseline JPEG encode of tightly packed samples
pub(crate) fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_type: ExtendedColorType,
    quality: u8,
) -> Result<Vec<u8>, ResampleError> {
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality)
        .write_image(pixels, width, height, color_type)
        .map_err(|e| ResampleError::Encode(e.to_string()))?;
    Ok(output)
}

/// Stencil masks carry no color samples and are never re-encoded
pub fn is_stencil_mask(dict: &Dictionary) -> bool {
    dict.get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
}

/// Decode an image XObject stream into pixels.
pub fn decode_pdf_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, ResampleError> {
    let dict = &stream.dict;
    let width = dict.get(b"Width").and_then(Object::as_i64).unwrap_or(0);
    let height = dict.get(b"Height").and_then(Object::as_i64).unwrap_or(0);
    if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
        return Err(ResampleError::InvalidDimensions(width, height));
    }
    let (width, height) = (width as u32, height as u32);

    if dict.has(b"Decode") {
        return Err(ResampleError::DecodeArray);
    }

    let filters = filter_names(dict);
    let samples = match filters.last().map(String::as_str) {
        Some("DCTDecode") if filters.len() == 1 => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|e| ResampleError::Decode(e.to_string()));
        }
        Some(filter @ ("DCTDecode" | "JPXDecode" | "CCITTFaxDecode" | "JBIG2Decode")) => {
            return Err(ResampleError::UnsupportedFilter(filter.to_string()));
        }
        Some(_) => stream
            .decompressed_content()
            .map_err(|e| ResampleError::Decode(e.to_string()))?,
        None => stream.content.clone(),
    };

    let components = match dict.get(b"ColorSpace") {
        Ok(color_space) => color_components(doc, color_space)?,
        Err(_) => return Err(ResampleError::UnsupportedColorSpace("missing".to_string())),
    };
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);

    samples_to_image(&samples, width, height, components, bits)
}

fn samples_to_image(
    samples: &[u8],
    width: u32,
    height: u32,
    components: u8,
    bits: i64,
) -> Result<DynamicImage, ResampleError> {
    let invalid = || ResampleError::InvalidDimensions(width as i64, height as i64);
    let pixels = (width as usize).checked_mul(height as usize).ok_or_else(invalid)?;

    if bits == 1 && components == 1 {
        let row_bytes = (width as usize).div_ceil(8);
        let expected = row_bytes.checked_mul(height as usize).ok_or_else(invalid)?;
        if samples.len() < expected {
            return Err(ResampleError::SampleLayout {
                bits,
                len: samples.len(),
                expected,
            });
        }
        let gray = GrayImage::from_fn(width, height, |x, y| {
            let byte = samples[y as usize * row_bytes + x as usize / 8];
            let bit = (byte >> (7 - (x % 8))) & 1;
            image::Luma([if bit == 1 { 255 } else { 0 }])
        });
        return Ok(DynamicImage::ImageLuma8(gray));
    }

    let expected = pixels.checked_mul(components as usize).ok_or_else(invalid)?;
    if bits != 8 || samples.len() < expected {
        return Err(ResampleError::SampleLayout {
            bits,
            len: samples.len(),
            expected,
        });
    }
    let samples = &samples[..expected];
    let layout_error = || ResampleError::SampleLayout {
        bits,
        len: samples.len(),
        expected,
    };

    match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(layout_error),
        3 => RgbImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(layout_error),
        4 => {
            let rgb: Vec<u8> = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(layout_error)
        }
        other => Err(ResampleError::UnsupportedColorSpace(format!(
            "{} components",
            other
        ))),
    }
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u32;
    let channel = |v: u8| ((255 - v as u32) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

/// Number of color components for a /ColorSpace value
fn color_components(doc: &Document, color_space: &Object) -> Result<u8, ResampleError> {
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
            b"DeviceCMYK" | b"CMYK" => Ok(4),
            other => Err(ResampleError::UnsupportedColorSpace(
                String::from_utf8_lossy(other).into_owned(),
            )),
        },
        Object::Array(items) => match items.first() {
            Some(Object::Name(family)) if family == b"ICCBased" => {
                let profile = items
                    .get(1)
                    .and_then(|o| o.as_reference().ok())
                    .and_then(|id| doc.get_object(id).ok())
                    .and_then(|o| o.as_stream().ok())
                    .ok_or_else(|| {
                        ResampleError::UnsupportedColorSpace("ICCBased without profile".to_string())
                    })?;
                match profile.dict.get(b"N").and_then(Object::as_i64) {
                    Ok(n @ (1 | 3 | 4)) => Ok(n as u8),
                    _ => Err(ResampleError::UnsupportedColorSpace(
                        "ICCBased component count".to_string(),
                    )),
                }
            }
            Some(Object::Name(family)) if family == b"CalGray" => Ok(1),
            Some(Object::Name(family)) if family == b"CalRGB" => Ok(3),
            Some(Object::Name(family)) => Err(ResampleError::UnsupportedColorSpace(
                String::from_utf8_lossy(family).into_owned(),
            )),
            _ => Err(ResampleError::UnsupportedColorSpace("empty array".to_string())),
        },
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(resolved) => color_components(doc, resolved),
            Err(e) => Err(ResampleError::UnsupportedColorSpace(e.to_string())),
        },
        _ => Err(ResampleError::UnsupportedColorSpace(
            "unexpected object".to_string(),
        )),
    }
}

/// Filter names in application order
fn filter_names(dict: &Dictionary) -> Vec<String> {
    let name = |o: &Object| match o {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    };

    match dict.get(b"Filter") {
        Ok(Object::Array(filters)) => filters.iter().filter_map(name).collect(),
        Ok(filter) => name(filter).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}
