//! Adaptive size reduction for PDFs and raster images

pub mod attempts;
pub mod downsample;
pub mod external;
pub mod image_file;
pub mod orchestrator;
pub mod resample;
pub mod structural;

pub use attempts::{CompressionAttempt, StartHeuristic, DEFAULT_ATTEMPTS};
pub use downsample::{downsample_all_images, DownsampleStats};
pub use external::{ExternalCompressor, ExternalOutcome, Ghostscript};
pub use image_file::{compress_image, ImageCompressionResult};
pub use orchestrator::{CompressionResult, PdfCompressor, Stage};
pub use resample::{resample, ColorSpace, ResampledImage};
pub use structural::structural_pass;
