pub mod cli;
pub mod compress;
pub mod config;
pub mod document;
pub mod error;

pub use cli::InputKind;
pub use compress::{
    compress_image, CompressionAttempt, CompressionResult, ExternalCompressor, ExternalOutcome,
    ImageCompressionResult, PdfCompressor, Stage,
};
pub use config::Settings;
pub use document::DocumentHandle;
pub use error::{CompressError, ResampleError, ToolError};

/// High-level API for shrinking a PDF.
///
/// This is the recommended entry point for library consumers. It runs the
/// structural pass, Ghostscript when installed, and the in-process
/// downsampling attempts with default settings.
///
/// # Arguments
///
/// * `input` - The PDF, as bytes or as a path
/// * `target_mb` - Desired size in megabytes; `None` aims for 75% of the input
///
/// # Returns
///
/// The smallest document found, or a CompressError when the input cannot be
/// read or parsed. The target is advisory: check `met_target()`.
///
/// # Example
///
/// ```no_run
/// use pdf_squeeze::{compress_pdf, DocumentHandle};
///
/// let input = DocumentHandle::from_path("scan.pdf");
/// let result = compress_pdf(&input, Some(2.0)).unwrap();
///
/// println!("{} -> {} bytes via {}", result.original_size, result.size, result.stage);
/// std::fs::write("scan_small.pdf", &result.data).unwrap();
/// ```
pub fn compress_pdf(
    input: &DocumentHandle,
    target_mb: Option<f64>,
) -> Result<CompressionResult, CompressError> {
    PdfCompressor::new(Settings::default()).compress(input, target_mb)
}
