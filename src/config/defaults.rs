/// Bytes per megabyte used for every size target (binary megabyte)
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Target as a fraction of the original size when none is requested
pub const DEFAULT_TARGET_RATIO: f64 = 0.75;

/// Executables probed on PATH, in order
pub const GHOSTSCRIPT_COMMANDS: &[&str] = &["gswin64c", "gswin32c", "gs"];

/// First resolution of the Ghostscript sweep (DPI)
pub const DEFAULT_DPI_START: u32 = 200;

/// Decrement between sweep steps (DPI)
pub const DEFAULT_DPI_STEP: u32 = 25;

/// Lowest resolution the sweep may reach (DPI, inclusive)
pub const DEFAULT_DPI_MIN: u32 = 72;

/// Compatibility level passed to the pdfwrite device
pub const PDF_COMPATIBILITY_LEVEL: &str = "1.4";

/// Resampled images smaller than this on either side are left untouched
pub const MIN_IMAGE_DIMENSION: u32 = 10;

/// Size ratio above which refinement starts near the aggressive end
pub const DEFAULT_AGGRESSIVE_RATIO: f64 = 5.0;

/// Attempt index used when the aggressive ratio is exceeded
pub const DEFAULT_AGGRESSIVE_START: usize = 9;

/// Size ratio above which refinement skips the mildest attempts
pub const DEFAULT_MODERATE_RATIO: f64 = 2.0;

/// Attempt index used when the moderate ratio is exceeded
pub const DEFAULT_MODERATE_START: usize = 3;

/// JPEG quality of the first standalone image encode
pub const DEFAULT_IMAGE_QUALITY: u8 = 85;

/// Quality decrement between standalone image encodes
pub const DEFAULT_IMAGE_QUALITY_STEP: u8 = 5;

/// Lowest quality the standalone image sweep may reach
pub const DEFAULT_IMAGE_MIN_QUALITY: u8 = 10;

/// Background used when flattening transparency before JPEG encoding
pub const FLATTEN_BACKGROUND: [u8; 3] = [255, 255, 255];
