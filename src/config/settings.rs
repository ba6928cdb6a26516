use std::path::PathBuf;

use crate::cli::Args;
use crate::compress::attempts::{CompressionAttempt, StartHeuristic, DEFAULT_ATTEMPTS};

use super::defaults::*;

/// Runtime settings for one compression run
#[derive(Debug, Clone)]
pub struct Settings {
    // Target derivation
    pub default_target_ratio: f64,

    // External compressor
    pub use_external: bool,
    /// Explicit executable; when set, PATH discovery is skipped
    pub ghostscript_path: Option<PathBuf>,
    pub ghostscript_commands: Vec<String>,
    pub dpi_start: u32,
    pub dpi_step: u32,
    pub dpi_min: u32,

    // In-process refinement
    pub attempts: Vec<CompressionAttempt>,
    pub start_heuristic: StartHeuristic,
    pub min_image_dimension: u32,

    // Standalone images
    pub image_quality: u8,
    pub image_quality_step: u8,
    pub image_min_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_target_ratio: DEFAULT_TARGET_RATIO,

            use_external: true,
            ghostscript_path: None,
            ghostscript_commands: GHOSTSCRIPT_COMMANDS.iter().map(|s| s.to_string()).collect(),
            dpi_start: DEFAULT_DPI_START,
            dpi_step: DEFAULT_DPI_STEP,
            dpi_min: DEFAULT_DPI_MIN,

            attempts: DEFAULT_ATTEMPTS.to_vec(),
            start_heuristic: StartHeuristic::default(),
            min_image_dimension: MIN_IMAGE_DIMENSION,

            image_quality: DEFAULT_IMAGE_QUALITY,
            image_quality_step: DEFAULT_IMAGE_QUALITY_STEP,
            image_min_quality: DEFAULT_IMAGE_MIN_QUALITY,
        }
    }
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &Args) -> Self {
        Self {
            use_external: !args.no_external,
            ghostscript_path: args.ghostscript.clone(),
            ..Default::default()
        }
    }

    /// Resolutions visited by the Ghostscript sweep, highest first
    pub fn dpi_sweep(&self) -> Vec<u32> {
        if self.dpi_step == 0 || self.dpi_start < self.dpi_min {
            return vec![self.dpi_start.max(self.dpi_min)];
        }
        (self.dpi_min..=self.dpi_start)
            .rev()
            .step_by(self.dpi_step as usize)
            .collect()
    }

    /// Qualities visited by the standalone image sweep, highest first
    pub fn image_quality_sweep(&self) -> Vec<u8> {
        let floor = self.image_min_quality.max(1);
        let start = self.image_quality.clamp(floor, 100);
        if self.image_quality_step == 0 {
            return vec![start];
        }
        (floor..=start)
            .rev()
            .step_by(self.image_quality_step as usize)
            .collect()
    }

    /// Target in bytes: the requested megabytes, or a fraction of the original
    pub fn target_bytes(&self, original_size: u64, target_mb: Option<f64>) -> u64 {
        match target_mb {
            Some(mb) if mb.is_finite() && mb > 0.0 => (mb * BYTES_PER_MB).floor() as u64,
            Some(_) => 0,
            None => (original_size as f64 * self.default_target_ratio).floor() as u64,
        }
    }
}
