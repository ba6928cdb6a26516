//! Compression orchestrator
//!
//! Runs the structural pass, then the external compressor, then walks the
//! attempt table, keeping the smallest serialized document seen. Lossy
//! attempts always start from the same baseline so artifacts never stack.

use std::fmt;

use crate::config::Settings;
use crate::document::{load_pdf, megabytes, save_pdf, DocumentHandle};
use crate::error::CompressError;

use super::attempts::CompressionAttempt;
use super::downsample::downsample_all_images;
use super::external::{ExternalCompressor, ExternalOutcome, Ghostscript};
use super::structural::{optimize_structure, structural_pass};

/// Which pass produced the returned bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Original,
    Structural,
    External { dpi: u32 },
    Downsampled { scale: f64, quality: u8 },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Original => write!(f, "original"),
            Stage::Structural => write!(f, "structural"),
            Stage::External { dpi } => write!(f, "ghostscript at {} DPI", dpi),
            Stage::Downsampled { scale, quality } => {
                write!(f, "downsampled at scale {} quality {}", scale, quality)
            }
        }
    }
}

/// Best document produced by one call
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub size: u64,
    pub target_size: u64,
    pub stage: Stage,
    /// Lossy table attempts actually run
    pub attempts_run: usize,
}

impl CompressionResult {
    pub fn met_target(&self) -> bool {
        self.size <= self.target_size
    }

    /// Fraction of the original size saved, 0.0-1.0
    pub fn reduction(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.size as f64 / self.original_size as f64
    }
}

struct Candidate {
    data: Vec<u8>,
    stage: Stage,
}

impl Candidate {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Adopt `data` when strictly smaller; returns whether it was adopted
    fn offer(&mut self, data: Vec<u8>, stage: Stage) -> bool {
        if (data.len() as u64) < self.size() {
            log::info!(
                "{} reduced size to {} bytes ({:.2} MB)",
                stage,
                data.len(),
                megabytes(data.len() as u64)
            );
            self.data = data;
            self.stage = stage;
            true
        } else {
            log::debug!(
                "{} produced {} bytes, not smaller than {}",
                stage,
                data.len(),
                self.size()
            );
            false
        }
    }
}

/// Target-seeking PDF compressor
pub struct PdfCompressor {
    settings: Settings,
    external: Option<Box<dyn ExternalCompressor>>,
}

impl PdfCompressor {
    /// Create a compressor; Ghostscript is discovered when enabled in `settings`
    pub fn new(settings: Settings) -> Self {
        let external: Option<Box<dyn ExternalCompressor>> = if settings.use_external {
            Some(Box::new(Ghostscript::from_settings(&settings)))
        } else {
            None
        };

        Self { settings, external }
    }

    pub fn with_external(mut self, external: Box<dyn ExternalCompressor>) -> Self {
        self.external = Some(external);
        self
    }

    pub fn without_external(mut self) -> Self {
        self.external = None;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shrink `input` toward `target_mb` (default: a fraction of its size).
    ///
    /// Only fails when the input cannot be read or parsed; an unreachable
    /// target yields the smallest document found.
    pub fn compress(
        &self,
        input: &DocumentHandle,
        target_mb: Option<f64>,
    ) -> Result<CompressionResult, CompressError> {
        let original = input.read_bytes()?;
        let original_size = original.len() as u64;
        let target_size = self.settings.target_bytes(original_size, target_mb);

        log::info!(
            "Compressing {} bytes ({:.2} MB) toward {} bytes ({:.2} MB)",
            original_size,
            megabytes(original_size),
            target_size,
            megabytes(target_size)
        );

        let mut attempts_run = 0;
        let mut best = Candidate {
            data: original,
            stage: Stage::Original,
        };

        match structural_pass(&best.data) {
            Ok(data) => {
                best.offer(data, Stage::Structural);
            }
            Err(CompressError::Load(e)) => return Err(CompressError::Load(e)),
            Err(e) => log::warn!("Structural pass failed: {}", e),
        }

        if best.size() <= target_size {
            return Ok(self.finish(best, original_size, target_size, attempts_run));
        }

        if let Some(ref external) = self.external {
            match external.compress(&best.data, target_size) {
                ExternalOutcome::Compressed { data, dpi } => {
                    best.offer(data, Stage::External { dpi });
                }
                ExternalOutcome::Unavailable => {
                    log::info!("{} unavailable, using in-process passes only", external.name())
                }
                ExternalOutcome::Failed(reason) => {
                    log::warn!("{} failed: {}", external.name(), reason)
                }
            }

            if best.size() <= target_size {
                return Ok(self.finish(best, original_size, target_size, attempts_run));
            }
        }

        let baseline = best.data.clone();
        let attempts = &self.settings.attempts;
        let start = self.settings.start_heuristic.start_index(
            baseline.len() as u64,
            target_size,
            attempts.len(),
        );
        log::debug!("Starting refinement at attempt {} of {}", start, attempts.len());

        for attempt in attempts.iter().skip(start) {
            if !attempt.is_valid() {
                log::warn!("Skipping invalid attempt {:?}", attempt);
                continue;
            }
            attempts_run += 1;

            let data = match self.lossy_attempt(&baseline, *attempt) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Attempt {:?} failed: {}", attempt, e);
                    continue;
                }
            };

            let stage = Stage::Downsampled {
                scale: attempt.scale,
                quality: attempt.quality,
            };
            if best.offer(data, stage) && best.size() <= target_size {
                break;
            }
        }

        Ok(self.finish(best, original_size, target_size, attempts_run))
    }

    /// Downsample a fresh copy of `baseline` and serialize it
    fn lossy_attempt(
        &self,
        baseline: &[u8],
        attempt: CompressionAttempt,
    ) -> Result<Vec<u8>, CompressError> {
        let mut doc = load_pdf(baseline)?;
        let stats = downsample_all_images(&mut doc, attempt, self.settings.min_image_dimension);
        log::debug!(
            "Attempt scale {} quality {} changed {} of {} images",
            attempt.scale,
            attempt.quality,
            stats.images_changed,
            stats.images_seen
        );
        optimize_structure(&mut doc);
        save_pdf(&mut doc)
    }

    fn finish(
        &self,
        best: Candidate,
        original_size: u64,
        target_size: u64,
        attempts_run: usize,
    ) -> CompressionResult {
        let result = CompressionResult {
            size: best.size(),
            data: best.data,
            original_size,
            target_size,
            stage: best.stage,
            attempts_run,
        };

        if result.met_target() {
            log::info!("Met target with {} ({} bytes)", result.stage, result.size);
        } else {
            log::warn!(
                "Target {} bytes not reached; best effort is {} bytes from {}",
                target_size,
                result.size,
                result.stage
            );
        }

        result
    }
}
