//! Ghostscript-backed rasterizing compressor
//!
//! Ghostscript's pdfwrite device re-renders embedded images at a fixed
//! resolution. The adapter sweeps that resolution downward and stops at the
//! first output that fits the target, otherwise it keeps the smallest one.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::defaults::PDF_COMPATIBILITY_LEVEL;
use crate::config::Settings;
use crate::error::ToolError;

/// Outcome of handing a document to an external compressor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalOutcome {
    /// Smallest output produced, and the resolution that produced it
    Compressed { data: Vec<u8>, dpi: u32 },
    /// No tool on this machine
    Unavailable,
    /// A tool was found but no invocation produced output
    Failed(String),
}

/// A compressor that runs outside the process
pub trait ExternalCompressor {
    fn name(&self) -> &str;

    fn compress(&self, input: &[u8], target_size: u64) -> ExternalOutcome;
}

/// Ghostscript driver with a descending DPI sweep
#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: Option<PathBuf>,
    sweep: Vec<u32>,
}

impl Ghostscript {
    pub fn new(program: PathBuf, sweep: Vec<u32>) -> Self {
        Self {
            program: Some(program),
            sweep,
        }
    }

    /// Use the configured executable, or the first candidate found on PATH
    pub fn from_settings(settings: &Settings) -> Self {
        let program = match settings.ghostscript_path {
            Some(ref path) => Some(path.clone()),
            None => find_ghostscript(&settings.ghostscript_commands),
        };

        if let Some(ref program) = program {
            log::debug!("Using Ghostscript at {}", program.display());
        }

        Self {
            program,
            sweep: settings.dpi_sweep(),
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Resolutions this driver will try, highest first
    pub fn sweep(&self) -> &[u32] {
        &self.sweep
    }
}

impl ExternalCompressor for Ghostscript {
    fn name(&self) -> &str {
        "ghostscript"
    }

    fn compress(&self, input: &[u8], target_size: u64) -> ExternalOutcome {
        let Some(ref program) = self.program else {
            log::warn!("Ghostscript not found, skipping rasterizing pass");
            return ExternalOutcome::Unavailable;
        };

        match run_sweep(program, &self.sweep, input, target_size) {
            Ok(Some((data, dpi))) => ExternalOutcome::Compressed { data, dpi },
            Ok(None) => ExternalOutcome::Failed(format!(
                "{} produced no output at any resolution",
                program.display()
            )),
            Err(e) => ExternalOutcome::Failed(e.to_string()),
        }
    }
}

/// Search PATH for the first available candidate
pub fn find_ghostscript<S: AsRef<str>>(candidates: &[S]) -> Option<PathBuf> {
    candidates
        .iter()
        .find_map(|name| which::which(name.as_ref()).ok())
}

/// Arguments for one pdfwrite run at `dpi`
pub fn ghostscript_args(dpi: u32, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-sDEVICE=pdfwrite".to_string(),
        format!("-dCompatibilityLevel={}", PDF_COMPATIBILITY_LEVEL),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-dBATCH".to_string(),
        "-dSAFER".to_string(),
        "-dDownsampleColorImages=true".to_string(),
        format!("-dColorImageResolution={}", dpi),
        "-dDownsampleGrayImages=true".to_string(),
        format!("-dGrayImageResolution={}", dpi),
        "-dDownsampleMonoImages=true".to_string(),
        format!("-dMonoImageResolution={}", dpi),
        format!("-sOutputFile={}", output.display()),
        input.display().to_string(),
    ]
}

/// Run the sweep inside a scratch directory that is removed on return.
///
/// Returns the first output at or under `target_size`, else the smallest one.
fn run_sweep(
    program: &Path,
    sweep: &[u32],
    input: &[u8],
    target_size: u64,
) -> Result<Option<(Vec<u8>, u32)>, ToolError> {
    let scratch = tempfile::tempdir()?;
    let input_path = scratch.path().join("input.pdf");
    fs::write(&input_path, input)?;

    let mut best: Option<(PathBuf, u64, u32)> = None;

    for &dpi in sweep {
        let output_path = scratch.path().join(format!("output-{}.pdf", dpi));

        let size = match run_step(program, dpi, &input_path, &output_path) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("Ghostscript step at {} DPI failed: {}", dpi, e);
                let _ = fs::remove_file(&output_path);
                continue;
            }
        };

        log::debug!("Ghostscript at {} DPI produced {} bytes", dpi, size);

        match best {
            Some((_, best_size, _)) if size >= best_size => discard(&output_path),
            _ => {
                if let Some((previous, _, _)) = best.take() {
                    discard(&previous);
                }
                best = Some((output_path, size, dpi));
            }
        }

        if size <= target_size {
            break;
        }
    }

    match best {
        Some((path, _, dpi)) => Ok(Some((fs::read(path)?, dpi))),
        None => Ok(None),
    }
}

/// Remove a superseded step output; the scratch directory catches leftovers
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::debug!("Could not remove {}: {}", path.display(), e);
    }
}

/// One Ghostscript invocation; returns the output size
fn run_step(program: &Path, dpi: u32, input: &Path, output: &Path) -> Result<u64, ToolError> {
    let result = Command::new(program)
        .args(ghostscript_args(dpi, input, output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    if !result.status.success() {
        return Err(ToolError::Exit {
            program: program.to_path_buf(),
            status: result.status,
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }

    match fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        _ => Err(ToolError::MissingOutput(output.to_path_buf())),
    }
}
