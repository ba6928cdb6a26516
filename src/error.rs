use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to parse PDF: {0}")]
    Load(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-image failures inside a downsampling pass. Never fatal to the pass.
#[derive(Error, Debug)]
pub enum ResampleError {
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported color space: {0}")]
    UnsupportedColorSpace(String),

    #[error("Unsupported sample layout: {bits} bits, {len} bytes (expected {expected})")]
    SampleLayout {
        bits: i64,
        len: usize,
        expected: usize,
    },

    #[error("Invalid image dimensions: {0}x{1}")]
    InvalidDimensions(i64, i64),

    #[error("Explicit /Decode arrays are not supported")]
    DecodeArray,

    #[error("Scale factor {0} outside (0, 1]")]
    InvalidScale(f64),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),
}

/// Failure of a single external tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("No output produced at {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
