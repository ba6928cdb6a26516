//! Document handles and serialization helpers
//!
//! A document reaches the compressor either as an in-memory buffer or as a
//! path on disk. Both are serialized forms, so their size is the real size.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defaults::BYTES_PER_MB;
use crate::error::CompressError;

/// A document backed by bytes or by a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentHandle {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl DocumentHandle {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        DocumentHandle::Path(path.as_ref().to_path_buf())
    }

    /// Serialized size in bytes
    pub fn size(&self) -> Result<u64, CompressError> {
        match self {
            DocumentHandle::Bytes(bytes) => Ok(bytes.len() as u64),
            DocumentHandle::Path(path) => Ok(fs::metadata(path)?.len()),
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, CompressError> {
        match self {
            DocumentHandle::Bytes(bytes) => Ok(bytes.clone()),
            DocumentHandle::Path(path) => Ok(fs::read(path)?),
        }
    }
}

impl From<Vec<u8>> for DocumentHandle {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentHandle::Bytes(bytes)
    }
}

impl From<PathBuf> for DocumentHandle {
    fn from(path: PathBuf) -> Self {
        DocumentHandle::Path(path)
    }
}

/// Parse PDF bytes into an editable object graph
pub fn load_pdf(bytes: &[u8]) -> Result<lopdf::Document, CompressError> {
    lopdf::Document::load_mem(bytes).map_err(|e| CompressError::Load(e.to_string()))
}

/// Serialize a document into a fresh buffer
pub fn save_pdf(doc: &mut lopdf::Document) -> Result<Vec<u8>, CompressError> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| CompressError::Save(e.to_string()))?;
    Ok(output)
}

/// Human-readable megabytes for log lines
pub fn megabytes(size: u64) -> f64 {
    size as f64 / BYTES_PER_MB
}
