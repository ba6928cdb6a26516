//! Lossless structural pass
//!
//! Re-serializes a PDF without touching image content: empty streams and
//! unreferenced objects are dropped, objects are renumbered, and every
//! stream that isn't compressed yet gets Flate.

use crate::document::{load_pdf, save_pdf};
use crate::error::CompressError;

/// Compress PDF structure and return the re-serialized bytes.
pub fn structural_pass(input: &[u8]) -> Result<Vec<u8>, CompressError> {
    let mut doc = load_pdf(input)?;
    optimize_structure(&mut doc);
    save_pdf(&mut doc)
}

/// In-place structural cleanup, shared with the lossy attempts
pub fn optimize_structure(doc: &mut lopdf::Document) {
    let empty = doc.delete_zero_length_streams();
    let pruned = doc.prune_objects();
    doc.renumber_objects();
    doc.compress();

    log::debug!(
        "Structural cleanup removed {} empty streams and {} unreferenced objects",
        empty.len(),
        pruned.len()
    );
}
