use std::path::PathBuf;

use crate::error::OutputError;

pub mod document;
pub mod file;

pub use document::{Fragment, OutputDocument};
pub use file::FileChunkWriter;

/// Persists accumulated output documents
pub trait ChunkWriter {
    /// Write `document` as the chunk with the given zero-based sequence
    /// number and return the path it was written to. The document must be
    /// completely written (and any handle closed) when this returns.
    fn write_chunk(
        &mut self,
        document: &OutputDocument,
        sequence_number: usize,
    ) -> Result<PathBuf, OutputError>;
}
