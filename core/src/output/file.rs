use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    error::OutputError,
    output::{ChunkWriter, OutputDocument},
};

/// Writes every chunk to its own file `{base_name}.{sequence_number}.part`
/// in a destination directory. The directory is not created. Existing files
/// with the same name are overwritten. A file that could not be written
/// completely is removed again.
#[derive(Debug, Clone)]
pub struct FileChunkWriter {
    directory: PathBuf,
    base_name: String,
}

impl FileChunkWriter {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }

    /// The path of the chunk file with the given sequence number
    pub fn path_for(&self, sequence_number: usize) -> PathBuf {
        self.directory
            .join(format!("{}.{}.part", self.base_name, sequence_number))
    }
}

/// Create `path` and write `document` into it. The file is closed when this
/// returns.
fn write_file(path: &Path, document: &OutputDocument) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    document.write_to(&mut writer)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}

impl ChunkWriter for FileChunkWriter {
    fn write_chunk(
        &mut self,
        document: &OutputDocument,
        sequence_number: usize,
    ) -> Result<PathBuf, OutputError> {
        let path = self.path_for(sequence_number);
        match write_file(&path, document) {
            Ok(()) => {
                debug!(
                    "wrote {} elements to `{}'",
                    document.len(),
                    path.display()
                );
                Ok(path)
            }
            Err(source) => {
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("unable to remove incomplete chunk `{}': {e}", path.display());
                    }
                }
                Err(OutputError { path, source })
            }
        }
    }
}
