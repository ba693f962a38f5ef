use std::{
    fs::File,
    io::Read,
    mem,
    path::{Path, PathBuf},
    time::Instant,
};

use log::{debug, info, trace};

use crate::{
    cancel::CancellationToken,
    config::SplitConfig,
    error::{InputError, SplitError},
    input::xml::StreamTokenizer,
    output::{ChunkWriter, FileChunkWriter, Fragment, OutputDocument},
};

/// A chunk file written by a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Zero-based position of the file in the split's output
    pub sequence_number: usize,

    pub path: PathBuf,

    /// Number of elements in the file
    pub fragment_count: usize,
}

/// The files written by a split, in the order they were written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitResult {
    files: Vec<OutputFile>,
}

impl SplitResult {
    pub fn files(&self) -> &[OutputFile] {
        &self.files
    }

    pub fn file_paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    pub fn into_file_paths(self) -> Vec<PathBuf> {
        self.files.into_iter().map(|f| f.path).collect()
    }

    /// Total number of elements over all files
    pub fn fragment_count(&self) -> usize {
        self.files.iter().map(|f| f.fragment_count).sum()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// States of the split loop. Cancellation and failure end the loop with an
/// error instead of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the next element to capture
    Scanning,

    /// The cursor points to an element that should be captured
    Matched,

    /// The current document is full and has to be written
    FlushPending,

    /// The end of the input has been reached
    Done,
}

/// Drives a [`StreamTokenizer`] over an XML stream, collects every element
/// with the configured name and hands full documents to a [`ChunkWriter`]
pub struct Splitter<'a, R, W> {
    tokenizer: StreamTokenizer<R>,
    writer: W,
    config: &'a SplitConfig,
    cancel: &'a CancellationToken,

    /// Name of the input, used in error messages
    source: PathBuf,

    document: OutputDocument,
    files: Vec<OutputFile>,
}

impl<'a, R: Read, W: ChunkWriter> Splitter<'a, R, W> {
    pub fn new(
        source: impl Into<PathBuf>,
        input: R,
        writer: W,
        config: &'a SplitConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            tokenizer: StreamTokenizer::new(input)
                .inherit_namespaces(config.inherit_namespaces())
                .with_cancellation(cancel.clone()),
            writer,
            config,
            cancel,
            source: source.into(),
            document: OutputDocument::new(config.output_root_element_name()),
            files: Vec::new(),
        }
    }

    /// Run the split to the end of the input.
    ///
    /// # Errors
    /// Stops at the first error or when cancellation is observed. Chunks
    /// written before that stay where they are; elements collected for the
    /// next chunk are dropped.
    pub fn run(mut self) -> Result<SplitResult, SplitError> {
        let mut state = State::Scanning;
        while state != State::Done {
            state = match state {
                State::Scanning => self.scan()?,
                State::Matched => self.capture()?,
                State::FlushPending => {
                    self.flush()?;
                    self.classify()
                }
                State::Done => State::Done,
            };
        }

        // leftover elements go into one last, smaller chunk
        if !self.document.is_empty() {
            self.flush()?;
        }

        Ok(SplitResult { files: self.files })
    }

    /// Advance to the next token
    fn scan(&mut self) -> Result<State, SplitError> {
        self.cancel.check()?;
        self.tokenizer
            .advance()
            .map_err(|source| input_error(&self.source, source))?;
        Ok(self.classify())
    }

    /// Decide what to do with the token the cursor points to. Called after
    /// every advance and after every capture, since a capture leaves the
    /// cursor on the following token, which may be a sibling to capture.
    fn classify(&self) -> State {
        if self.tokenizer.is_eof() {
            State::Done
        } else if self
            .tokenizer
            .is_element_start(self.config.target_element_name())
        {
            State::Matched
        } else {
            State::Scanning
        }
    }

    /// Capture the current element and add it to the current document
    fn capture(&mut self) -> Result<State, SplitError> {
        self.cancel.check()?;
        let fragment = self
            .tokenizer
            .capture_current()
            .and_then(Fragment::try_from)
            .map_err(|source| input_error(&self.source, source))?;
        self.document.append(fragment);
        trace!(
            "collected element {} of {}",
            self.document.len(),
            self.config.max_element_count()
        );

        if self.document.len() >= self.config.max_element_count() {
            Ok(State::FlushPending)
        } else {
            Ok(self.classify())
        }
    }

    /// Write the current document and start a new one
    fn flush(&mut self) -> Result<(), SplitError> {
        self.cancel.check()?;
        let sequence_number = self.files.len();
        let document = mem::replace(
            &mut self.document,
            OutputDocument::new(self.config.output_root_element_name()),
        );
        let path = self.writer.write_chunk(&document, sequence_number)?;
        debug!("flushed chunk {sequence_number} to `{}'", path.display());
        self.files.push(OutputFile {
            sequence_number,
            path,
            fragment_count: document.len(),
        });
        Ok(())
    }
}

fn input_error(path: &Path, source: InputError) -> SplitError {
    match source {
        InputError::Cancelled(c) => SplitError::Cancelled(c),
        source => SplitError::Input {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Split the XML file at `input` into chunk files of at most
/// `config.max_element_count()` elements each. Each chunk file is called
/// `{input file name}.{n}.part` and is written to
/// `config.destination_directory()`, with `n` counting from 0.
///
/// The input is read in a single pass and never held in memory as a whole.
///
/// # Errors
/// Fails if the input cannot be read or is not well-formed, if a chunk file
/// cannot be written, or if `cancel` is triggered. Chunk files written
/// before the failure are **not** removed; cleaning them up is the caller's
/// responsibility.
pub fn split_xml_file(
    input: impl AsRef<Path>,
    config: &SplitConfig,
    cancel: &CancellationToken,
) -> Result<SplitResult, SplitError> {
    let input = input.as_ref();
    cancel.check()?;

    let base_name = input
        .file_name()
        .ok_or_else(|| input_error(input, InputError::NoFileName))?
        .to_string_lossy()
        .into_owned();

    let file = File::open(input).map_err(|e| input_error(input, e.into()))?;
    let writer = FileChunkWriter::new(config.destination_directory(), base_name);

    let start = Instant::now();
    let result = Splitter::new(input, file, writer, config, cancel).run()?;
    info!(
        "split `{}' into {} files with {} `{}' elements in {:?}",
        input.display(),
        result.len(),
        result.fragment_count(),
        config.target_element_name(),
        start.elapsed()
    );

    Ok(result)
}
