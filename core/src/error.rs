use std::{io, path::PathBuf, string::FromUtf8Error};

use thiserror::Error;

use crate::{cancel::Cancelled, util::window::WindowError};

/// A configuration value was missing or invalid. Reported before any file
/// is opened.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the number of elements per file must be at least 1")]
    ZeroElementCount,

    #[error("missing required setting `{0}'")]
    MissingField(&'static str),

    #[error("`{value}' is not a valid XML name for the {field}")]
    InvalidName { field: &'static str, value: String },
}

/// The source document could not be read or is not well-formed
#[derive(Error, Debug)]
pub enum InputError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("unable to parse XML")]
    Parser(#[from] quick_xml::Error),

    #[error("reached end of input inside element `{0}'")]
    UnexpectedEof(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("found text outside of the root element")]
    ContentOutsideRoot,

    #[error("input path has no file name")]
    NoFileName,

    #[error("element markup is not valid UTF-8")]
    NotUtf8(#[from] FromUtf8Error),

    #[error("the cursor is not positioned on an element start")]
    NotAnElement,

    #[error("unable to cut element markup out of the input")]
    Window(#[from] WindowError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// A chunk file could not be written
#[derive(Error, Debug)]
#[error("unable to write chunk file `{}'", path.display())]
pub struct OutputError {
    pub path: PathBuf,

    #[source]
    pub source: io::Error,
}

/// Errors surfaced by a split. Chunk files flushed before the error remain
/// on disk.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("invalid configuration")]
    Configuration(#[from] ConfigError),

    #[error("unable to read input file `{}'", path.display())]
    Input {
        path: PathBuf,

        #[source]
        source: InputError,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl SplitError {
    /// `true` if the split stopped because it was cancelled rather than
    /// because something failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SplitError::Cancelled(_))
    }
}
