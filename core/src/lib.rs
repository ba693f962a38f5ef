//! Streaming XML splitter. Re-chunks a large XML document into smaller,
//! independently well-formed documents, each holding a fixed number of a
//! repeating element, without loading the whole input into memory.

pub mod cancel;
pub mod combine;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod split;
pub mod util;

pub use cancel::CancellationToken;
pub use config::SplitConfig;
pub use error::SplitError;
pub use split::{split_xml_file, OutputFile, SplitResult};
