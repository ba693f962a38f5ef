use std::{collections::VecDeque, ops::Range};

use thiserror::Error;

/// Errors that can occur when accessing a [`Window`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WindowError {
    #[error("byte range {start}..{end} starts before the window (window starts at {window_start})")]
    BeforeStart {
        start: usize,
        end: usize,
        window_start: usize,
    },

    #[error("byte range {start}..{end} exceeds the window (window ends at {window_end})")]
    BeyondEnd {
        start: usize,
        end: usize,
        window_end: usize,
    },
}

/// A buffer that slides over a larger input stream. Only the bytes between
/// [`Window::start`] and [`Window::end`] are retained. All positions are
/// absolute offsets into the input stream.
#[derive(Default, Debug)]
pub struct Window {
    pos: usize,
    buf: VecDeque<u8>,
}

impl Window {
    /// Append data read from the input stream to the end of the window
    pub fn extend(&mut self, buf: &[u8]) {
        self.buf.extend(buf);
    }

    /// The absolute position of the first byte still held by the window
    pub fn start(&self) -> usize {
        self.pos
    }

    /// The absolute position right after the last byte held by the window
    pub fn end(&self) -> usize {
        self.pos + self.buf.len()
    }

    /// The number of bytes currently retained
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Copy the bytes in the given absolute `range` out of the window
    pub fn get_bytes(&self, range: Range<usize>) -> Result<Vec<u8>, WindowError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        if range.start < self.pos {
            return Err(WindowError::BeforeStart {
                start: range.start,
                end: range.end,
                window_start: self.pos,
            });
        }

        if range.end > self.end() {
            return Err(WindowError::BeyondEnd {
                start: range.start,
                end: range.end,
                window_end: self.end(),
            });
        }

        Ok(self
            .buf
            .range(range.start - self.pos..range.end - self.pos)
            .copied()
            .collect())
    }

    /// Drop all bytes before the absolute position `pos`. The end of the
    /// window stays where it is.
    pub fn advance_to(&mut self, pos: usize) -> Result<(), WindowError> {
        if pos < self.pos {
            return Err(WindowError::BeforeStart {
                start: pos,
                end: pos,
                window_start: self.pos,
            });
        }

        if pos > self.end() {
            return Err(WindowError::BeyondEnd {
                start: pos,
                end: pos,
                window_end: self.end(),
            });
        }

        self.buf.drain(0..pos - self.pos);
        self.pos = pos;

        Ok(())
    }
}
