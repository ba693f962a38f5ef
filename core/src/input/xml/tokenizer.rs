use std::io::{BufRead, BufReader, Read};

use log::trace;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    cancel::CancellationToken,
    error::InputError,
    input::{xml::namespaces::Namespaces, TokenKind},
    util::{window::Window, window_read::WindowRead},
};

/// An element that has been opened but not closed yet
struct OpenElement {
    name: String,
    namespaces: Namespaces,
}

/// A pull-based cursor over an XML stream. The cursor is advanced one token
/// at a time with [`StreamTokenizer::advance`]. The element the cursor points
/// to can be cut out of the stream as raw markup with
/// [`StreamTokenizer::capture_current`].
///
/// Only the bytes from the start of the current token onward are kept in
/// memory. Document type declarations are reported as [`TokenKind::Other`]
/// and otherwise ignored. A leading UTF-8 byte order mark is skipped.
pub struct StreamTokenizer<R> {
    reader: Reader<BufReader<WindowRead<R>>>,
    buf: Vec<u8>,

    /// The token the cursor points to. [`None`] before the first advance and
    /// right after a capture.
    current: Option<Event<'static>>,

    /// Absolute byte position of the current token's first byte
    current_start: usize,

    /// Elements enclosing the cursor, outermost first
    open: Vec<OpenElement>,

    /// Whether namespace declarations of enclosing elements are recorded
    /// and merged into captured elements
    inherit_namespaces: bool,

    seen_root: bool,

    /// Length of the byte order mark skipped at the start of the stream.
    /// [`None`] until the stream has been checked for one. The reader's
    /// positions do not include it, window positions do.
    bom_len: Option<usize>,

    /// Polled for every token consumed while reading a captured element
    cancel: CancellationToken,
}

impl<R: Read> StreamTokenizer<R> {
    pub fn new(inner: R) -> Self {
        let bufreader = BufReader::new(WindowRead::new(inner));
        Self {
            reader: Reader::from_reader(bufreader),
            buf: Vec::new(),
            current: None,
            current_start: 0,
            open: Vec::new(),
            inherit_namespaces: false,
            seen_root: false,
            bom_len: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Let long captures stop early when `cancel` is triggered.
    /// [`StreamTokenizer::capture_current`] then fails with
    /// [`InputError::Cancelled`].
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Make [`StreamTokenizer::capture_current`] add the namespace
    /// declarations in scope at the captured element to its start tag
    pub fn inherit_namespaces(mut self, inherit_namespaces: bool) -> Self {
        self.inherit_namespaces = inherit_namespaces;
        self
    }

    /// Moves the cursor to the next token and returns its kind. Once the end
    /// of the stream has been reached, the cursor stays there.
    ///
    /// # Errors
    /// Fails if the stream cannot be read, contains malformed markup, ends
    /// inside an element, does not contain exactly one root element or has
    /// text outside of it.
    pub fn advance(&mut self) -> Result<TokenKind, InputError> {
        // update the open elements with the token we are leaving
        match self.current.take() {
            Some(Event::Start(s)) => {
                let namespaces = if self.inherit_namespaces {
                    Namespaces::try_from_xml_tag(&s, &self.reader)?
                } else {
                    Namespaces::default()
                };
                self.open.push(OpenElement {
                    name: String::from_utf8_lossy(s.name().as_ref()).into_owned(),
                    namespaces,
                });
            }
            Some(Event::End(_)) => {
                self.open.pop();
            }
            Some(Event::Eof) => {
                self.current = Some(Event::Eof);
                return Ok(TokenKind::Eof);
            }
            _ => {}
        }

        if self.bom_len.is_none() {
            self.bom_len = Some(self.skip_bom()?);
        }

        let before = self.position();
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?.into_owned();
        let after = self.position();

        // The reader may already have consumed the `<` of a tag while
        // reading the text in front of it, so tag positions are computed
        // backwards from the closing `>`.
        let start = match &event {
            Event::Start(s) => after - (s.len() + 2),
            Event::Empty(s) => after - (s.len() + 3),
            _ => before,
        };

        let outside_root = self.open.is_empty();
        match &event {
            Event::Start(_) | Event::Empty(_) if outside_root && self.seen_root => {
                return Err(InputError::MultipleRoots);
            }
            Event::Start(_) | Event::Empty(_) => self.seen_root = true,
            Event::Text(t) if outside_root && !t.iter().all(u8::is_ascii_whitespace) => {
                return Err(InputError::ContentOutsideRoot);
            }
            Event::CData(_) if outside_root => return Err(InputError::ContentOutsideRoot),
            Event::Eof => {
                if let Some(e) = self.open.last() {
                    return Err(InputError::UnexpectedEof(e.name.clone()));
                }
                if !self.seen_root {
                    return Err(InputError::MissingRoot);
                }
            }
            _ => {}
        }

        // nothing in front of the current token will ever be captured
        let window = self.window_mut();
        let keep_from = start.min(before).max(window.start());
        window.advance_to(keep_from)?;

        let kind = TokenKind::of(&event);
        self.current_start = start;
        self.current = Some(event);

        Ok(kind)
    }

    /// The token the cursor points to
    pub fn current(&self) -> Option<&Event<'static>> {
        self.current.as_ref()
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(TokenKind::of)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.current, Some(Event::Eof))
    }

    /// The qualified name of the current token if it is an element start,
    /// an empty element or an element end
    pub fn name(&self) -> Option<&[u8]> {
        match self.current.as_ref()? {
            Event::Start(s) | Event::Empty(s) => Some(s.name().into_inner()),
            Event::End(e) => Some(e.name().into_inner()),
            _ => None,
        }
    }

    /// `true` if the cursor points to the start of an element (or to an
    /// empty element) with the given qualified name
    pub fn is_element_start(&self, name: &str) -> bool {
        match &self.current {
            Some(Event::Start(s)) | Some(Event::Empty(s)) => s.name().as_ref() == name.as_bytes(),
            _ => false,
        }
    }

    /// Number of elements enclosing the cursor
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Cuts the element the cursor points to (start tag, content and end
    /// tag) out of the stream and returns its raw markup. The cursor is then
    /// moved to the token following the element's end tag, which may itself
    /// be the start of another element.
    ///
    /// # Errors
    /// Fails with [`InputError::NotAnElement`] if the cursor does not point to
    /// an element start. Fails like [`StreamTokenizer::advance`] if the
    /// element's content cannot be read.
    pub fn capture_current(&mut self) -> Result<Vec<u8>, InputError> {
        let start = self.current_start;
        let (tag, tag_len, end) = match self.current.take() {
            Some(Event::Empty(s)) => {
                let tag_len = s.len() + 3;
                (s, tag_len, self.position())
            }
            Some(Event::Start(s)) => {
                let end = self.read_to_end_of(&s)?;
                let tag_len = s.len() + 2;
                (s, tag_len, end)
            }
            other => {
                self.current = other;
                return Err(InputError::NotAnElement);
            }
        };

        let window = self.window_mut();
        let mut markup = window.get_bytes(start..end)?;
        window.advance_to(end)?;

        if self.inherit_namespaces {
            markup = self.merge_namespaces(tag, tag_len, markup)?;
        }

        trace!("captured element at {start}..{end}");

        self.advance()?;

        Ok(markup)
    }

    /// Reads up to and including the end tag matching the given start tag
    /// and returns the absolute position right after it
    fn read_to_end_of(&mut self, start: &BytesStart) -> Result<usize, InputError> {
        let mut depth = 1usize;
        loop {
            self.cancel.check()?;
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.position());
                    }
                }
                Event::Eof => {
                    return Err(InputError::UnexpectedEof(
                        String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    ))
                }
                _ => {}
            }
        }
    }

    /// Rewrite the start tag of a captured element so that it declares every
    /// namespace in scope at its position
    fn merge_namespaces(
        &self,
        tag: BytesStart<'static>,
        tag_len: usize,
        markup: Vec<u8>,
    ) -> Result<Vec<u8>, InputError> {
        let in_scope = Namespaces::in_scope(self.open.iter().map(|e| &e.namespaces));
        if in_scope.is_empty() {
            return Ok(markup);
        }

        let is_empty = tag_len == tag.len() + 3;
        let mut tag = tag;
        in_scope.merge_into_start_tag(&mut tag)?;

        let mut result = Vec::with_capacity(markup.len() + tag.len() + 3);
        result.push(b'<');
        result.extend_from_slice(&tag);
        if is_empty {
            result.extend_from_slice(b"/>");
        } else {
            result.push(b'>');
        }
        result.extend_from_slice(&markup[tag_len..]);

        Ok(result)
    }

    /// Drop a UTF-8 byte order mark at the start of the stream before the
    /// reader sees it and return its length
    fn skip_bom(&mut self) -> Result<usize, InputError> {
        const BOM: &[u8] = b"\xEF\xBB\xBF";
        let inner = self.reader.get_mut();
        if inner.fill_buf()?.starts_with(BOM) {
            inner.consume(BOM.len());
            Ok(BOM.len())
        } else {
            Ok(0)
        }
    }

    /// Absolute position of the reader in the stream
    fn position(&self) -> usize {
        self.reader.buffer_position() + self.bom_len.unwrap_or(0)
    }

    fn window_mut(&mut self) -> &mut Window {
        self.reader.get_mut().get_mut().window_mut()
    }
}
