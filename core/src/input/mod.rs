use quick_xml::events::Event;

pub mod xml;

/// The kind of token a [`xml::StreamTokenizer`] cursor points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An element start tag (`<a>`)
    Start,

    /// A self-closing element (`<a/>`)
    Empty,

    /// An element end tag (`</a>`)
    End,

    /// Character data, including CDATA sections
    Text,

    Comment,

    /// The XML declaration (`<?xml ...?>`)
    Declaration,

    /// Processing instructions and document type declarations
    Other,

    /// End of the stream
    Eof,
}

impl TokenKind {
    pub fn of(event: &Event) -> Self {
        match event {
            Event::Start(_) => TokenKind::Start,
            Event::Empty(_) => TokenKind::Empty,
            Event::End(_) => TokenKind::End,
            Event::Text(_) | Event::CData(_) => TokenKind::Text,
            Event::Comment(_) => TokenKind::Comment,
            Event::Decl(_) => TokenKind::Declaration,
            Event::PI(_) | Event::DocType(_) => TokenKind::Other,
            Event::Eof => TokenKind::Eof,
        }
    }
}
