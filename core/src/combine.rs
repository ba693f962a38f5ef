use std::{ops::Range, str::FromStr};

use log::debug;
use quick_xml::{events::Event, Reader};
use thiserror::Error;

use crate::{
    cancel::{CancellationToken, Cancelled},
    config::validate_name,
    error::ConfigError,
};

/// Reasons why a text is not a well-formed XML document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("unable to parse document")]
    Parser(#[from] quick_xml::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("reached end of document inside an element")]
    UnexpectedEof,

    #[error("found text outside of the root element")]
    ContentOutsideRoot,
}

/// Errors that can occur while combining documents
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("invalid configuration")]
    Configuration(#[from] ConfigError),

    #[error("input for child element `{child}' is not a well-formed XML document")]
    Format {
        child: String,

        #[source]
        source: DocumentError,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// An XML document that has been checked to be well-formed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    text: String,

    /// Everything after the XML declaration and document type declaration,
    /// without surrounding whitespace
    body: Range<usize>,
}

impl XmlDocument {
    pub fn parse(text: impl Into<String>) -> Result<Self, DocumentError> {
        let text = text.into();
        let body = document_body(&text)?;
        Ok(Self { text, body })
    }

    /// The full text of the document
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The document without its XML declaration
    pub fn body(&self) -> &str {
        &self.text[self.body.clone()]
    }
}

impl FromStr for XmlDocument {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A document to combine, either as unchecked text or already parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlSource {
    RawText(String),
    Parsed(XmlDocument),
}

impl From<String> for XmlSource {
    fn from(text: String) -> Self {
        XmlSource::RawText(text)
    }
}

impl From<XmlDocument> for XmlSource {
    fn from(document: XmlDocument) -> Self {
        XmlSource::Parsed(document)
    }
}

/// One document and the element it will be wrapped in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineInputXml {
    pub xml: XmlSource,
    pub child_element_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineInput {
    pub root_element_name: String,
    pub inputs: Vec<CombineInputXml>,
}

/// Combine several XML documents into one. Every document is wrapped in an
/// element with its `child_element_name` and all of them are placed under
/// a new root element, in input order. XML declarations of the inputs are
/// dropped and the result does not get one either.
///
/// ```text
/// <Root><Child1>...document 1...</Child1><Child2>...</Child2></Root>
/// ```
///
/// # Errors
/// - [`CombineError::Configuration`] if a root or child name is not a valid
///   XML name
/// - [`CombineError::Format`] if a [`XmlSource::RawText`] input is not a
///   well-formed document
/// - [`CombineError::Cancelled`] if `cancel` is triggered
pub fn combine_xml(input: &CombineInput, cancel: &CancellationToken) -> Result<String, CombineError> {
    validate_name("root element name", &input.root_element_name)?;
    for i in &input.inputs {
        validate_name("child element name", &i.child_element_name)?;
    }

    let root = &input.root_element_name;
    if input.inputs.is_empty() {
        return Ok(format!("<{root} />"));
    }

    let mut result = format!("<{root}>");
    for i in &input.inputs {
        cancel.check()?;

        let body = match &i.xml {
            XmlSource::RawText(text) => {
                let body = document_body(text).map_err(|source| CombineError::Format {
                    child: i.child_element_name.clone(),
                    source,
                })?;
                &text[body]
            }
            XmlSource::Parsed(document) => document.body(),
        };

        let child = &i.child_element_name;
        result.push('<');
        result.push_str(child);
        result.push('>');
        result.push_str(body);
        result.push_str("</");
        result.push_str(child);
        result.push('>');
    }
    cancel.check()?;

    result.push_str("</");
    result.push_str(root);
    result.push('>');

    debug!(
        "combined {} documents under `{root}'",
        input.inputs.len()
    );

    Ok(result)
}

/// Check that `text` is a well-formed document and return the byte range of
/// everything after its prolog declarations, trimmed
fn document_body(text: &str) -> Result<Range<usize>, DocumentError> {
    let mut reader = Reader::from_str(text);
    let mut body_start = 0;
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Decl(_) | Event::DocType(_) if !seen_root => {
                body_start = reader.buffer_position();
            }
            Event::Start(_) => {
                if depth == 0 {
                    if seen_root {
                        return Err(DocumentError::MultipleRoots);
                    }
                    seen_root = true;
                }
                depth += 1;
            }
            Event::Empty(_) => {
                if depth == 0 {
                    if seen_root {
                        return Err(DocumentError::MultipleRoots);
                    }
                    seen_root = true;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(t) if depth == 0 => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(DocumentError::ContentOutsideRoot);
                }
            }
            Event::CData(_) if depth == 0 => return Err(DocumentError::ContentOutsideRoot),
            Event::Eof => break,
            _ => {}
        }
    }

    if depth > 0 {
        return Err(DocumentError::UnexpectedEof);
    }
    if !seen_root {
        return Err(DocumentError::MissingRoot);
    }

    let body = &text[body_start..];
    let start = body_start + (body.len() - body.trim_start().len());
    let end = body_start + body.trim_end().len();
    Ok(start..end)
}
