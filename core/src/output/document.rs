use std::io::{self, Write};

use quick_xml::events::{BytesDecl, BytesStart};

use crate::error::InputError;

/// The raw markup of one captured element, start tag to end tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for Fragment {
    type Error = InputError;

    fn try_from(markup: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Fragment(String::from_utf8(markup)?))
    }
}

impl From<&str> for Fragment {
    fn from(markup: &str) -> Self {
        Fragment(markup.to_string())
    }
}

/// An output document being accumulated: a root element name and the
/// fragments that will become its children. Fragments are only ever
/// appended and are written out exactly as captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    root_element_name: String,
    fragments: Vec<Fragment>,
}

impl OutputDocument {
    pub fn new(root_element_name: impl Into<String>) -> Self {
        Self {
            root_element_name: root_element_name.into(),
            fragments: Vec::new(),
        }
    }

    pub fn append(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn root_element_name(&self) -> &str {
        &self.root_element_name
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Number of fragments appended so far
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Serialize the document: an XML declaration, then the root element
    /// with one fragment per line
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
        writer.write_all(b"<?")?;
        writer.write_all(&decl)?;
        writer.write_all(b"?>\n")?;

        let root = BytesStart::new(self.root_element_name.as_str());
        writer.write_all(&[b'<'])?;
        writer.write_all(&root)?;
        writer.write_all(&[b'>'])?;

        for fragment in &self.fragments {
            writer.write_all(b"\n  ")?;
            writer.write_all(fragment.as_str().as_bytes())?;
        }

        writer.write_all(b"\n</")?;
        writer.write_all(&root.to_end())?;
        writer.write_all(b">\n")?;

        writer.flush()
    }
}
