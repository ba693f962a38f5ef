use itertools::Itertools;
use quick_xml::{escape::escape, events::BytesStart, name::PrefixDeclaration, Reader};

/// An XML namespace prefix declaration
#[derive(PartialEq, Eq, Hash, Clone, Debug, Ord, PartialOrd)]
pub enum Prefix {
    Default,
    Named(String),
}

impl Prefix {
    /// The attribute name that declares this prefix (`xmlns` or `xmlns:p`)
    pub fn attribute_name(&self) -> String {
        match self {
            Prefix::Default => "xmlns".to_string(),
            Prefix::Named(n) => format!("xmlns:{n}"),
        }
    }
}

/// The namespace declarations of a single element, in lexicographical order
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Namespaces(pub Vec<(Prefix, String)>);

impl Namespaces {
    /// Extracts the namespace declarations from the given XML tag
    pub fn try_from_xml_tag<B>(
        tag: &BytesStart,
        reader: &Reader<B>,
    ) -> Result<Self, quick_xml::Error> {
        let decoder = reader.decoder();
        let mut namespaces = Vec::new();

        for attr in tag.attributes() {
            let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
            if let Some(binding) = attr.key.as_namespace_binding() {
                let prefix = match binding {
                    PrefixDeclaration::Default => Prefix::Default,
                    PrefixDeclaration::Named(b"") => Prefix::Default,
                    PrefixDeclaration::Named(n) => Prefix::Named(decoder.decode(n)?.to_string()),
                };
                let value = attr.decode_and_unescape_value(reader)?;
                namespaces.push((prefix, value.to_string()));
            }
        }

        namespaces.sort_unstable();

        Ok(Self(namespaces))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold the declarations of nested scopes (outermost first) into the
    /// set that is in effect inside the innermost one
    pub fn in_scope<'a>(scopes: impl IntoIterator<Item = &'a Namespaces>) -> Namespaces {
        let scopes = scopes.into_iter().collect_vec();
        let result = scopes
            .iter()
            .rev()
            .flat_map(|scope| &scope.0)
            .unique_by(|(prefix, _)| prefix.clone())
            .cloned()
            .sorted()
            .collect();
        Namespaces(result)
    }

    /// Add every declaration to `tag` that it does not declare (or
    /// override) itself
    pub fn merge_into_start_tag(&self, tag: &mut BytesStart) -> Result<(), quick_xml::Error> {
        for (prefix, uri) in &self.0 {
            let key = prefix.attribute_name();
            if tag.try_get_attribute(&key)?.is_none() {
                let value = escape(uri);
                tag.push_attribute((key.as_bytes(), value.as_bytes()));
            }
        }
        Ok(())
    }
}
