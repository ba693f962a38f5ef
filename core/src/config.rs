use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Validated settings for a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfig {
    /// Qualified name of the repeating element to split at
    target_element_name: String,

    /// Directory the chunk files are written to. Must exist.
    destination_directory: PathBuf,

    /// Number of elements per chunk file. Only the last file may hold fewer.
    max_element_count: usize,

    /// Name of the root element wrapping the elements in each chunk file
    output_root_element_name: String,

    /// Copy namespace declarations of ancestors into captured elements
    inherit_namespaces: bool,
}

impl SplitConfig {
    /// Create a new configuration.
    ///
    /// # Errors
    /// - [`ConfigError::ZeroElementCount`] if `max_element_count` is 0
    /// - [`ConfigError::MissingField`] if a name or the directory is empty
    /// - [`ConfigError::InvalidName`] if a name is not a valid XML name
    pub fn new(
        target_element_name: impl Into<String>,
        destination_directory: impl Into<PathBuf>,
        max_element_count: usize,
        output_root_element_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let target_element_name = target_element_name.into();
        let destination_directory = destination_directory.into();
        let output_root_element_name = output_root_element_name.into();

        validate_name("target element name", &target_element_name)?;
        validate_name("output root element name", &output_root_element_name)?;

        if destination_directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("destination directory"));
        }

        if max_element_count == 0 {
            return Err(ConfigError::ZeroElementCount);
        }

        Ok(Self {
            target_element_name,
            destination_directory,
            max_element_count,
            output_root_element_name,
            inherit_namespaces: false,
        })
    }

    /// Enable or disable copying in-scope namespace declarations into every
    /// captured element. Disabled by default, in which case elements are
    /// copied byte for byte.
    pub fn with_inherit_namespaces(mut self, inherit_namespaces: bool) -> Self {
        self.inherit_namespaces = inherit_namespaces;
        self
    }

    pub fn target_element_name(&self) -> &str {
        &self.target_element_name
    }

    pub fn destination_directory(&self) -> &Path {
        &self.destination_directory
    }

    pub fn max_element_count(&self) -> usize {
        self.max_element_count
    }

    pub fn output_root_element_name(&self) -> &str {
        &self.output_root_element_name
    }

    pub fn inherit_namespaces(&self) -> bool {
        self.inherit_namespaces
    }
}

/// Check that `value` can be used as an element name. This is a practical
/// subset of the XML `Name` production: a letter, `_`, `:` or any non-ASCII
/// character first, followed by those or digits, `-` and `.`.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(ConfigError::MissingField(field));
    };

    let is_start = |c: char| c.is_alphabetic() || c == '_' || c == ':' || !c.is_ascii();
    let is_rest = |c: char| is_start(c) || c.is_ascii_digit() || c == '-' || c == '.';

    if is_start(first) && chars.all(is_rest) && !value.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}
