use devmatch_data::DataSetError;
use std::{fmt, io};

/// Error raised while importing legacy device or handler data.
///
/// Nothing is partially imported: any error aborts the whole import.
#[derive(Debug)]
pub enum LegacyImportError {
    /// Reading the source failed.
    Io(io::Error),
    /// The source is not well formed XML.
    Xml(quick_xml::Error),
    /// A handler declares an invalid regular expression.
    Regex {
        pattern: String,
        source: regex::Error,
    },
    /// The source is well formed but its content is not usable.
    Invalid(String),
    /// The trie corpus file is malformed or of an unsupported version.
    Data(DataSetError),
}

impl LegacyImportError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl fmt::Display for LegacyImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "legacy import: i/o error: {err}"),
            Self::Xml(err) => write!(f, "legacy import: xml error: {err}"),
            Self::Regex { pattern, source } => {
                write!(f, "legacy import: invalid regex {pattern:?}: {source}")
            }
            Self::Invalid(message) => write!(f, "legacy import: {message}"),
            Self::Data(err) => write!(f, "legacy import: {err}"),
        }
    }
}

impl std::error::Error for LegacyImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Xml(err) => Some(err),
            Self::Regex { source, .. } => Some(source),
            Self::Invalid(_) => None,
            Self::Data(err) => Some(err),
        }
    }
}

impl From<io::Error> for LegacyImportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<quick_xml::Error> for LegacyImportError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for LegacyImportError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

impl From<DataSetError> for LegacyImportError {
    fn from(err: DataSetError) -> Self {
        Self::Data(err)
    }
}
