use std::{fmt, io, time::Duration};

/// Errors raised while loading or reading a [`DataSet`](crate::DataSet).
#[derive(Debug)]
pub enum DataSetError {
    /// The data source could not be opened or mapped.
    Io(io::Error),
    /// The data is malformed or truncated.
    Format(DataFormatError),
    /// The data declares a format version that is not supported.
    UnsupportedVersion(UnsupportedVersionError),
    /// An entity was requested that does not exist.
    NotFound {
        /// Kind of entity requested.
        entity: &'static str,
        /// Index, offset or identifier requested.
        key: u64,
    },
    /// No pooled stream reader became available in time.
    PoolTimeout(PoolTimeoutError),
}

impl DataSetError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<u64>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format(DataFormatError {
            context: context.into(),
            cause: FormatCause::Parse(message.into()),
        })
    }

    pub(crate) fn truncated(context: impl Into<String>, error: io::Error) -> Self {
        Self::Format(DataFormatError {
            context: context.into(),
            cause: FormatCause::Io(error),
        })
    }

    /// `true` if this error is caused by malformed data.
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::UnsupportedVersion(_))
    }
}

impl fmt::Display for DataSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "data set io error: {err}"),
            Self::Format(err) => err.fmt(f),
            Self::UnsupportedVersion(err) => err.fmt(f),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::PoolTimeout(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DataSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::UnsupportedVersion(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::PoolTimeout(err) => Some(err),
        }
    }
}

impl From<PoolTimeoutError> for DataSetError {
    fn from(err: PoolTimeoutError) -> Self {
        Self::PoolTimeout(err)
    }
}

impl From<UnsupportedVersionError> for DataSetError {
    fn from(err: UnsupportedVersionError) -> Self {
        Self::UnsupportedVersion(err)
    }
}

/// Malformed or truncated data, with the io or parse cause preserved.
#[derive(Debug)]
pub struct DataFormatError {
    context: String,
    cause: FormatCause,
}

#[derive(Debug)]
enum FormatCause {
    Io(io::Error),
    Parse(String),
}

impl DataFormatError {
    /// What was being read when the error occurred.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// `true` if the data ended before a record was complete.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(&self.cause, FormatCause::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}

impl fmt::Display for DataFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            FormatCause::Io(err) => write!(f, "malformed data set ({}): {err}", self.context),
            FormatCause::Parse(msg) => write!(f, "malformed data set ({}): {msg}", self.context),
        }
    }
}

impl std::error::Error for DataFormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            FormatCause::Io(err) => Some(err),
            FormatCause::Parse(_) => None,
        }
    }
}

/// The data declares a format version outside of the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedVersionError {
    pub(crate) tag: u8,
    pub(crate) major: u8,
    pub(crate) minor: u8,
}

impl fmt::Display for UnsupportedVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.tag {
            crate::format::PATTERN_TAG => "Pattern",
            crate::format::TRIE_TAG => "Trie",
            _ => "Unknown",
        };
        write!(
            f,
            "unsupported data set format version: {kind}V{}.{}",
            self.major, self.minor
        )
    }
}

impl std::error::Error for UnsupportedVersionError {}

/// A pooled stream reader could not be obtained in time.
#[derive(Debug, Clone)]
pub struct PoolTimeoutError {
    pub(crate) waited: Duration,
    pub(crate) size: usize,
}

impl PoolTimeoutError {
    /// How long the caller waited before giving up.
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl fmt::Display for PoolTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all {} stream readers busy, gave up after {:?}",
            self.size, self.waited
        )
    }
}

impl std::error::Error for PoolTimeoutError {}
