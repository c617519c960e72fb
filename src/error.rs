/// Error types for package repair operations.
use thiserror::Error;

/// Result type for package repair operations.
pub type Result<T> = std::result::Result<T, FixError>;

/// Error types for package repair operations.
///
/// Every variant is fatal: a run either completes or halts on the first
/// error, relying on retire-on-success semantics to make reruns safe.
#[derive(Error, Debug)]
pub enum FixError {
    /// A filename or identifier does not match its expected pattern
    /// (e.g. "rId<N>", "image<N>.<ext>")
    #[error("cannot parse {what} from '{value}'")]
    Parse { what: &'static str, value: String },

    /// A required attribute is absent where the algorithm assumes presence
    #[error("missing attribute '{0}' on <{1}>")]
    MissingAttr(&'static str, &'static str),

    /// A node the algorithm assumes present could not be located
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An allocated identifier or filename is already occupied, or the
    /// document changed out from under the repair loop
    #[error("consistency violation: {0}")]
    Conflict(String),

    /// Unknown namespace prefix in the fixed namespace map
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),

    /// Unknown namespace URI in the fixed namespace map
    #[error("unknown namespace URI '{0}'")]
    UnknownNamespace(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for FixError {
    fn from(err: quick_xml::Error) -> Self {
        FixError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FixError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        FixError::Xml(err.to_string())
    }
}
