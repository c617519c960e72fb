/// Namespace constants and the fixed prefix/URI mapping used by the
/// repair queries.
///
/// The document body and the relationship part are queried against a closed
/// set of four namespaces. The mapping is bidirectional and total over that
/// set; an unknown prefix or URI is a configuration error, not a lookup
/// miss.
use crate::error::{FixError, Result};

/// DrawingML main namespace (prefix `a`)
pub const DRAWINGML_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// DrawingML picture namespace (prefix `pic`)
pub const DRAWINGML_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// OPC package relationships namespace (prefix `pr`)
pub const PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// Office document relationships namespace (prefix `r`)
pub const OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Relationship type URI for image parts
pub const IMAGE_RELTYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const BINDINGS: [(&str, &str); 4] = [
    ("a", DRAWINGML_MAIN),
    ("pic", DRAWINGML_PICTURE),
    ("pr", PACKAGE_RELATIONSHIPS),
    ("r", OFFICE_RELATIONSHIPS),
];

/// Resolve a namespace prefix to its URI.
pub fn uri(prefix: &str) -> Result<&'static str> {
    BINDINGS
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, u)| *u)
        .ok_or_else(|| FixError::UnknownPrefix(prefix.to_string()))
}

/// Resolve a namespace URI to its prefix.
pub fn prefix(namespace_uri: &str) -> Result<&'static str> {
    BINDINGS
        .iter()
        .find(|(_, u)| *u == namespace_uri)
        .map(|(p, _)| *p)
        .ok_or_else(|| FixError::UnknownNamespace(namespace_uri.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefixes_round_trip() {
        for p in ["a", "pic", "pr", "r"] {
            let u = uri(p).unwrap();
            assert_eq!(prefix(u).unwrap(), p);
        }
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        assert!(matches!(uri("w"), Err(FixError::UnknownPrefix(_))));
    }

    #[test]
    fn test_unknown_uri_is_an_error() {
        assert!(matches!(
            prefix("http://example.com/ns"),
            Err(FixError::UnknownNamespace(_))
        ));
    }
}
