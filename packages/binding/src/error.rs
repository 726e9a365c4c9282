//! Error types for document binding.
//!
//! `BindingError` covers the whole lifecycle: registry population at startup,
//! parsing and validating inbound documents, and rendering instances back to
//! XML. [`BindingError::is_fatal`] separates errors that indicate a broken
//! payload stream or a misconfigured registry from plain document rejections.

use thiserror::Error;

use crate::schema::QName;

/// Main error type for the binding library.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Malformed XML markup.
    #[error("XML syntax error: {0}")]
    Syntax(#[from] roxmltree::Error),

    /// Payload bytes are not valid UTF-8.
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Document exceeds the configured size limit.
    #[error("Document of {size} bytes exceeds the limit of {max} bytes")]
    DocumentTooLarge { size: usize, max: usize },

    /// Element nesting exceeds the configured depth limit.
    #[error("Element nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },

    /// Schema type not present in the registry.
    #[error("Unknown schema type: {0}")]
    UnknownType(QName),

    /// Schema type registered twice.
    #[error("Schema type already registered: {0}")]
    DuplicateType(QName),

    /// Global element declared twice.
    #[error("Global element already declared: {0}")]
    DuplicateElement(QName),

    /// Schema type descriptors are inconsistent.
    #[error("Invalid schema type {type_name}: {reason}")]
    InvalidSchemaType { type_name: QName, reason: String },

    /// Child element not allowed at this position.
    #[error(
        "Unexpected element <{tag}>{}{}",
        .parent.as_ref().map(|p| format!(" in <{p}>")).unwrap_or_default(),
        describe_expected(.expected)
    )]
    UnexpectedElement {
        tag: String,
        parent: Option<String>,
        expected: Vec<String>,
    },

    /// Required child element(s) missing.
    #[error("Incomplete content in <{element}>: missing {}", describe_tags(.missing))]
    IncompleteContent { element: String, missing: Vec<String> },

    /// Repeatable element occurs more often than allowed.
    #[error("Too many <{field}> elements in <{element}> (maximum {max})")]
    TooManyOccurrences {
        element: String,
        field: String,
        max: u32,
    },

    /// Required attribute missing.
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Attribute not declared by the schema type.
    #[error("Unexpected attribute '{attribute}' on <{element}>")]
    UnexpectedAttribute { element: String, attribute: String },

    /// Text could not be converted to the declared value kind.
    #[error("Invalid {kind} value for '{field}': '{value}'")]
    ValueFormat {
        field: String,
        kind: &'static str,
        value: String,
    },

    /// Non-whitespace text inside an element-only type.
    #[error("Unexpected text content in element-only <{element}>")]
    MixedContent { element: String },

    /// Instance does not fit its schema type and cannot be rendered.
    #[error("Cannot render {type_name}: {reason}")]
    InvalidInstance { type_name: QName, reason: String },
}

impl BindingError {
    /// Whether the error is fatal for the payload stream or the process.
    ///
    /// Fatal errors are malformed input (syntax, encoding, size limits) and
    /// registry misconfiguration. Everything else rejects a single document
    /// and leaves the connection usable for the next message.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_)
                | Self::Encoding(_)
                | Self::DocumentTooLarge { .. }
                | Self::NestingTooDeep { .. }
                | Self::UnknownType(_)
                | Self::DuplicateType(_)
                | Self::DuplicateElement(_)
                | Self::InvalidSchemaType { .. }
        )
    }
}

fn describe_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("<{t}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_expected(expected: &[String]) -> String {
    match expected {
        [] => "; no further elements allowed".to_string(),
        [single] => format!("; expected <{single}>"),
        _ => format!("; expected one of {}", describe_tags(expected)),
    }
}

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_element_with_parent() {
        let err = BindingError::UnexpectedElement {
            tag: "title".to_string(),
            parent: Some("book".to_string()),
            expected: vec!["author".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unexpected element <title> in <book>; expected <author>"
        );
    }

    #[test]
    fn test_unexpected_element_without_expected() {
        let err = BindingError::UnexpectedElement {
            tag: "extra".to_string(),
            parent: Some("book".to_string()),
            expected: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Unexpected element <extra> in <book>; no further elements allowed"
        );
    }

    #[test]
    fn test_unexpected_root_lists_alternatives() {
        let err = BindingError::UnexpectedElement {
            tag: "shelf".to_string(),
            parent: None,
            expected: vec!["books".to_string(), "book".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unexpected element <shelf>; expected one of <books>, <book>"
        );
    }

    #[test]
    fn test_incomplete_content_display() {
        let err = BindingError::IncompleteContent {
            element: "book".to_string(),
            missing: vec!["pub_date".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Incomplete content in <book>: missing <pub_date>"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BindingError::UnknownType(QName::unqualified("Missing")).is_fatal());
        assert!(BindingError::DocumentTooLarge { size: 10, max: 5 }.is_fatal());
        assert!(!BindingError::MissingAttribute {
            element: "book".to_string(),
            attribute: "id".to_string(),
        }
        .is_fatal());
        assert!(!BindingError::ValueFormat {
            field: "price".to_string(),
            kind: "float",
            value: "cheap".to_string(),
        }
        .is_fatal());
    }
}
