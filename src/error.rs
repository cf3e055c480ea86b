use miette::Diagnostic;
use thiserror::Error;

/// Main error type for document graph construction.
///
/// Every failure is fatal for the parse that raised it; no partial graph
/// is ever handed back alongside an error.
#[derive(Error, Diagnostic, Debug)]
pub enum GraphError {
    #[error("Schema violation on <{tag}> attribute '{attribute}': {message}")]
    #[diagnostic(code(tilegraph::schema))]
    SchemaViolation {
        tag: String,
        attribute: String,
        message: String,
    },

    #[error("Unsupported feature: {feature}")]
    #[diagnostic(code(tilegraph::unsupported))]
    UnsupportedFeature {
        feature: String,
        #[help]
        help: Option<String>,
    },

    #[error("Malformed point '{token}': {message}")]
    #[diagnostic(code(tilegraph::geometry))]
    GeometryParse { token: String, message: String },

    #[error("Malformed tile payload: {message}")]
    #[diagnostic(code(tilegraph::payload))]
    MalformedPayload {
        message: String,
        /// Byte or element offset where decoding stopped, when known.
        offset: Option<usize>,
    },

    #[error("Missing layer data: {message}")]
    #[diagnostic(
        code(tilegraph::missing_data),
        help("A tile layer needs either encoded text or one <tile> child per cell")
    )]
    MissingLayerData { message: String },

    #[error("Malformed document: {message}")]
    #[diagnostic(code(tilegraph::document))]
    MalformedDocument { message: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(tilegraph::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(tilegraph::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Source error: {message}")]
    #[diagnostic(code(tilegraph::source))]
    Source {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Image error with {path}: {message}")]
    #[diagnostic(code(tilegraph::image))]
    Image {
        path: std::path::PathBuf,
        message: String,
    },
}

impl GraphError {
    /// An unregistered tag or an explicitly rejected feature.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        GraphError::UnsupportedFeature {
            feature: feature.into(),
            help: None,
        }
    }

    /// A parent that does not model a relation to the given child.
    pub fn unsupported_relation(parent: &str, child: &str) -> Self {
        GraphError::UnsupportedFeature {
            feature: format!("<{}> inside <{}>", child, parent),
            help: Some(format!("<{}> does not accept <{}> children", parent, child)),
        }
    }

    pub fn payload(message: impl Into<String>) -> Self {
        GraphError::MalformedPayload {
            message: message.into(),
            offset: None,
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        GraphError::MalformedDocument {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_carries_feature() {
        let err = GraphError::unsupported("wangsets");
        assert!(matches!(
            &err,
            GraphError::UnsupportedFeature { feature, help: None } if feature == "wangsets"
        ));
        assert_eq!(err.to_string(), "Unsupported feature: wangsets");
    }

    #[test]
    fn test_unsupported_relation_message() {
        let err = GraphError::unsupported_relation("map", "group");
        assert_eq!(err.to_string(), "Unsupported feature: <group> inside <map>");
    }
}
