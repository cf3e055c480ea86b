//! Concrete event sources.
//!
//! Both sources produce the same start/end [`Event`] contract, so one
//! [`GraphBuilder`](crate::builder::GraphBuilder) serves either encoding.

pub mod json;
pub mod xml;

use std::fmt;
use std::path::Path;

use crate::builder::Event;
use crate::error::{GraphError, Result};

pub use xml::XmlEvents;

/// The serialization a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.tmx` maps, `.tsx` tilesets, `.tx` templates.
    Markup,
    /// `.json` and `.tmj` maps.
    Json,
}

impl SourceFormat {
    pub const MARKUP_EXTENSIONS: &'static [&'static str] = &["tmx", "tsx", "tx"];
    pub const JSON_EXTENSIONS: &'static [&'static str] = &["json", "tmj"];

    pub fn from_extension(extension: &str) -> Result<Self> {
        let lower = extension.to_ascii_lowercase();
        if Self::MARKUP_EXTENSIONS.contains(&lower.as_str()) {
            Ok(SourceFormat::Markup)
        } else if Self::JSON_EXTENSIONS.contains(&lower.as_str()) {
            Ok(SourceFormat::Json)
        } else {
            Err(GraphError::UnsupportedFeature {
                feature: extension.to_string(),
                help: Some("Supported extensions are .tmx, .tsx, .tx, .json and .tmj".to_string()),
            })
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(extension)
    }

    /// Whether `path` has an extension this crate can read.
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Markup => write!(f, "markup"),
            SourceFormat::Json => write!(f, "json"),
        }
    }
}

/// Event stream over `text` in the given format.
///
/// Markup is pulled lazily; JSON is parsed up front and then replayed.
pub fn events<'a>(
    format: SourceFormat,
    text: &'a str,
) -> Result<Box<dyn Iterator<Item = Result<Event>> + 'a>> {
    match format {
        SourceFormat::Markup => Ok(Box::new(XmlEvents::new(text))),
        SourceFormat::Json => Ok(Box::new(json::events(text)?.into_iter().map(Ok))),
    }
}
