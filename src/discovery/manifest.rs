//! Project manifest (tilegraph.yaml) parsing.
//!
//! The manifest names the directories to scan for map documents and the
//! defaults the CLI uses when loading and printing them.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::images::{DeferredImageLoader, ImageLoader, RasterImageLoader};

/// How image nodes acquire their pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Record image requests without reading files.
    #[default]
    Deferred,
    /// Decode image files and cut tiles from them.
    Raster,
}

impl ImageMode {
    pub fn loader(self) -> Box<dyn ImageLoader> {
        match self {
            ImageMode::Deferred => Box::new(DeferredImageLoader),
            ImageMode::Raster => Box::new(RasterImageLoader::new()),
        }
    }
}

/// Serialization used when printing a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Project manifest loaded from tilegraph.yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Directories to scan for documents.
    /// Defaults to the project root if empty.
    pub sources: Vec<String>,

    /// Patterns to exclude from discovery.
    pub excludes: Vec<String>,

    /// Default image loading mode.
    pub images: ImageMode,

    /// Default output format for `dump`.
    pub format: OutputFormat,
}

impl Manifest {
    /// Load manifest from a tilegraph.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read manifest: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse manifest from YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| GraphError::Source {
            message: format!("Invalid manifest: {}", e),
            help: Some("Check tilegraph.yaml syntax".to_string()),
        })
    }

    /// Check if a path matches any exclude pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy().replace('\\', "/");
        self.excludes.iter().any(|pattern| matches_pattern(&path, pattern))
    }

    /// Source directories, defaulting to the project root.
    pub fn effective_sources(&self) -> Vec<String> {
        if self.sources.is_empty() {
            vec![".".to_string()]
        } else {
            self.sources.clone()
        }
    }
}

/// Minimal glob support: `*.ext`, `dir/*`, `**/dir/*`, or a plain substring.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    if let Some(rest) = pattern.strip_prefix("**/") {
        return match rest.strip_suffix("/*") {
            Some(dir) => path.starts_with(&format!("{}/", dir)) || path.contains(&format!("/{}/", dir)),
            None => path.ends_with(rest) || path.contains(&format!("/{}", rest)),
        };
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        if !suffix.contains('/') {
            return path.ends_with(suffix);
        }
    }

    if let Some(dir) = pattern.strip_suffix("/*") {
        return path.starts_with(&format!("{}/", dir)) || path.contains(&format!("/{}/", dir));
    }

    path.contains(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
sources:
  - maps/
  - tilesets/
excludes:
  - "*.bak"
  - "**/autosave/*"
images: raster
format: yaml
"#;
        let manifest = Manifest::parse(yaml).unwrap();

        assert_eq!(manifest.sources, vec!["maps/", "tilesets/"]);
        assert_eq!(manifest.excludes, vec!["*.bak", "**/autosave/*"]);
        assert_eq!(manifest.images, ImageMode::Raster);
        assert_eq!(manifest.format, OutputFormat::Yaml);
    }

    #[test]
    fn test_parse_empty_manifest_uses_defaults() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.sources.is_empty());
        assert_eq!(manifest.images, ImageMode::Deferred);
        assert_eq!(manifest.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let err = Manifest::parse("images: vector").unwrap_err();
        assert!(matches!(err, GraphError::Source { .. }));
    }

    #[test]
    fn test_effective_sources() {
        let mut manifest = Manifest::default();
        assert_eq!(manifest.effective_sources(), vec!["."]);

        manifest.sources = vec!["maps/".to_string()];
        assert_eq!(manifest.effective_sources(), vec!["maps/"]);
    }

    #[test]
    fn test_is_excluded() {
        let manifest = Manifest {
            excludes: vec!["*.bak".to_string(), "**/autosave/*".to_string(), "scratch".to_string()],
            ..Default::default()
        };

        assert!(manifest.is_excluded(Path::new("level.tmx.bak")));
        assert!(manifest.is_excluded(Path::new("maps/autosave/level.tmx")));
        assert!(manifest.is_excluded(Path::new("autosave/level.tmx")));
        assert!(manifest.is_excluded(Path::new("maps/scratch/level.tmx")));
        assert!(!manifest.is_excluded(Path::new("maps/level.tmx")));
    }
}
