//! File system scanner for map documents.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::source::SourceFormat;

use super::manifest::Manifest;

/// Documents found by a scan, grouped by encoding.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub markup: Vec<PathBuf>,
    pub json: Vec<PathBuf>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.markup.len() + self.json.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Record a file if its extension is supported.
    pub fn push(&mut self, path: PathBuf) -> bool {
        match SourceFormat::from_path(&path) {
            Ok(SourceFormat::Markup) => self.markup.push(path),
            Ok(SourceFormat::Json) => self.json.push(path),
            Err(_) => return false,
        }
        true
    }

    /// All documents, markup first, each group sorted.
    pub fn documents(&self) -> Vec<PathBuf> {
        let mut markup = self.markup.clone();
        let mut json = self.json.clone();
        markup.sort();
        json.sort();
        markup.extend(json);
        markup
    }

    pub fn merge(&mut self, other: ScanResult) {
        self.markup.extend(other.markup);
        self.json.extend(other.json);
    }
}

/// Recursively collect supported documents under `root`, skipping
/// excluded paths. A missing root yields nothing.
pub fn scan_directory(root: &Path, manifest: &Manifest) -> ScanResult {
    let mut result = ScanResult::new();

    let files = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| !manifest.is_excluded(path.strip_prefix(root).unwrap_or(path)));

    for path in files {
        result.push(path);
    }
    result
}

/// Scan each source directory, resolved against `base_path`.
pub fn scan_sources(sources: &[String], base_path: &Path, manifest: &Manifest) -> ScanResult {
    sources
        .iter()
        .map(|source| base_path.join(source))
        .fold(ScanResult::new(), |mut acc, dir| {
            acc.merge(scan_directory(&dir, manifest));
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(scan_directory(dir.path(), &Manifest::default()).is_empty());
    }

    #[test]
    fn test_scan_groups_by_format() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("maps/sub")).unwrap();

        fs::write(dir.path().join("maps/forest.tmx"), "<map/>").unwrap();
        fs::write(dir.path().join("maps/sub/terrain.tsx"), "<tileset/>").unwrap();
        fs::write(dir.path().join("maps/cave.tmj"), "{}").unwrap();
        fs::write(dir.path().join("maps/notes.txt"), "hi").unwrap();

        let result = scan_directory(dir.path(), &Manifest::default());
        assert_eq!(result.markup.len(), 2);
        assert_eq!(result.json.len(), 1);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn test_scan_with_excludes() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("autosave")).unwrap();
        fs::write(dir.path().join("level.tmx"), "<map/>").unwrap();
        fs::write(dir.path().join("autosave/level.tmx"), "<map/>").unwrap();

        let manifest = Manifest {
            excludes: vec!["**/autosave/*".to_string()],
            ..Default::default()
        };
        let result = scan_directory(dir.path(), &manifest);

        assert_eq!(result.markup.len(), 1);
        assert!(!result.markup[0].to_string_lossy().contains("autosave"));
    }

    #[test]
    fn test_documents_are_sorted() {
        let mut result = ScanResult::new();
        result.push(PathBuf::from("b.tmx"));
        result.push(PathBuf::from("z.json"));
        result.push(PathBuf::from("a.tmx"));
        assert!(!result.push(PathBuf::from("c.png")));

        assert_eq!(
            result.documents(),
            vec![PathBuf::from("a.tmx"), PathBuf::from("b.tmx"), PathBuf::from("z.json")]
        );
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        assert!(scan_directory(Path::new("/nonexistent/path"), &Manifest::default()).is_empty());
    }
}
