//! Document discovery for tilegraph projects.
//!
//! Finds map, tileset and template documents under a project directory,
//! either by scanning everything or by following a `tilegraph.yaml`
//! manifest.
//!
//! # Example
//!
//! ```ignore
//! use tilegraph::discovery::discover;
//!
//! let result = discover("./my-game")?;
//! for path in result.documents() {
//!     println!("{}", path.display());
//! }
//! ```

mod manifest;
mod scanner;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use manifest::{ImageMode, Manifest, OutputFormat};
pub use scanner::{scan_directory, scan_sources, ScanResult};

/// The name of the manifest file.
pub const MANIFEST_FILENAME: &str = "tilegraph.yaml";

/// Result of discovering documents in a project.
#[derive(Debug)]
pub struct DiscoveryResult {
    /// The project root directory.
    pub root: PathBuf,

    /// The loaded manifest (default if no tilegraph.yaml was found).
    pub manifest: Manifest,

    /// Whether a tilegraph.yaml manifest was found.
    pub has_manifest: bool,

    pub scan: ScanResult,
}

impl DiscoveryResult {
    /// Every discovered document, in a stable order.
    pub fn documents(&self) -> Vec<PathBuf> {
        self.scan.documents()
    }
}

/// Discover documents in a project directory.
///
/// Uses the manifest's sources when `tilegraph.yaml` exists at `root`,
/// otherwise scans the whole directory.
pub fn discover(root: impl AsRef<Path>) -> Result<DiscoveryResult> {
    let root = root.as_ref().to_path_buf();

    let manifest_path = root.join(MANIFEST_FILENAME);
    let (manifest, has_manifest) = if manifest_path.exists() {
        (Manifest::load(&manifest_path)?, true)
    } else {
        (Manifest::default(), false)
    };

    let scan = scan_sources(&manifest.effective_sources(), &root, &manifest);

    Ok(DiscoveryResult {
        root,
        manifest,
        has_manifest,
        scan,
    })
}

/// Discover documents from explicit files and directories, bypassing any
/// manifest.
pub fn discover_paths(paths: &[PathBuf]) -> Result<DiscoveryResult> {
    let manifest = Manifest::default();
    let mut scan = ScanResult::new();

    for path in paths {
        if path.is_dir() {
            scan.merge(scan_directory(path, &manifest));
        } else if path.is_file() {
            scan.push(path.clone());
        }
    }

    let root = paths
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(DiscoveryResult {
        root,
        manifest,
        has_manifest: false,
        scan,
    })
}

/// Load the nearest `tilegraph.yaml` at or above `start`.
pub fn find_manifest(start: &Path) -> Result<Option<Manifest>> {
    for dir in start.ancestors() {
        let candidate = dir.join(MANIFEST_FILENAME);
        if candidate.is_file() {
            return Manifest::load(&candidate).map(Some);
        }
    }
    Ok(None)
}
