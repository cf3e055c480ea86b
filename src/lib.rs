//! tilegraph - typed document graphs from tile-map editor files
//!
//! Reads maps written by a tile-map editor, in either its markup encoding
//! (`.tmx`) or its JSON encoding (`.tmj`), and builds one strongly typed
//! graph: a [`Map`] owning tilesets, layers with decoded tile grids, and
//! object groups with map-space geometry.
//!
//! ```ignore
//! let map = tilegraph::load_map("levels/forest.tmx")?;
//! for layer in map.tile_layers() {
//!     println!("{}: {:?}", layer.name().unwrap_or("?"), layer.grid().map(|g| g.width()));
//! }
//! ```

pub mod builder;
pub mod cli;
pub mod colour;
pub mod data;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod gid;
pub mod images;
pub mod nodes;
pub mod output;
pub mod schema;
pub mod source;

use std::path::Path;

use log::info;

pub use builder::{Event, EventKind, GraphBuilder, ParseContext};
pub use colour::Colour;
pub use data::{decode_layer, TileGrid};
pub use discovery::{discover, discover_paths, DiscoveryResult, Manifest};
pub use error::{GraphError, Result};
pub use geometry::{bounds, parse_points, translate, Point};
pub use gid::{decode_gid, Gid, TileFlags};
pub use images::{DeferredImageLoader, ImageHandle, ImageLoader, ImageRequest, RasterImageLoader, Rect};
pub use nodes::{Map, MapLayer, Node, NodeKind};
pub use schema::{Attributes, Value};
pub use source::SourceFormat;

/// Build a graph from document text.
///
/// Relative image paths resolve against `base_dir`.
pub fn parse_str(
    text: &str,
    format: SourceFormat,
    base_dir: &Path,
    images: &dyn ImageLoader,
) -> Result<Node> {
    let events = source::events(format, text)?;
    GraphBuilder::new(images, base_dir).build(events)
}

/// Read and build any supported document; the root may be a map, a
/// tileset or a template.
pub fn load(path: impl AsRef<Path>, images: &dyn ImageLoader) -> Result<Node> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| GraphError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read document: {}", e),
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let node = parse_str(&text, format, base_dir, images)?;
    info!("loaded {} ({} <{}>)", path.display(), format, node.kind().tag());
    Ok(node)
}

/// Load a map without touching image files.
pub fn load_map(path: impl AsRef<Path>) -> Result<Map> {
    load(path, &DeferredImageLoader)?.into_map()
}

/// Load a map with a caller-supplied image loader.
pub fn load_map_with(path: impl AsRef<Path>, images: &dyn ImageLoader) -> Result<Map> {
    load(path, images)?.into_map()
}
