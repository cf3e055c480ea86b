//! List command implementation.
//!
//! Discovers documents and prints what each one contains.

use std::path::PathBuf;

use clap::Args;

use crate::discovery::{discover, discover_paths};
use crate::error::Result;
use crate::images::DeferredImageLoader;
use crate::nodes::{Map, Node};
use crate::output::{display_path, plural, Printer};

/// List discovered documents
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Files or directories to scan (default: current directory)
    pub paths: Vec<PathBuf>,
}

pub fn run(args: ListArgs, printer: &Printer) -> Result<()> {
    let discovery = if args.paths.is_empty() {
        discover(".")?
    } else {
        discover_paths(&args.paths)?
    };

    if discovery.has_manifest {
        printer.info("Manifest", &display_path(&discovery.root.join(crate::discovery::MANIFEST_FILENAME)));
    }

    for path in discovery.documents() {
        let line = match crate::load(&path, &DeferredImageLoader) {
            Ok(node) => format!("{} {}", display_path(&path), printer.dim(&summary(&node))),
            Err(err) => format!("{} {}", display_path(&path), printer.dim(&format!("(error: {})", err))),
        };
        printer.info("Found", &line);
    }

    printer.success(
        "Listed",
        &plural(discovery.scan.total(), "document", "documents"),
    );
    Ok(())
}

/// One-line description of a document root.
pub fn summary(node: &Node) -> String {
    match node {
        Node::Map(map) => map_summary(map),
        Node::Tileset(tileset) => format!(
            "tileset {}, {}",
            tileset.name().unwrap_or("(unnamed)"),
            plural(tileset.tiles.len(), "tile", "tiles")
        ),
        other => format!("<{}>", other.kind().tag()),
    }
}

fn map_summary(map: &Map) -> String {
    let size = match (map.width(), map.height()) {
        (Some(w), Some(h)) => format!("{}x{}", w, h),
        _ => "unsized".to_string(),
    };
    let objects: usize = map.objectgroups.iter().map(|g| g.objects.len()).sum();
    format!(
        "map {}{}, {}, {}, {}",
        size,
        if map.is_infinite() { " infinite" } else { "" },
        plural(map.tilesets.len(), "tileset", "tilesets"),
        plural(map.layers.len(), "layer", "layers"),
        plural(objects, "object", "objects"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFormat;
    use std::path::Path;

    #[test]
    fn test_map_summary() {
        let node = crate::parse_str(
            r#"<map width="3" height="2">
                 <tileset firstgid="1" name="t"/>
                 <layer name="a"><data encoding="csv">0,0,0,0,0,0</data></layer>
                 <objectgroup><object id="1"/><object id="2"/></objectgroup>
               </map>"#,
            SourceFormat::Markup,
            Path::new("."),
            &DeferredImageLoader,
        )
        .unwrap();

        assert_eq!(summary(&node), "map 3x2, 1 tileset, 1 layer, 2 objects");
    }

    #[test]
    fn test_other_roots() {
        let node = crate::parse_str("<template/>", SourceFormat::Markup, Path::new("."), &DeferredImageLoader).unwrap();
        assert_eq!(summary(&node), "<template>");
    }
}
