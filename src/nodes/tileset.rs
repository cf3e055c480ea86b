use log::{debug, warn};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use super::{project_list, unexpected, Element, Image, Node, Project, PropertyMap};
use crate::builder::ParseContext;
use crate::error::{GraphError, Result};
use crate::images::{ImageHandle, ImageRequest, Rect};
use crate::schema::{AttrSpec, Attributes, Caster, RawAttributes};

pub(super) const TILESET_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("firstgid", Caster::Int, "first gid of tileset"),
    AttrSpec::optional("source", Caster::Str, "filename of external data"),
    AttrSpec::optional("name", Caster::Str, "name of tileset"),
    AttrSpec::optional("tilewidth", Caster::Int, "max tile width in pixels"),
    AttrSpec::optional("tileheight", Caster::Int, "max tile height in pixels"),
    AttrSpec::defaulted("spacing", Caster::Int, "0", "pixels between each tile"),
    AttrSpec::defaulted("margin", Caster::Int, "0", "pixels between tiles and image edge"),
    AttrSpec::optional("tilecount", Caster::Int, "number of tiles in tileset"),
    AttrSpec::optional("columns", Caster::Int, "number of columns"),
    AttrSpec::optional("objectalignment", Caster::Str, "alignment of tile objects"),
];

pub(super) const TILE_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("id", Caster::Int, "local id"),
    AttrSpec::optional("gid", Caster::Int, "global id"),
    AttrSpec::optional("type", Caster::Str, "defined in editor"),
    AttrSpec::optional("terrain", Caster::Str, "terrain corners"),
    AttrSpec::optional("probability", Caster::Float, "random placement weight"),
];

pub(super) const FRAME_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("tileid", Caster::Int, "local id of the frame's tile"),
    AttrSpec::optional("duration", Caster::Int, "milliseconds to show the frame"),
];

pub(super) const TILE_OFFSET_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("x", Caster::Int, "horizontal tile offset"),
    AttrSpec::optional("y", Caster::Int, "vertical tile offset"),
];

pub(super) const GRID_SCHEMA: &[AttrSpec] = &[
    AttrSpec::defaulted("orientation", Caster::Str, "orthogonal", "grid orientation"),
    AttrSpec::optional("width", Caster::Int, "cell width"),
    AttrSpec::optional("height", Caster::Int, "cell height"),
];

pub(super) const TERRAIN_SCHEMA: &[AttrSpec] = &[
    AttrSpec::defaulted("name", Caster::Str, "", "terrain name"),
    AttrSpec::defaulted("tile", Caster::Int, "0", "local id of the representative tile"),
];

/// One sub-region cut from a tileset's sheet image.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub local_id: u32,
    /// Absent when the tileset has no `firstgid`.
    pub gid: Option<u32>,
    pub rect: Rect,
    pub handle: ImageHandle,
}

#[derive(Debug, Clone, Default)]
pub struct Tileset {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub image: Option<Image>,
    pub tiles: Vec<Tile>,
    pub tile_images: Vec<TileImage>,
}

impl Tileset {
    pub fn first_gid(&self) -> Option<i64> {
        self.attributes.int("firstgid")
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.str("name")
    }

    /// Per-tile override for a local id.
    pub fn tile(&self, local_id: i64) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id() == Some(local_id))
    }

    fn dimension(&self, name: &str) -> Result<i64> {
        let value = self.attributes.int(name).ok_or_else(|| GraphError::SchemaViolation {
            tag: "tileset".to_string(),
            attribute: name.to_string(),
            message: "required to cut tiles from the tileset image".to_string(),
        })?;
        if value <= 0 {
            return Err(GraphError::SchemaViolation {
                tag: "tileset".to_string(),
                attribute: name.to_string(),
                message: format!("must be positive, found {}", value),
            });
        }
        Ok(value)
    }

    fn spacing(&self, name: &str) -> Result<i64> {
        let value = self.attributes.int(name).unwrap_or(0);
        if value < 0 {
            return Err(GraphError::SchemaViolation {
                tag: "tileset".to_string(),
                attribute: name.to_string(),
                message: format!("must not be negative, found {}", value),
            });
        }
        Ok(value)
    }

    /// Cut the sheet into tile regions, row-major, and load each one.
    fn load_tiles(&mut self, ctx: &ParseContext<'_>) -> Result<()> {
        let Some(image) = &self.image else {
            return Ok(());
        };
        let Some(source) = image.source() else {
            return Ok(());
        };

        let tw = self.dimension("tilewidth")?;
        let th = self.dimension("tileheight")?;
        let spacing = self.spacing("spacing")?;
        let margin = self.spacing("margin")?;

        let Some((width, height)) = image.size() else {
            warn!(
                "tileset {} has no image dimensions; tiles not enumerated",
                self.name().unwrap_or("<unnamed>")
            );
            return Ok(());
        };
        let (width, height) = (i64::from(width), i64::from(height));

        let path = ctx.resolve_path(source);
        let colorkey = image.trans().map(str::to_string);
        let first_gid = self.first_gid();

        let rows = tile_origins(margin, height, th, spacing);
        let columns = tile_origins(margin, width, tw, spacing);
        let mut loaded = Vec::with_capacity(rows.len() * columns.len());

        for y in &rows {
            for x in &columns {
                let local_id = loaded.len() as u32;
                let rect = Rect::new(*x as u32, *y as u32, tw as u32, th as u32);
                let request = ImageRequest::new(&path)
                    .with_region(rect)
                    .with_colorkey(colorkey.clone());
                loaded.push(TileImage {
                    local_id,
                    gid: first_gid.map(|first| (first + i64::from(local_id)) as u32),
                    rect,
                    handle: ctx.load_image(&request)?,
                });
            }
        }

        debug!("cut {} tiles from {}", loaded.len(), path.display());
        self.tile_images = loaded;
        Ok(())
    }
}

/// Offsets along one axis at which a whole tile fits inside the margins.
fn tile_origins(margin: i64, extent: i64, tile: i64, spacing: i64) -> Vec<i64> {
    let last = extent - margin - tile;
    if last < margin {
        return Vec::new();
    }
    (margin..=last).step_by((tile + spacing) as usize).collect()
}

impl Element for Tileset {
    fn started(&mut self, _raw: &RawAttributes, _ctx: &ParseContext<'_>) -> Result<()> {
        match self.attributes.str("source") {
            Some(source) => Err(GraphError::UnsupportedFeature {
                feature: format!("external tileset '{}'", source),
                help: Some("Embed the tileset in the map document".to_string()),
            }),
            None => Ok(()),
        }
    }

    fn finish(&mut self, _text: Option<&str>, ctx: &ParseContext<'_>) -> Result<()> {
        self.load_tiles(ctx)
    }

    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Image(image) => self.image = Some(image),
            Node::Tile(tile) => self.tiles.push(tile),
            other => return Err(unexpected("tileset", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        let image = self
            .image
            .as_ref()
            .map_or(JsonValue::Null, Project::project_ref);
        out.insert("image".to_string(), image);
        out.insert("tiles".to_string(), project_list(&self.tiles));
        out.insert(
            "tile_images".to_string(),
            self.tile_images
                .iter()
                .map(|t| {
                    json!({
                        "local_id": t.local_id,
                        "gid": t.gid,
                        "rect": t.rect,
                    })
                })
                .collect(),
        );
    }
}

/// Per-tile metadata, or one cell of an unencoded data payload.
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Tile {
    pub fn id(&self) -> Option<i64> {
        self.attributes.int("id")
    }

    pub fn gid(&self) -> Option<i64> {
        self.attributes.int("gid")
    }
}

impl Element for Tile {}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub frames: Vec<Frame>,
}

impl Element for Animation {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Frame(frame) => self.frames.push(frame),
            other => return Err(unexpected("animation", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("frames".to_string(), project_list(&self.frames));
    }
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Frame {}

#[derive(Debug, Clone, Default)]
pub struct TileOffset {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for TileOffset {}

#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Grid {}

#[derive(Debug, Clone, Default)]
pub struct Terrain {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Terrain {}

#[derive(Debug, Clone, Default)]
pub struct TerrainTypes {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub terrains: Vec<Terrain>,
}

impl Element for TerrainTypes {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Terrain(terrain) => self.terrains.push(terrain),
            other => return Err(unexpected("terraintypes", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("terrains".to_string(), project_list(&self.terrains));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_origins_plain_sheet() {
        assert_eq!(tile_origins(0, 64, 32, 0), vec![0, 32]);
    }

    #[test]
    fn test_tile_origins_margin_and_spacing() {
        // 1px margin, 2px spacing, 16px tiles: 1, 19, 37 fit in 54
        assert_eq!(tile_origins(1, 54, 16, 2), vec![1, 19, 37]);
    }

    #[test]
    fn test_tile_origins_partial_tile_dropped() {
        assert_eq!(tile_origins(0, 40, 16, 0), vec![0, 16]);
    }

    #[test]
    fn test_tile_origins_too_small() {
        assert!(tile_origins(0, 8, 16, 0).is_empty());
        assert!(tile_origins(4, 20, 16, 0).is_empty());
    }
}
