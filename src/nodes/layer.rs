use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{project_list, unexpected, Element, Node, Project, PropertyMap, Tile};
use crate::builder::ParseContext;
use crate::data::{decode_layer, TileGrid};
use crate::error::{GraphError, Result};
use crate::gid::{decode_gid, Gid};
use crate::schema::{AttrSpec, Attributes, Caster, OPACITY, VISIBLE};

pub(super) const LAYER_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("id", Caster::Int, "unique layer id"),
    AttrSpec::defaulted("name", Caster::Str, "TileLayer", "name of layer"),
    AttrSpec::optional("width", Caster::Int, "width in tiles"),
    AttrSpec::optional("height", Caster::Int, "height in tiles"),
    AttrSpec::defaulted("offsetx", Caster::Int, "0", "horizontal draw offset"),
    AttrSpec::defaulted("offsety", Caster::Int, "0", "vertical draw offset"),
    VISIBLE,
    OPACITY,
];

pub(super) const DATA_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("encoding", Caster::Str, "text encoding of the payload"),
    AttrSpec::optional("compression", Caster::Str, "compression of the decoded bytes"),
];

pub(super) const CHUNK_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("x", Caster::Int, "chunk x in tiles"),
    AttrSpec::optional("y", Caster::Int, "chunk y in tiles"),
    AttrSpec::optional("width", Caster::Int, "chunk width in tiles"),
    AttrSpec::optional("height", Caster::Int, "chunk height in tiles"),
];

pub(super) const GROUP_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("name", Caster::Str, "name of group"),
    AttrSpec::defaulted("offsetx", Caster::Int, "0", "horizontal draw offset"),
    AttrSpec::defaulted("offsety", Caster::Int, "0", "vertical draw offset"),
    VISIBLE,
    OPACITY,
];

/// A tile layer.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub data: Option<Data>,
}

impl Layer {
    pub fn name(&self) -> Option<&str> {
        self.attributes.str("name")
    }

    /// The decoded grid of a finite layer.
    pub fn grid(&self) -> Option<&TileGrid> {
        self.data.as_ref().and_then(|data| data.grid.as_ref())
    }

    /// Chunks of an infinite layer.
    pub fn chunks(&self) -> &[Chunk] {
        self.data
            .as_ref()
            .map(|data| data.chunks.as_slice())
            .unwrap_or_default()
    }
}

impl Element for Layer {
    fn finish(&mut self, _text: Option<&str>, _ctx: &ParseContext<'_>) -> Result<()> {
        if self.data.is_none() {
            return Err(GraphError::MissingLayerData {
                message: format!("layer '{}' has no <data>", self.name().unwrap_or_default()),
            });
        }
        Ok(())
    }

    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Data(_) if self.data.is_some() => {
                return Err(GraphError::document("a tile layer takes exactly one <data>"))
            }
            Node::Data(data) => self.data = Some(data),
            other => return Err(unexpected("layer", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        let data = self
            .data
            .as_ref()
            .map_or(JsonValue::Null, Project::project_ref);
        out.insert("data".to_string(), data);
    }
}

/// A tile payload: encoded text, one tile child per cell, or chunks.
#[derive(Debug, Clone, Default)]
pub struct Data {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub tiles: Vec<Tile>,
    pub chunks: Vec<Chunk>,
    pub grid: Option<TileGrid>,
}

impl Data {
    pub fn encoding(&self) -> Option<&str> {
        self.attributes.str("encoding")
    }

    pub fn compression(&self) -> Option<&str> {
        self.attributes.str("compression")
    }

    /// Gids of per-cell tile children, flags split off; a missing gid is
    /// an empty cell.
    fn cell_gids(&self) -> Result<Vec<Gid>> {
        self.tiles
            .iter()
            .map(|tile| {
                let gid = tile.gid().unwrap_or(0);
                u32::try_from(gid)
                    .map(decode_gid)
                    .map_err(|_| GraphError::SchemaViolation {
                        tag: "tile".to_string(),
                        attribute: "gid".to_string(),
                        message: format!("{} is not a valid tile id", gid),
                    })
            })
            .collect()
    }
}

/// Width and height of the enclosing layer, falling back to the map's.
fn layer_size(ctx: &ParseContext<'_>) -> Result<(usize, usize)> {
    let declared = ctx.ancestors().find_map(|node| match node {
        Node::Layer(_) | Node::Map(_) => {
            let attrs = node.attributes();
            attrs.int("width").zip(attrs.int("height"))
        }
        _ => None,
    });

    let (width, height) = declared.ok_or_else(|| GraphError::SchemaViolation {
        tag: "layer".to_string(),
        attribute: "width".to_string(),
        message: "tile data needs the layer or map dimensions".to_string(),
    })?;

    Ok((to_extent("width", width)?, to_extent("height", height)?))
}

fn to_extent(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| GraphError::SchemaViolation {
        tag: "layer".to_string(),
        attribute: name.to_string(),
        message: format!("{} is not a valid dimension", value),
    })
}

fn payload_text(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

impl Element for Data {
    fn finish(&mut self, text: Option<&str>, ctx: &ParseContext<'_>) -> Result<()> {
        let grid = if let Some(text) = payload_text(text) {
            let (width, height) = layer_size(ctx)?;
            decode_layer(text, self.encoding(), self.compression(), width, height)?
        } else if !self.tiles.is_empty() {
            let (width, height) = layer_size(ctx)?;
            TileGrid::from_gids(self.cell_gids()?, width, height)?
        } else if !self.chunks.is_empty() {
            return Ok(());
        } else {
            return Err(GraphError::MissingLayerData {
                message: "<data> has no text, no <tile> children and no chunks".to_string(),
            });
        };

        self.grid = Some(grid);
        Ok(())
    }

    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Tile(tile) => self.tiles.push(tile),
            Node::Chunk(chunk) => self.chunks.push(chunk),
            other => return Err(unexpected("data", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert(
            "grid".to_string(),
            self.grid.as_ref().map_or(JsonValue::Null, TileGrid::to_json),
        );
        if !self.chunks.is_empty() {
            out.insert("chunks".to_string(), project_list(&self.chunks));
        }
    }
}

/// A rectangular piece of an infinite layer.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub grid: Option<TileGrid>,
}

impl Chunk {
    /// Top-left corner in tiles.
    pub fn origin(&self) -> (i64, i64) {
        (
            self.attributes.int("x").unwrap_or(0),
            self.attributes.int("y").unwrap_or(0),
        )
    }

    fn size(&self) -> Result<(usize, usize)> {
        let extent = |name: &str| -> Result<usize> {
            let value = self.attributes.int(name).ok_or_else(|| GraphError::SchemaViolation {
                tag: "chunk".to_string(),
                attribute: name.to_string(),
                message: "chunk dimensions are required to decode its tiles".to_string(),
            })?;
            to_extent(name, value)
        };
        Ok((extent("width")?, extent("height")?))
    }
}

impl Element for Chunk {
    fn finish(&mut self, text: Option<&str>, ctx: &ParseContext<'_>) -> Result<()> {
        let text = payload_text(text).ok_or_else(|| GraphError::MissingLayerData {
            message: "<chunk> has no tile text".to_string(),
        })?;

        let (encoding, compression) = match ctx.parent() {
            Some(Node::Data(data)) => (data.encoding(), data.compression()),
            _ => (None, None),
        };

        let (width, height) = self.size()?;
        self.grid = Some(decode_layer(text, encoding, compression, width, height)?);
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert(
            "grid".to_string(),
            self.grid.as_ref().map_or(JsonValue::Null, TileGrid::to_json),
        );
    }
}

/// Layer group. Its children are not modeled; only properties merge.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Group {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::images::DeferredImageLoader;
    use crate::source::SourceFormat;

    use super::*;

    fn build(text: &str) -> Result<Node> {
        crate::parse_str(text, SourceFormat::Markup, Path::new("."), &DeferredImageLoader)
    }

    fn first_layer(text: &str) -> Layer {
        let map = build(text).unwrap().into_map().unwrap();
        let layer = map.tile_layers().next().unwrap().clone();
        layer
    }

    #[test]
    fn test_layer_without_data() {
        let err = build(r#"<map width="2" height="1"><layer name="a"></layer></map>"#).unwrap_err();
        assert!(matches!(err, GraphError::MissingLayerData { ref message } if message.contains("'a'")));
    }

    #[test]
    fn test_second_data_is_rejected() {
        let err = build(
            r#"<map width="2" height="1"><layer>
                <data encoding="csv">1,2</data>
                <data encoding="csv">3,4</data>
            </layer></map>"#,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::MalformedDocument { .. }));
    }

    #[test]
    fn test_blank_data_is_missing() {
        let err = build(r#"<map width="2" height="1"><layer><data encoding="csv">   </data></layer></map>"#)
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingLayerData { .. }));
    }

    #[test]
    fn test_empty_chunk_is_missing() {
        let err = build(
            r#"<map width="4" height="2" infinite="1"><layer width="4" height="2">
                <data encoding="csv"><chunk x="0" y="0" width="2" height="1"></chunk></data>
            </layer></map>"#,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::MissingLayerData { ref message } if message.contains("<chunk>")));
    }

    #[test]
    fn test_tile_children_split_flags() {
        let layer = first_layer(
            r#"<map width="2" height="1"><layer><data>
                <tile gid="2147483653"></tile><tile></tile>
            </data></layer></map>"#,
        );

        let grid = layer.grid().unwrap();
        assert_eq!(grid.to_rows(), vec![vec![5, 0]]);
        assert!(grid.flags(0, 0).unwrap().flipped_horizontally);
        assert!(grid.flags(1, 0).unwrap().is_empty());
    }

    #[test]
    fn test_layer_projection_nests_grid() {
        let layer = first_layer(r#"<map width="2" height="1"><layer name="g"><data encoding="csv">1,0</data></layer></map>"#);
        let json = layer.project_ref();
        assert_eq!(json["name"], "g");
        assert_eq!(json["data"]["grid"], serde_json::json!([[1, 0]]));
    }
}
