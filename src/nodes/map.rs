use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{
    project_list, Element, ImageLayer, Layer, Node, ObjectGroup, Project, PropertyMap, Tileset,
};
use crate::error::Result;
use crate::schema::{AttrSpec, Attributes, Caster};

pub(super) const SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("version", Caster::Str, "format version"),
    AttrSpec::optional("tiledversion", Caster::Str, "editor version that saved the file"),
    AttrSpec::defaulted("orientation", Caster::Str, "orthogonal", "map orientation"),
    AttrSpec::defaulted("renderorder", Caster::Str, "right-down", "tile render order"),
    AttrSpec::defaulted("compressionlevel", Caster::Int, "-1", "compression level for tile data"),
    AttrSpec::optional("width", Caster::Int, "map width in tiles"),
    AttrSpec::optional("height", Caster::Int, "map height in tiles"),
    AttrSpec::optional("tilewidth", Caster::Int, "tile width in pixels"),
    AttrSpec::optional("tileheight", Caster::Int, "tile height in pixels"),
    AttrSpec::optional("hexsidelength", Caster::Float, "hex side length"),
    AttrSpec::optional("staggeraxis", Caster::Str, "stagger axis"),
    AttrSpec::optional("staggerindex", Caster::Str, "stagger index"),
    AttrSpec::optional("backgroundcolor", Caster::Str, "background colour"),
    AttrSpec::optional("nextlayerid", Caster::Int, "next free layer id"),
    AttrSpec::optional("nextobjectid", Caster::Int, "next free object id"),
    AttrSpec::defaulted("infinite", Caster::Bool, "false", "map uses chunked layers"),
];

/// A layer in map order.
#[derive(Debug, Clone)]
pub enum MapLayer {
    Tiles(Layer),
    Image(ImageLayer),
}

impl MapLayer {
    pub fn name(&self) -> Option<&str> {
        match self {
            MapLayer::Tiles(layer) => layer.attributes.str("name"),
            MapLayer::Image(layer) => layer.attributes.str("name"),
        }
    }

    fn project(&self) -> JsonValue {
        match self {
            MapLayer::Tiles(layer) => layer.project_ref(),
            MapLayer::Image(layer) => layer.project_ref(),
        }
    }
}

/// The root of a map document.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub tilesets: Vec<Tileset>,
    pub layers: Vec<MapLayer>,
    pub objectgroups: Vec<ObjectGroup>,
}

impl Map {
    pub fn width(&self) -> Option<i64> {
        self.attributes.int("width")
    }

    pub fn height(&self) -> Option<i64> {
        self.attributes.int("height")
    }

    pub fn tile_size(&self) -> Option<(i64, i64)> {
        Some((self.attributes.int("tilewidth")?, self.attributes.int("tileheight")?))
    }

    pub fn is_infinite(&self) -> bool {
        self.attributes.bool("infinite").unwrap_or(false)
    }

    /// Tile layers in map order.
    pub fn tile_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter_map(|layer| match layer {
            MapLayer::Tiles(layer) => Some(layer),
            MapLayer::Image(_) => None,
        })
    }

    pub fn image_layers(&self) -> impl Iterator<Item = &ImageLayer> {
        self.layers.iter().filter_map(|layer| match layer {
            MapLayer::Image(layer) => Some(layer),
            MapLayer::Tiles(_) => None,
        })
    }

    /// The tileset whose range contains `gid`: the one with the largest
    /// `firstgid` not above it.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .filter(|ts| ts.first_gid().is_some_and(|first| first <= i64::from(gid)))
            .max_by_key(|ts| ts.first_gid())
    }

    /// Whole-graph projection.
    pub fn project(&self) -> JsonValue {
        self.project_ref()
    }
}

impl Element for Map {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Tileset(tileset) => self.tilesets.push(tileset),
            Node::Layer(layer) => self.layers.push(MapLayer::Tiles(layer)),
            Node::ImageLayer(layer) => self.layers.push(MapLayer::Image(layer)),
            Node::ObjectGroup(group) => self.objectgroups.push(group),
            other => return Err(super::unexpected("map", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("tilesets".to_string(), project_list(&self.tilesets));
        out.insert(
            "layers".to_string(),
            JsonValue::Array(self.layers.iter().map(MapLayer::project).collect()),
        );
        out.insert(
            "objectgroups".to_string(),
            project_list(&self.objectgroups),
        );
    }
}
