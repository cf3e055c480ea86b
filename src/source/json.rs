//! Event source over the editor's JSON map format (`.json`, `.tmj`).
//!
//! The JSON encoding nests differently from markup: images are inlined as
//! `image`/`imagewidth` members, layers carry a `type` discriminator, tile
//! data may be an array of ids, and properties come either as a list or as
//! a legacy name-to-value object. This module rewrites it into the same
//! start/end event contract the markup source produces.

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::builder::Event;
use crate::error::{GraphError, Result};
use crate::schema::RawAttributes;

type Object = JsonMap<String, JsonValue>;

/// Parse a JSON document into its full event sequence.
pub fn events(source: &str) -> Result<Vec<Event>> {
    let root: JsonValue = serde_json::from_str(source).map_err(|e| GraphError::Source {
        message: format!("invalid JSON: {}", e),
        help: Some("Check that the document is valid JSON".to_string()),
    })?;

    let root = root.as_object().ok_or_else(|| GraphError::Source {
        message: "document root is not a JSON object".to_string(),
        help: None,
    })?;

    let mut out = Events::default();
    out.map(root)?;
    Ok(out.events)
}

#[derive(Default)]
struct Events {
    events: Vec<Event>,
}

impl Events {
    fn open(&mut self, tag: &str, attributes: RawAttributes) {
        self.events.push(Event::start(tag, attributes));
    }

    fn close(&mut self, tag: &str, text: Option<String>) {
        self.events.push(Event::end(tag, text));
    }

    fn leaf(&mut self, tag: &str, attributes: RawAttributes, text: Option<String>) {
        self.open(tag, attributes);
        self.close(tag, text);
    }

    fn map(&mut self, map: &Object) -> Result<()> {
        self.open("map", scalars(map, &[]));
        self.properties(map);
        for tileset in objects(map, "tilesets") {
            self.tileset(tileset)?;
        }
        for layer in objects(map, "layers") {
            self.layer(layer)?;
        }
        self.close("map", None);
        Ok(())
    }

    fn tileset(&mut self, tileset: &Object) -> Result<()> {
        self.open("tileset", scalars(tileset, &["image", "imagewidth", "imageheight", "transparentcolor"]));
        self.properties(tileset);

        if tileset.contains_key("image") {
            self.image(tileset);
        }
        if let Some(offset) = tileset.get("tileoffset").and_then(JsonValue::as_object) {
            self.leaf("tileoffset", scalars(offset, &[]), None);
        }
        if let Some(grid) = tileset.get("grid").and_then(JsonValue::as_object) {
            self.leaf("grid", scalars(grid, &[]), None);
        }
        if tileset.get("wangsets").is_some_and(|w| !is_empty(w)) {
            return Err(GraphError::unsupported("wangsets"));
        }
        for tile in objects(tileset, "tiles") {
            self.tile(tile)?;
        }

        self.close("tileset", None);
        Ok(())
    }

    fn tile(&mut self, tile: &Object) -> Result<()> {
        self.open("tile", scalars(tile, &["image", "imagewidth", "imageheight"]));
        self.properties(tile);
        if tile.contains_key("image") {
            self.image(tile);
        }
        if let Some(frames) = tile.get("animation").and_then(JsonValue::as_array) {
            self.open("animation", RawAttributes::new());
            for frame in frames.iter().filter_map(JsonValue::as_object) {
                self.leaf("frame", scalars(frame, &[]), None);
            }
            self.close("animation", None);
        }
        if let Some(group) = tile.get("objectgroup").and_then(JsonValue::as_object) {
            self.object_group(group)?;
        }
        self.close("tile", None);
        Ok(())
    }

    /// Inlined `image`, `imagewidth`, `imageheight` and
    /// `transparentcolor` members become an `<image>` child.
    fn image(&mut self, owner: &Object) {
        let mut attributes = RawAttributes::new();
        for (from, to) in [
            ("image", "source"),
            ("imagewidth", "width"),
            ("imageheight", "height"),
            ("transparentcolor", "trans"),
        ] {
            if let Some(value) = owner.get(from).and_then(scalar_text) {
                attributes.insert(to.to_string(), value);
            }
        }
        self.leaf("image", attributes, None);
    }

    fn layer(&mut self, layer: &Object) -> Result<()> {
        let kind = layer.get("type").and_then(JsonValue::as_str).unwrap_or("tilelayer");
        match kind {
            "tilelayer" => self.tile_layer(layer),
            "objectgroup" => self.object_group(layer),
            "imagelayer" => {
                self.open("imagelayer", scalars(layer, &["image", "transparentcolor"]));
                self.properties(layer);
                self.image(layer);
                self.close("imagelayer", None);
                Ok(())
            }
            "group" => {
                self.open("group", scalars(layer, &[]));
                self.properties(layer);
                for child in objects(layer, "layers") {
                    self.layer(child)?;
                }
                self.close("group", None);
                Ok(())
            }
            other => Err(GraphError::UnsupportedFeature {
                feature: format!("layer type '{}'", other),
                help: None,
            }),
        }
    }

    fn tile_layer(&mut self, layer: &Object) -> Result<()> {
        self.open("layer", scalars(layer, &["encoding", "compression"]));
        self.properties(layer);

        let mut attributes = RawAttributes::new();
        for key in ["encoding", "compression"] {
            if let Some(value) = layer.get(key).and_then(scalar_text).filter(|v| !v.is_empty()) {
                attributes.insert(key.to_string(), value);
            }
        }

        match layer.get("data") {
            Some(JsonValue::Array(ids)) => {
                attributes.insert("encoding".to_string(), "csv".to_string());
                self.leaf("data", attributes, Some(id_list(ids)?));
            }
            Some(JsonValue::String(text)) => {
                self.leaf("data", attributes, Some(text.clone()));
            }
            _ => {
                self.open("data", attributes);
                for chunk in objects(layer, "chunks") {
                    self.chunk(chunk)?;
                }
                self.close("data", None);
            }
        }

        self.close("layer", None);
        Ok(())
    }

    fn chunk(&mut self, chunk: &Object) -> Result<()> {
        let text = match chunk.get("data") {
            Some(JsonValue::Array(ids)) => Some(id_list(ids)?),
            Some(JsonValue::String(text)) => Some(text.clone()),
            _ => None,
        };
        self.leaf("chunk", scalars(chunk, &[]), text);
        Ok(())
    }

    fn object_group(&mut self, group: &Object) -> Result<()> {
        self.open("objectgroup", scalars(group, &[]));
        self.properties(group);
        for object in objects(group, "objects") {
            self.object(object)?;
        }
        self.close("objectgroup", None);
        Ok(())
    }

    fn object(&mut self, object: &Object) -> Result<()> {
        self.open("object", scalars(object, &["ellipse", "point"]));
        self.properties(object);

        if object.get("ellipse").and_then(JsonValue::as_bool) == Some(true) {
            self.leaf("ellipse", RawAttributes::new(), None);
        }
        if object.get("point").and_then(JsonValue::as_bool) == Some(true) {
            self.leaf("point", RawAttributes::new(), None);
        }
        for tag in ["polygon", "polyline"] {
            if let Some(points) = object.get(tag).and_then(JsonValue::as_array) {
                let mut attributes = RawAttributes::new();
                attributes.insert("points".to_string(), point_list(points)?);
                self.leaf(tag, attributes, None);
            }
        }
        if let Some(text) = object.get("text").and_then(JsonValue::as_object) {
            let content = text.get("text").and_then(JsonValue::as_str).map(str::to_string);
            self.leaf("text", scalars(text, &["text"]), content);
        }

        self.close("object", None);
        Ok(())
    }

    /// Both the list form and the legacy object form with an optional
    /// `propertytypes` sibling.
    fn properties(&mut self, owner: &Object) {
        let entries: Vec<RawAttributes> = match owner.get("properties") {
            Some(JsonValue::Array(list)) => list
                .iter()
                .filter_map(JsonValue::as_object)
                .map(|p| {
                    let mut attributes = RawAttributes::new();
                    for key in ["name", "type"] {
                        if let Some(value) = p.get(key).and_then(scalar_text) {
                            attributes.insert(key.to_string(), value);
                        }
                    }
                    if let Some(value) = p.get("value").and_then(value_text) {
                        attributes.insert("value".to_string(), value);
                    }
                    attributes
                })
                .collect(),
            Some(JsonValue::Object(legacy)) => {
                let types = owner.get("propertytypes").and_then(JsonValue::as_object);
                legacy
                    .iter()
                    .map(|(name, value)| {
                        let mut attributes = RawAttributes::new();
                        attributes.insert("name".to_string(), name.clone());
                        if let Some(kind) = types.and_then(|t| t.get(name)).and_then(scalar_text) {
                            attributes.insert("type".to_string(), kind);
                        }
                        if let Some(value) = value_text(value) {
                            attributes.insert("value".to_string(), value);
                        }
                        attributes
                    })
                    .collect()
            }
            _ => return,
        };

        if entries.is_empty() {
            return;
        }
        self.open("properties", RawAttributes::new());
        for attributes in entries {
            self.leaf("property", attributes, None);
        }
        self.close("properties", None);
    }
}

/// Scalar members as raw attributes, skipping `exclude`.
fn scalars(object: &Object, exclude: &[&str]) -> RawAttributes {
    object
        .iter()
        .filter(|(key, _)| !exclude.contains(&key.as_str()))
        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
        .collect()
}

/// Strings verbatim, numbers and booleans as their JSON text.
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like [`scalar_text`], but structured property values keep their JSON.
fn value_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::Array(_) | JsonValue::Object(_) => Some(value.to_string()),
        scalar => scalar_text(scalar),
    }
}

fn objects<'a>(owner: &'a Object, key: &str) -> impl Iterator<Item = &'a Object> {
    owner
        .get(key)
        .and_then(JsonValue::as_array)
        .into_iter()
        .flatten()
        .filter_map(JsonValue::as_object)
}

fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        JsonValue::Null => true,
        _ => false,
    }
}

fn id_list(ids: &[JsonValue]) -> Result<String> {
    let ids = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            id.as_u64()
                .map(|id| id.to_string())
                .ok_or_else(|| GraphError::MalformedPayload {
                    message: format!("tile id {} is not an unsigned integer", id),
                    offset: Some(i),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ids.join(","))
}

fn point_list(points: &[JsonValue]) -> Result<String> {
    let pairs = points
        .iter()
        .map(|point| {
            let coordinate = |axis: &str| point.get(axis).and_then(JsonValue::as_f64);
            match (coordinate("x"), coordinate("y")) {
                (Some(x), Some(y)) => Ok(format!("{},{}", x, y)),
                _ => Err(GraphError::GeometryParse {
                    token: point.to_string(),
                    message: "point needs numeric x and y".to_string(),
                }),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(pairs.join(" "))
}
