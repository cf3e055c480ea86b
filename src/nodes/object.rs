use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{project_list, unexpected, Element, Node, PropertyMap, Tileset};
use crate::builder::ParseContext;
use crate::error::{GraphError, Result};
use crate::geometry::{bounds, translate, Point};
use crate::gid::{decode_gid, Gid};
use crate::schema::{AttrSpec, Attributes, Caster, RawAttributes, Value, COLOR, OPACITY, VISIBLE};

pub(super) const NO_ATTRIBUTES: &[AttrSpec] = &[];

pub(super) const OBJECT_GROUP_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("name", Caster::Str, "name of group"),
    AttrSpec::defaulted("x", Caster::Float, "0", "not used"),
    AttrSpec::defaulted("y", Caster::Float, "0", "not used"),
    AttrSpec::optional("width", Caster::Int, "not used"),
    AttrSpec::optional("height", Caster::Int, "not used"),
    COLOR,
    VISIBLE,
    OPACITY,
];

pub(super) const OBJECT_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("name", Caster::Str, "name of object"),
    AttrSpec::optional("id", Caster::Int, "unique id assigned to object"),
    AttrSpec::optional("type", Caster::Str, "defined by editor"),
    AttrSpec::optional("x", Caster::Float, "x coordinate in pixels"),
    AttrSpec::optional("y", Caster::Float, "y coordinate in pixels"),
    AttrSpec::optional("width", Caster::Float, "pixel width"),
    AttrSpec::optional("height", Caster::Float, "pixel height"),
    AttrSpec::defaulted("rotation", Caster::Float, "0", "rotation in degrees"),
    AttrSpec::optional("gid", Caster::Int, "tile reference with flip flags"),
    AttrSpec::optional("template", Caster::Str, "path to template, optional"),
    VISIBLE,
    OPACITY,
];

pub(super) const POINTS_SCHEMA: &[AttrSpec] = &[AttrSpec::optional(
    "points",
    Caster::Points,
    "coordinates relative to the object",
)];

pub(super) const TEXT_SCHEMA: &[AttrSpec] = &[
    AttrSpec::defaulted("fontfamily", Caster::Str, "sans-serif", "font family used"),
    AttrSpec::defaulted("pixelsize", Caster::Int, "16", "size of font in pixels"),
    AttrSpec::defaulted("wrap", Caster::Bool, "false", "word wrap"),
    AttrSpec::defaulted("color", Caster::Str, "#000000", "color of text"),
    AttrSpec::defaulted("bold", Caster::Bool, "false", "bold"),
    AttrSpec::defaulted("italic", Caster::Bool, "false", "italic"),
    AttrSpec::defaulted("underline", Caster::Bool, "false", "underline"),
    AttrSpec::defaulted("strikeout", Caster::Bool, "false", "strikeout"),
    AttrSpec::defaulted("kerning", Caster::Bool, "false", "render kerning"),
    AttrSpec::defaulted("halign", Caster::Str, "left", "horizontal alignment in object"),
    AttrSpec::defaulted("valign", Caster::Str, "top", "vertical alignment in object"),
];

#[derive(Debug, Clone, Default)]
pub struct ObjectGroup {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub objects: Vec<Object>,
}

impl ObjectGroup {
    pub fn name(&self) -> Option<&str> {
        self.attributes.str("name")
    }
}

impl Element for ObjectGroup {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Object(object) => self.objects.push(object),
            other => return Err(unexpected("objectgroup", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("objects".to_string(), project_list(&self.objects));
    }
}

/// The geometry carried by an object beyond its rectangle.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    Ellipse,
    /// Points already translated into map space.
    Points { points: Vec<Point>, closed: bool },
}

#[derive(Debug, Clone, Default)]
pub struct Object {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub shape: Option<ObjectShape>,
}

impl Object {
    pub fn name(&self) -> Option<&str> {
        self.attributes.str("name")
    }

    pub fn position(&self) -> (f64, f64) {
        (
            self.attributes.float("x").unwrap_or(0.0),
            self.attributes.float("y").unwrap_or(0.0),
        )
    }

    /// Decoded tile reference, for tile objects.
    pub fn tile(&self) -> Option<Gid> {
        let raw = self.attributes.int("gid")?;
        u32::try_from(raw).ok().map(decode_gid)
    }

    pub fn is_ellipse(&self) -> bool {
        matches!(self.shape, Some(ObjectShape::Ellipse))
    }

    /// Map-space points of a polygon or polyline.
    pub fn points(&self) -> Option<&[Point]> {
        match &self.shape {
            Some(ObjectShape::Points { points, .. }) => Some(points),
            _ => None,
        }
    }

    /// `Some(true)` for polygons, `Some(false)` for polylines.
    pub fn closed(&self) -> Option<bool> {
        match &self.shape {
            Some(ObjectShape::Points { closed, .. }) => Some(*closed),
            _ => None,
        }
    }

    fn set_points(&mut self, relative: &[Point], closed: bool) {
        let (width, height) = bounds(relative);
        if self.attributes.float("width").is_none() {
            self.attributes.set("width", Some(Value::Float(width)));
        }
        if self.attributes.float("height").is_none() {
            self.attributes.set("height", Some(Value::Float(height)));
        }

        let (x, y) = self.position();
        self.attributes.set("closed", Some(Value::Bool(closed)));
        self.shape = Some(ObjectShape::Points {
            points: translate(relative, x, y),
            closed,
        });
    }
}

impl Element for Object {
    fn started(&mut self, _raw: &RawAttributes, _ctx: &ParseContext<'_>) -> Result<()> {
        match self.attributes.int("gid") {
            Some(gid) if u32::try_from(gid).is_err() => Err(GraphError::SchemaViolation {
                tag: "object".to_string(),
                attribute: "gid".to_string(),
                message: format!("{} does not fit in 32 bits", gid),
            }),
            _ => Ok(()),
        }
    }

    fn fold(&mut self, child: Node) -> Result<()> {
        if self.shape.is_some() || self.tile().is_some() {
            return Err(GraphError::UnsupportedFeature {
                feature: format!("<{}> on an object that already has a shape", child.kind().tag()),
                help: Some("An object carries at most one of ellipse, points or gid".to_string()),
            });
        }

        match child {
            Node::Ellipse(_) => self.shape = Some(ObjectShape::Ellipse),
            Node::Polygon(list) => self.set_points(list.points(), true),
            Node::Polyline(list) => self.set_points(list.points(), false),
            other => return Err(unexpected("object", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("ellipse".to_string(), JsonValue::Bool(self.is_ellipse()));
        let points = self
            .points()
            .map_or(JsonValue::Null, |p| Value::Points(p.to_vec()).to_json());
        out.insert("points".to_string(), points);
    }
}

/// Attribute-less marker children such as `<ellipse/>` and `<point/>`.
#[derive(Debug, Clone, Default)]
pub struct Marker {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Marker {}

/// `<polygon>` and `<polyline>`: points relative to the owning object.
#[derive(Debug, Clone, Default)]
pub struct PointList {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl PointList {
    pub fn points(&self) -> &[Point] {
        self.attributes.points("points").unwrap_or_default()
    }
}

impl Element for PointList {}

#[derive(Debug, Clone, Default)]
pub struct Text {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub content: String,
}

impl Element for Text {
    fn finish(&mut self, text: Option<&str>, _ctx: &ParseContext<'_>) -> Result<()> {
        self.content = text.unwrap_or_default().to_string();
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("content".to_string(), JsonValue::String(self.content.clone()));
    }
}

/// Root of a template document.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub tilesets: Vec<Tileset>,
    pub objects: Vec<Object>,
}

impl Element for Template {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Tileset(tileset) => self.tilesets.push(tileset),
            Node::Object(object) => self.objects.push(object),
            other => return Err(unexpected("template", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        out.insert("tilesets".to_string(), project_list(&self.tilesets));
        out.insert("objects".to_string(), project_list(&self.objects));
    }
}
