//! The document object model and the closed node registry.
//!
//! Every tag the builder understands maps to one [`NodeKind`] and one
//! typed struct wrapped in [`Node`]. How a parent folds a finished child
//! into itself is decided by [`composition`], a single table over
//! `(parent, child)` kinds; a pair missing from that table is a relation
//! this crate does not model.
//!
//! Node lifecycle, driven by [`crate::builder::GraphBuilder`]:
//!
//! 1. [`Node::new`] when the start event is seen
//! 2. [`Node::start`] coerces raw attributes against the type's schema
//! 3. [`Node::combine`] once per finished child
//! 4. [`Node::finish`] with the node's text once its end event is seen

mod image;
mod layer;
mod map;
mod object;
mod properties;
mod tileset;

use serde_json::Map as JsonMap;

use crate::builder::ParseContext;
use crate::error::{GraphError, Result};
use crate::schema::{coerce, Attributes, RawAttributes, Schema};

pub use image::{Image, ImageLayer};
pub use layer::{Chunk, Data, Group, Layer};
pub use map::{Map, MapLayer};
pub use object::{Marker, Object, ObjectGroup, ObjectShape, PointList, Template, Text};
pub use properties::{Properties, Property, PropertyMap};
pub use tileset::{Animation, Frame, Grid, Terrain, TerrainTypes, Tile, TileImage, TileOffset, Tileset};

/// How a parent folds a finished child into itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// Push onto a list.
    Append,
    /// Fill a singular slot.
    Assign,
    /// Merge the child's entries into the parent's properties.
    MergeProperties,
    /// Recognised relation that is deliberately not supported.
    Reject,
}

/// The composition rule for a `(parent, child)` pair, if one is modeled.
pub fn composition(parent: NodeKind, child: NodeKind) -> Option<Composition> {
    use Composition::*;
    use NodeKind as K;

    let rule = match (parent, child) {
        (_, K::Properties) if parent.accepts_properties() => MergeProperties,

        (K::Map, K::Tileset | K::Layer | K::ImageLayer | K::ObjectGroup) => Append,
        (K::Map, K::Group) => Reject,

        (K::Tileset, K::Image) => Assign,
        (K::Tileset, K::Tile) => Append,
        (K::Tileset, K::TileOffset | K::Grid | K::TerrainTypes) => Reject,

        (K::Tile, K::Image | K::Animation | K::ObjectGroup) => Reject,

        (K::Layer, K::Data) => Assign,
        (K::Data, K::Tile | K::Chunk) => Append,
        (K::Chunk, K::Tile) => Reject,

        (K::ImageLayer, K::Image) => Assign,
        (K::Image, K::Data) => Reject,

        (K::ObjectGroup, K::Object) => Append,
        (K::Object, K::Ellipse | K::Polygon | K::Polyline) => Assign,
        (K::Object, K::Text | K::Image) => Reject,

        (K::Properties, K::Property) => Append,
        (K::Animation, K::Frame) => Append,
        (K::Group, K::Layer | K::ImageLayer | K::ObjectGroup | K::Group) => Reject,
        (K::TerrainTypes, K::Terrain) => Append,
        (K::Template, K::Tileset | K::Object) => Append,

        _ => return None,
    };

    Some(rule)
}

/// Behaviour hooks implemented by each node type.
///
/// Attribute coercion, property merging and projection of attributes are
/// shared; types only override what is specific to them.
pub(crate) trait Element {
    /// Runs after schema coercion.
    fn started(&mut self, _raw: &RawAttributes, _ctx: &ParseContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Content-dependent finalization, exactly once.
    fn finish(&mut self, _text: Option<&str>, _ctx: &ParseContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Fold a child accepted by an `Append` or `Assign` rule.
    fn fold(&mut self, child: Node) -> Result<()> {
        Err(GraphError::unsupported(format!("<{}>", child.kind().tag())))
    }

    /// Add type-specific fields to the projection.
    fn project_into(&self, _out: &mut JsonMap<String, serde_json::Value>) {}
}

macro_rules! registry {
    ($($variant:ident($ty:ty) => $tag:literal, $schema:path;)*) => {
        /// Every node type the builder can construct.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($variant,)*
        }

        impl NodeKind {
            /// All registered kinds.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant,)*];

            /// Canonical (lowercase) tag name.
            pub fn tag(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => $tag,)*
                }
            }

            /// Declared attributes for this kind.
            pub fn schema(self) -> &'static Schema {
                match self {
                    $(NodeKind::$variant => $schema,)*
                }
            }
        }

        /// A node of the document graph.
        #[derive(Debug, Clone)]
        pub enum Node {
            $($variant($ty),)*
        }

        impl Node {
            /// Construct an empty node of the given kind.
            pub fn new(kind: NodeKind) -> Self {
                match kind {
                    $(NodeKind::$variant => Node::$variant(<$ty>::default()),)*
                }
            }

            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Node::$variant(_) => NodeKind::$variant,)*
                }
            }

            pub fn attributes(&self) -> &Attributes {
                match self {
                    $(Node::$variant(n) => &n.attributes,)*
                }
            }

            fn attributes_mut(&mut self) -> &mut Attributes {
                match self {
                    $(Node::$variant(n) => &mut n.attributes,)*
                }
            }

            pub fn properties(&self) -> &PropertyMap {
                match self {
                    $(Node::$variant(n) => &n.properties,)*
                }
            }

            fn properties_mut(&mut self) -> &mut PropertyMap {
                match self {
                    $(Node::$variant(n) => &mut n.properties,)*
                }
            }

            fn element(&self) -> &dyn Element {
                match self {
                    $(Node::$variant(n) => n,)*
                }
            }

            fn element_mut(&mut self) -> &mut dyn Element {
                match self {
                    $(Node::$variant(n) => n,)*
                }
            }
        }
    };
}

registry! {
    Map(Map) => "map", map::SCHEMA;
    Tileset(Tileset) => "tileset", tileset::TILESET_SCHEMA;
    Tile(Tile) => "tile", tileset::TILE_SCHEMA;
    Image(Image) => "image", image::IMAGE_SCHEMA;
    Layer(Layer) => "layer", layer::LAYER_SCHEMA;
    ImageLayer(ImageLayer) => "imagelayer", image::IMAGE_LAYER_SCHEMA;
    Data(Data) => "data", layer::DATA_SCHEMA;
    Chunk(Chunk) => "chunk", layer::CHUNK_SCHEMA;
    Group(Group) => "group", layer::GROUP_SCHEMA;
    ObjectGroup(ObjectGroup) => "objectgroup", object::OBJECT_GROUP_SCHEMA;
    Object(Object) => "object", object::OBJECT_SCHEMA;
    Ellipse(Marker) => "ellipse", object::NO_ATTRIBUTES;
    Point(Marker) => "point", object::NO_ATTRIBUTES;
    Polygon(PointList) => "polygon", object::POINTS_SCHEMA;
    Polyline(PointList) => "polyline", object::POINTS_SCHEMA;
    Text(Text) => "text", object::TEXT_SCHEMA;
    Template(Template) => "template", object::NO_ATTRIBUTES;
    Properties(Properties) => "properties", object::NO_ATTRIBUTES;
    Property(Property) => "property", properties::PROPERTY_SCHEMA;
    Animation(Animation) => "animation", object::NO_ATTRIBUTES;
    Frame(Frame) => "frame", tileset::FRAME_SCHEMA;
    TileOffset(TileOffset) => "tileoffset", tileset::TILE_OFFSET_SCHEMA;
    Grid(Grid) => "grid", tileset::GRID_SCHEMA;
    TerrainTypes(TerrainTypes) => "terraintypes", object::NO_ATTRIBUTES;
    Terrain(Terrain) => "terrain", tileset::TERRAIN_SCHEMA;
}

impl NodeKind {
    /// Resolve a tag name, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<NodeKind> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag().eq_ignore_ascii_case(tag))
    }

    /// Resolve a tag name or fail with `UnsupportedFeature(tag)`.
    pub fn resolve(tag: &str) -> Result<NodeKind> {
        Self::from_tag(tag).ok_or_else(|| GraphError::UnsupportedFeature {
            feature: tag.to_string(),
            help: Some(format!("<{}> is not a registered node type", tag)),
        })
    }

    /// Whether a `<properties>` child is merged into this kind.
    fn accepts_properties(self) -> bool {
        matches!(
            self,
            NodeKind::Map
                | NodeKind::Tileset
                | NodeKind::Tile
                | NodeKind::Layer
                | NodeKind::ImageLayer
                | NodeKind::Group
                | NodeKind::ObjectGroup
                | NodeKind::Object
                | NodeKind::Terrain
        )
    }
}

impl Node {
    /// Coerce raw attributes and run the type's start hook.
    pub fn start(&mut self, raw: &RawAttributes, ctx: &ParseContext<'_>) -> Result<()> {
        let kind = self.kind();
        *self.attributes_mut() = coerce(kind.tag(), kind.schema(), raw)?;
        self.element_mut().started(raw, ctx)
    }

    /// Finalize with the node's accumulated text.
    pub fn finish(&mut self, text: Option<&str>, ctx: &ParseContext<'_>) -> Result<()> {
        self.element_mut().finish(text, ctx)
    }

    /// Fold a finished child into this node.
    ///
    /// `child_tag` is the tag as written in the source, used for errors.
    pub fn combine(&mut self, child: Node, child_tag: &str) -> Result<()> {
        let parent_tag = self.kind().tag();
        let rule = composition(self.kind(), child.kind())
            .ok_or_else(|| GraphError::unsupported_relation(parent_tag, child_tag))?;

        match rule {
            Composition::Reject => Err(GraphError::unsupported_relation(parent_tag, child_tag)),
            Composition::MergeProperties => {
                let Node::Properties(properties) = child else {
                    return Err(GraphError::unsupported_relation(parent_tag, child_tag));
                };
                self.properties_mut().extend(properties.properties);
                Ok(())
            }
            Composition::Append | Composition::Assign => self.element_mut().fold(child),
        }
    }

    /// Generic nested projection: attributes, `properties`, then the
    /// type's relations.
    pub fn project(&self) -> serde_json::Value {
        project_fields(self.attributes(), self.properties(), self.element())
    }

    /// Unwrap a map root.
    pub fn into_map(self) -> Result<Map> {
        match self {
            Node::Map(map) => Ok(map),
            other => Err(GraphError::document(format!(
                "document root is <{}>, expected <map>",
                other.kind().tag()
            ))),
        }
    }
}

/// Error for a child that reached `fold` without a matching arm.
pub(crate) fn unexpected(parent: &str, child: &Node) -> GraphError {
    GraphError::unsupported_relation(parent, child.kind().tag())
}

fn project_fields(
    attributes: &Attributes,
    properties: &PropertyMap,
    element: &dyn Element,
) -> serde_json::Value {
    let mut out = attributes.to_json();
    let properties: JsonMap<String, serde_json::Value> = properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    out.insert("properties".to_string(), serde_json::Value::Object(properties));
    element.project_into(&mut out);
    serde_json::Value::Object(out)
}

/// Projection straight from a borrowed typed struct, without wrapping it
/// in a [`Node`].
pub(crate) trait Project {
    fn project_ref(&self) -> serde_json::Value;
}

macro_rules! borrowed_projection {
    ($($ty:ty),* $(,)?) => {
        $(impl Project for $ty {
            fn project_ref(&self) -> serde_json::Value {
                project_fields(&self.attributes, &self.properties, self)
            }
        })*
    };
}

borrowed_projection!(
    Map, Tileset, Tile, Image, Layer, ImageLayer, Data, Chunk, ObjectGroup, Object, Frame,
    Terrain,
);

/// Project a list of typed structs.
pub(crate) fn project_list<T: Project>(items: &[T]) -> serde_json::Value {
    serde_json::Value::Array(items.iter().map(Project::project_ref).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(NodeKind::from_tag("ObjectGroup"), Some(NodeKind::ObjectGroup));
        assert_eq!(NodeKind::from_tag("IMAGELAYER"), Some(NodeKind::ImageLayer));
        assert_eq!(NodeKind::from_tag("Map"), Some(NodeKind::Map));
    }

    #[test]
    fn test_resolve_unknown_tag() {
        let err = NodeKind::resolve("wangsets").unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedFeature { ref feature, .. } if feature == "wangsets"));
    }

    #[test]
    fn test_tags_are_unique() {
        for (i, a) in NodeKind::ALL.iter().enumerate() {
            for b in &NodeKind::ALL[i + 1..] {
                assert_ne!(a.tag(), b.tag());
            }
        }
    }

    #[test]
    fn test_new_node_round_trips_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(Node::new(*kind).kind(), *kind);
        }
    }

    #[test]
    fn test_composition_table() {
        use NodeKind as K;

        assert_eq!(composition(K::Map, K::Layer), Some(Composition::Append));
        assert_eq!(composition(K::Map, K::ImageLayer), Some(Composition::Append));
        assert_eq!(composition(K::Map, K::Group), Some(Composition::Reject));
        assert_eq!(composition(K::Layer, K::Data), Some(Composition::Assign));
        assert_eq!(composition(K::Tile, K::Animation), Some(Composition::Reject));
        assert_eq!(composition(K::Tile, K::Image), Some(Composition::Reject));
        assert_eq!(composition(K::Object, K::Text), Some(Composition::Reject));
        assert_eq!(composition(K::Object, K::Properties), Some(Composition::MergeProperties));
        assert_eq!(composition(K::Data, K::Properties), None);
        assert_eq!(composition(K::Object, K::Point), None);
        assert_eq!(composition(K::Layer, K::Map), None);
    }

    #[test]
    fn test_combine_unmodeled_relation() {
        let mut layer = Node::new(NodeKind::Layer);
        let err = layer.combine(Node::new(NodeKind::Frame), "frame").unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_combine_rejected_relation() {
        let mut map = Node::new(NodeKind::Map);
        let err = map.combine(Node::new(NodeKind::Group), "group").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported feature: <group> inside <map>");
    }

    #[test]
    fn test_merge_properties() {
        let mut props = Properties::default();
        props.properties.insert("speed".to_string(), 3i64.into());

        let mut layer = Node::new(NodeKind::Layer);
        layer.combine(Node::Properties(props), "properties").unwrap();
        assert_eq!(layer.properties().get("speed").and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn test_into_map_rejects_other_roots() {
        assert!(Node::new(NodeKind::Map).into_map().is_ok());
        assert!(matches!(
            Node::new(NodeKind::Tileset).into_map(),
            Err(GraphError::MalformedDocument { .. })
        ));
    }
}
