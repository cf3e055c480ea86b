use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{unexpected, Element, Node, Project, PropertyMap};
use crate::builder::ParseContext;
use crate::error::Result;
use crate::images::{ImageHandle, ImageRequest};
use crate::schema::{AttrSpec, Attributes, Caster, OPACITY, VISIBLE};

pub(super) const IMAGE_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("format", Caster::Str, "embedded image format"),
    AttrSpec::optional("source", Caster::Str, "path to the image file"),
    AttrSpec::optional("trans", Caster::Str, "colour key treated as transparent"),
    AttrSpec::optional("width", Caster::Int, "image width in pixels"),
    AttrSpec::optional("height", Caster::Int, "image height in pixels"),
];

pub(super) const IMAGE_LAYER_SCHEMA: &[AttrSpec] = &[
    AttrSpec::defaulted("name", Caster::Str, "ImageLayer", "name of layer"),
    AttrSpec::defaulted("offsetx", Caster::Int, "0", "horizontal draw offset"),
    AttrSpec::defaulted("offsety", Caster::Int, "0", "vertical draw offset"),
    VISIBLE,
    OPACITY,
];

/// An image reference; the loader is invoked once when it finishes.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub handle: Option<ImageHandle>,
}

impl Image {
    pub fn source(&self) -> Option<&str> {
        self.attributes.str("source")
    }

    pub fn trans(&self) -> Option<&str> {
        self.attributes.str("trans")
    }

    /// Declared size, else whatever the loader reported.
    pub fn size(&self) -> Option<(u32, u32)> {
        let declared = self
            .attributes
            .int("width")
            .zip(self.attributes.int("height"))
            .and_then(|(w, h)| Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?)));
        declared.or_else(|| self.handle.as_ref().and_then(ImageHandle::size))
    }
}

impl Element for Image {
    fn finish(&mut self, _text: Option<&str>, ctx: &ParseContext<'_>) -> Result<()> {
        if let Some(source) = self.source() {
            let request = ImageRequest::new(ctx.resolve_path(source))
                .with_colorkey(self.trans().map(str::to_string));
            self.handle = Some(ctx.load_image(&request)?);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageLayer {
    pub attributes: Attributes,
    pub properties: PropertyMap,
    pub image: Option<Image>,
}

impl Element for ImageLayer {
    fn fold(&mut self, child: Node) -> Result<()> {
        match child {
            Node::Image(image) => self.image = Some(image),
            other => return Err(unexpected("imagelayer", &other)),
        }
        Ok(())
    }

    fn project_into(&self, out: &mut JsonMap<String, JsonValue>) {
        let image = self
            .image
            .as_ref()
            .map_or(JsonValue::Null, Project::project_ref);
        out.insert("image".to_string(), image);
    }
}
