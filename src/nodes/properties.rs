use std::collections::BTreeMap;

use super::{unexpected, Element, Node};
use crate::builder::ParseContext;
use crate::error::{GraphError, Result};
use crate::schema::{AttrSpec, Attributes, Caster, RawAttributes, Value};

/// Typed user properties attached to a node.
pub type PropertyMap = BTreeMap<String, Value>;

pub(super) const PROPERTY_SCHEMA: &[AttrSpec] = &[
    AttrSpec::optional("type", Caster::Str, "type of the property"),
    AttrSpec::optional("name", Caster::Str, "name of property"),
    AttrSpec::optional("value", Caster::Str, "value, cast by type"),
];

/// A `<properties>` block. Its entries collect in `properties` and are
/// merged into the parent.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Element for Properties {
    fn fold(&mut self, child: Node) -> Result<()> {
        let property = match child {
            Node::Property(property) => property,
            other => return Err(unexpected("properties", &other)),
        };

        let name = property
            .name()
            .ok_or_else(|| GraphError::SchemaViolation {
                tag: "property".to_string(),
                attribute: "name".to_string(),
                message: "property has no name".to_string(),
            })?
            .to_string();
        let value = property
            .value()
            .cloned()
            .unwrap_or_else(|| Value::Str(String::new()));
        self.properties.insert(name, value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Property {
    pub attributes: Attributes,
    pub properties: PropertyMap,
}

impl Property {
    pub fn name(&self) -> Option<&str> {
        self.attributes.str("name")
    }

    pub fn value(&self) -> Option<&Value> {
        self.attributes.get("value")
    }

    fn cast(&self, raw: &str) -> Result<Value> {
        let caster = self
            .attributes
            .str("type")
            .and_then(Caster::for_property_type)
            .unwrap_or(Caster::Str);
        caster.cast(raw).map_err(|message| GraphError::SchemaViolation {
            tag: "property".to_string(),
            attribute: "value".to_string(),
            message,
        })
    }
}

impl Element for Property {
    fn started(&mut self, raw: &RawAttributes, _ctx: &ParseContext<'_>) -> Result<()> {
        if let Some(value) = raw.get("value") {
            let value = self.cast(value)?;
            self.attributes.set("value", Some(value));
        }
        Ok(())
    }

    /// Multi-line string values are written as text content.
    fn finish(&mut self, text: Option<&str>, _ctx: &ParseContext<'_>) -> Result<()> {
        if self.value().is_none() {
            if let Some(text) = text {
                let value = self.cast(text)?;
                self.attributes.set("value", Some(value));
            }
        }
        Ok(())
    }
}
