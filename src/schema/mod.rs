//! Attribute schemas and coercion.
//!
//! Every node type declares an ordered list of [`AttrSpec`]s. When a node
//! starts, the raw string attributes from the event source are resolved
//! against that list:
//!
//! - a present raw value wins, otherwise the declared default is used;
//! - a resolved value is cast with the attribute's [`Caster`];
//! - raw attributes the schema does not mention are ignored.
//!
//! Defaults are written in their raw form and go through the same caster,
//! so a boolean default of `"true"` is stored as `Value::Bool(true)`.

mod value;

use std::collections::{BTreeMap, HashMap};

use crate::error::{GraphError, Result};
use crate::geometry::{parse_points, Point};

pub use value::Value;

/// Raw attributes exactly as the event source produced them.
pub type RawAttributes = HashMap<String, String>;

/// Conversion from a raw attribute string to a typed [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caster {
    Str,
    Int,
    Float,
    Bool,
    Points,
}

impl Caster {
    /// Cast a raw string. Errors carry a human-readable reason.
    pub fn cast(self, raw: &str) -> std::result::Result<Value, String> {
        match self {
            Caster::Str => Ok(Value::Str(raw.to_string())),
            Caster::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("'{}' is not an integer: {}", raw, e)),
            Caster::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("'{}' is not a number: {}", raw, e)),
            Caster::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("'{}' is not a boolean", raw)),
            Caster::Points => parse_points(raw)
                .map(Value::Points)
                .map_err(|e| e.to_string()),
        }
    }

    /// Caster for a property's declared `type`, if the type is known.
    ///
    /// Colours and file paths stay strings; object references are ids.
    pub fn for_property_type(name: &str) -> Option<Caster> {
        match name {
            "string" | "color" | "file" => Some(Caster::Str),
            "int" | "object" => Some(Caster::Int),
            "float" => Some(Caster::Float),
            "bool" => Some(Caster::Bool),
            _ => None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw == "1" || raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw == "0" || raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// What happens when a declared attribute is absent from the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Stored as absent.
    Absent,
    /// Raw default, cast like a present value.
    Default(&'static str),
    /// Absence is a schema violation.
    Required,
}

/// One declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub caster: Caster,
    pub fallback: Fallback,
    pub doc: &'static str,
}

impl AttrSpec {
    /// Optional attribute with no default.
    pub const fn optional(name: &'static str, caster: Caster, doc: &'static str) -> Self {
        Self {
            name,
            caster,
            fallback: Fallback::Absent,
            doc,
        }
    }

    /// Optional attribute with a raw default.
    pub const fn defaulted(
        name: &'static str,
        caster: Caster,
        default: &'static str,
        doc: &'static str,
    ) -> Self {
        Self {
            name,
            caster,
            fallback: Fallback::Default(default),
            doc,
        }
    }

    /// Attribute that must be present.
    pub const fn required(name: &'static str, caster: Caster, doc: &'static str) -> Self {
        Self {
            name,
            caster,
            fallback: Fallback::Required,
            doc,
        }
    }
}

/// A node type's declared attributes, in declaration order.
pub type Schema = [AttrSpec];

/// Shared declarations used by several node types.
pub const VISIBLE: AttrSpec = AttrSpec::defaulted("visible", Caster::Bool, "true", "visible, or not");
pub const OPACITY: AttrSpec = AttrSpec::defaulted("opacity", Caster::Float, "1.0", "opacity");
pub const COLOR: AttrSpec = AttrSpec::optional("color", Caster::Str, "color of the thing");

/// Fully coerced attributes of one node.
///
/// Every declared attribute has an entry; `None` records a declared
/// attribute that resolved to absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, Option<Value>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(|v| v.as_ref())
    }

    /// Whether `name` was declared (present or absent).
    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn points(&self, name: &str) -> Option<&[Point]> {
        self.get(name).and_then(Value::as_points)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.values.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Project into a JSON object; absent values become `null`.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.values
            .iter()
            .map(|(k, v)| {
                let json = v.as_ref().map_or(serde_json::Value::Null, Value::to_json);
                (k.clone(), json)
            })
            .collect()
    }
}

/// Resolve raw attributes against a schema.
///
/// `tag` is only used to give errors context.
pub fn coerce(tag: &str, schema: &Schema, raw: &RawAttributes) -> Result<Attributes> {
    let mut attributes = Attributes::new();

    for spec in schema {
        let resolved = match (raw.get(spec.name), spec.fallback) {
            (Some(value), _) => Some(value.as_str()),
            (None, Fallback::Default(default)) => Some(default),
            (None, Fallback::Absent) => None,
            (None, Fallback::Required) => {
                return Err(GraphError::SchemaViolation {
                    tag: tag.to_string(),
                    attribute: spec.name.to_string(),
                    message: "required attribute is missing".to_string(),
                });
            }
        };

        let value = match resolved {
            Some(text) => Some(spec.caster.cast(text).map_err(|message| {
                GraphError::SchemaViolation {
                    tag: tag.to_string(),
                    attribute: spec.name.to_string(),
                    message,
                }
            })?),
            None => None,
        };

        attributes.set(spec.name, value);
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[AttrSpec] = &[
        AttrSpec::optional("name", Caster::Str, "name"),
        AttrSpec::optional("width", Caster::Int, "width"),
        AttrSpec::defaulted("offsetx", Caster::Int, "0", "offset"),
        VISIBLE,
        OPACITY,
    ];

    fn raw(pairs: &[(&str, &str)]) -> RawAttributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_typed() {
        let attrs = coerce("layer", SCHEMA, &raw(&[])).unwrap();

        assert_eq!(attrs.get("visible"), Some(&Value::Bool(true)));
        assert_eq!(attrs.get("opacity"), Some(&Value::Float(1.0)));
        assert_eq!(attrs.get("offsetx"), Some(&Value::Int(0)));
        assert_eq!(attrs.get("name"), None);
        assert!(attrs.is_declared("name"));
        assert_eq!(attrs.len(), 5);
    }

    #[test]
    fn test_raw_values_are_cast() {
        let attrs = coerce(
            "layer",
            SCHEMA,
            &raw(&[("name", "Ground"), ("width", "40"), ("visible", "0"), ("opacity", "0.5")]),
        )
        .unwrap();

        assert_eq!(attrs.str("name"), Some("Ground"));
        assert_eq!(attrs.int("width"), Some(40));
        assert_eq!(attrs.bool("visible"), Some(false));
        assert_eq!(attrs.float("opacity"), Some(0.5));
    }

    #[test]
    fn test_unknown_attributes_are_ignored() {
        let attrs = coerce("layer", SCHEMA, &raw(&[("locked", "1"), ("tintcolor", "#fff")])).unwrap();
        assert!(!attrs.is_declared("locked"));
        assert!(!attrs.is_declared("tintcolor"));
    }

    #[test]
    fn test_cast_failure_is_schema_violation() {
        let err = coerce("layer", SCHEMA, &raw(&[("width", "wide")])).unwrap_err();
        assert!(matches!(
            err,
            GraphError::SchemaViolation { ref tag, ref attribute, .. }
                if tag == "layer" && attribute == "width"
        ));
    }

    #[test]
    fn test_required_attribute_missing() {
        const STRICT: &[AttrSpec] = &[AttrSpec::required("id", Caster::Int, "id")];
        let err = coerce("frame", STRICT, &raw(&[])).unwrap_err();
        assert!(matches!(err, GraphError::SchemaViolation { ref attribute, .. } if attribute == "id"));
    }

    #[test]
    fn test_bool_caster_forms() {
        assert_eq!(Caster::Bool.cast("True"), Ok(Value::Bool(true)));
        assert_eq!(Caster::Bool.cast("1"), Ok(Value::Bool(true)));
        assert_eq!(Caster::Bool.cast("false"), Ok(Value::Bool(false)));
        assert!(Caster::Bool.cast("yes").is_err());
    }

    #[test]
    fn test_points_caster() {
        let value = Caster::Points.cast("0,0 1,1").unwrap();
        assert_eq!(value.as_points().map(|p| p.len()), Some(2));
        assert!(Caster::Points.cast("0,0 1").is_err());
    }

    #[test]
    fn test_property_type_table() {
        assert_eq!(Caster::for_property_type("int"), Some(Caster::Int));
        assert_eq!(Caster::for_property_type("color"), Some(Caster::Str));
        assert_eq!(Caster::for_property_type("object"), Some(Caster::Int));
        assert_eq!(Caster::for_property_type("class"), None);
    }

    #[test]
    fn test_to_json_includes_absent_as_null() {
        let attrs = coerce("layer", SCHEMA, &raw(&[("width", "3")])).unwrap();
        let json = attrs.to_json();
        assert_eq!(json["width"], serde_json::json!(3));
        assert_eq!(json["name"], serde_json::Value::Null);
    }
}
