//! Model descriptors
//!
//! A model is a named, namespaced record type with a flat ordered property
//! mapping. Descriptors arrive from an external manifest loader as
//! [`ModelDef`] values; [`Model::from_ancestry`] merges a base-to-derived
//! chain of them into the single flat mapping the storage engine works with,
//! so no hierarchy walk happens at runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StrataError};
use crate::record::Payload;
use crate::refs::ref_id_value;

/// Scalar property value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
}

/// Closed set of property kinds.
///
/// Resolved once when the descriptor is built; per-row behavior dispatches
/// on this enum rather than on schema metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Plain scalar value stored as-is in the row document.
    Scalar(ScalarKind),
    /// Reference to another model; the stored value is the referenced
    /// row's 40-character id.
    Ref { model: String },
    /// Nested mapping or sequence, stored verbatim as JSON.
    Composite,
}

/// One property spec of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl Property {
    pub fn scalar(name: &str, kind: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Scalar(kind),
            required: false,
            default: None,
        }
    }

    pub fn reference(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Ref {
                model: model.to_string(),
            },
            required: false,
            default: None,
        }
    }

    pub fn composite(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Composite,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Referenced model name, if this is a reference property.
    pub fn ref_model(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Ref { model } => Some(model),
            _ => None,
        }
    }
}

/// Raw model descriptor, as produced by the manifest loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    pub namespace: String,
    pub properties: Vec<Property>,
}

impl ModelDef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }
}

/// A fully built model: flat ordered property mapping plus a name index.
///
/// Immutable for the lifetime of the engine.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    namespace: String,
    properties: Vec<Property>,
    index: HashMap<String, usize>,
}

impl Model {
    /// Build a model from a single descriptor.
    pub fn build(def: ModelDef) -> Result<Self> {
        Self::from_ancestry(&[def])
    }

    /// Merge a base-to-derived chain of descriptors into one model.
    ///
    /// Later descriptors override earlier ones property-by-property; an
    /// overridden property keeps its original position in the mapping.
    /// Name and namespace come from the most derived descriptor.
    pub fn from_ancestry(ancestry: &[ModelDef]) -> Result<Self> {
        let derived = ancestry
            .last()
            .ok_or_else(|| StrataError::Config("model ancestry is empty".to_string()))?;

        let mut properties: Vec<Property> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for def in ancestry {
            for property in &def.properties {
                if !valid_ident(&property.name) {
                    return Err(StrataError::Config(format!(
                        "invalid property name '{}' on model '{}'",
                        property.name, def.name,
                    )));
                }
                match index.get(&property.name) {
                    Some(&at) => properties[at] = property.clone(),
                    None => {
                        index.insert(property.name.clone(), properties.len());
                        properties.push(property.clone());
                    }
                }
            }
        }

        Ok(Self {
            name: derived.name.clone(),
            namespace: derived.namespace.clone(),
            properties,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Declared properties, in mapping order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.index.get(name).map(|&at| &self.properties[at])
    }

    /// Apply declared defaults, check required values, reject undeclared keys.
    ///
    /// The `id` key passes through untouched; everything else must name a
    /// declared property. Used on source payloads before they are pushed.
    pub fn normalize_payload(&self, mut payload: Payload) -> Result<Payload> {
        for key in payload.keys() {
            if key != "id" && self.property(key).is_none() {
                return Err(StrataError::Config(format!(
                    "unknown property '{}' for model '{}'",
                    key, self.name,
                )));
            }
        }
        for property in &self.properties {
            if payload.contains_key(&property.name) {
                continue;
            }
            if let Some(default) = &property.default {
                payload.insert(property.name.clone(), default.clone());
            } else if property.required {
                return Err(StrataError::Config(format!(
                    "property '{}' is required for model '{}'",
                    property.name, self.name,
                )));
            }
        }
        Ok(payload)
    }

    /// Replace reference property values with their derived storage keys.
    ///
    /// Expects source-form identifiers; values already holding storage keys
    /// must not pass through here a second time.
    pub fn link_refs(&self, mut payload: Payload) -> Result<Payload> {
        for property in &self.properties {
            if property.ref_model().is_none() {
                continue;
            }
            if let Some(value) = payload.get(&property.name) {
                if !value.is_null() {
                    let key = ref_id_value(value)?;
                    payload.insert(property.name.clone(), Value::String(key));
                }
            }
        }
        Ok(payload)
    }
}

fn valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_ancestry_merge_overrides_in_place() {
        let base = ModelDef::new("gov", "base")
            .property(Property::scalar("code", ScalarKind::String))
            .property(Property::scalar("title", ScalarKind::String));
        let derived = ModelDef::new("gov", "country")
            .property(Property::scalar("code", ScalarKind::Integer))
            .property(Property::scalar("area", ScalarKind::Number));

        let model = Model::from_ancestry(&[base, derived]).unwrap();

        let names: Vec<&str> = model.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["code", "title", "area"]);
        assert_eq!(
            model.property("code").unwrap().kind,
            PropertyKind::Scalar(ScalarKind::Integer),
        );
    }

    #[test]
    fn test_empty_ancestry_is_config_error() {
        let err = Model::from_ancestry(&[]).unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_invalid_property_name_rejected() {
        let def = ModelDef::new("gov", "country")
            .property(Property::scalar("bad name", ScalarKind::String));
        let err = Model::build(def).unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_normalize_applies_defaults_and_checks_required() {
        let model = Model::build(
            ModelDef::new("gov", "country")
                .property(Property::scalar("title", ScalarKind::String).required())
                .property(Property::scalar("continent", ScalarKind::String).with_default(json!("unknown"))),
        )
        .unwrap();

        let out = model
            .normalize_payload(payload(json!({"id": "lt", "title": "Lithuania"})))
            .unwrap();
        assert_eq!(out["continent"], json!("unknown"));

        let err = model
            .normalize_payload(payload(json!({"id": "lt"})))
            .unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_normalize_rejects_undeclared_keys() {
        let model = Model::build(
            ModelDef::new("gov", "country").property(Property::scalar("title", ScalarKind::String)),
        )
        .unwrap();

        let err = model
            .normalize_payload(payload(json!({"id": "lt", "population": 1})))
            .unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_link_refs_hashes_reference_values() {
        let model = Model::build(
            ModelDef::new("gov", "capital")
                .property(Property::scalar("title", ScalarKind::String))
                .property(Property::reference("country", "country")),
        )
        .unwrap();

        let out = model
            .link_refs(payload(json!({"title": "Vilnius", "country": "lt"})))
            .unwrap();
        let key = out["country"].as_str().unwrap();
        assert_eq!(key.len(), 40);
        assert_eq!(key, crate::refs::ref_id("lt"));
        // Non-reference values stay untouched.
        assert_eq!(out["title"], json!("Vilnius"));
    }
}
