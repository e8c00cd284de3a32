use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a custom attribute on an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Truthiness the way attribute checks read it: `false`, `0`, `0.0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Bool(value) => *value,
            PropertyValue::Int(value) => *value != 0,
            PropertyValue::Float(value) => *value != 0.0,
            PropertyValue::String(value) => !value.is_empty(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::Int(value) => write!(f, "{value}"),
            PropertyValue::Float(value) => write!(f, "{value}"),
            PropertyValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

/// Declaration of a document-scoped property group: its key and the JSON object used when the
/// document has no stored value yet.
#[derive(Debug, Clone)]
pub struct PropertyGroupDef {
    pub name: &'static str,
    pub defaults: Value,
}

impl PropertyGroupDef {
    pub fn new<T: Serialize + Default>(name: &'static str) -> Result<Self> {
        let defaults = serde_json::to_value(T::default())
            .with_context(|| format!("serializing defaults for property group '{name}'"))?;
        if !defaults.is_object() {
            bail!("property group '{name}' must serialize to a JSON object");
        }
        Ok(Self { name, defaults })
    }
}

/// Document-scoped property groups, stored as JSON objects so they persist with the scene file
/// whether or not the plugin that declared them is currently registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyStore {
    groups: BTreeMap<String, Value>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self { groups: BTreeMap::new() }
    }

    /// Inserts the group's defaults unless a value is already stored. Fields missing from a stored
    /// value are filled from the defaults.
    pub fn ensure_group(&mut self, def: &PropertyGroupDef) {
        let entry = self.groups.entry(def.name.to_string()).or_insert_with(|| def.defaults.clone());
        if !entry.is_object() {
            *entry = def.defaults.clone();
            return;
        }
        if let (Some(stored), Some(defaults)) = (entry.as_object_mut(), def.defaults.as_object()) {
            for (field, value) in defaults {
                stored.entry(field.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn raw(&self, group: &str) -> Option<&Value> {
        self.groups.get(group)
    }

    pub fn get<T: DeserializeOwned>(&self, group: &str) -> Result<T> {
        let value = self.groups.get(group).ok_or_else(|| anyhow!("property group '{group}' not registered"))?;
        serde_json::from_value(value.clone()).with_context(|| format!("decoding property group '{group}'"))
    }

    pub fn set<T: Serialize>(&mut self, group: &str, value: &T) -> Result<()> {
        let encoded =
            serde_json::to_value(value).with_context(|| format!("encoding property group '{group}'"))?;
        if !encoded.is_object() {
            bail!("property group '{group}' must serialize to a JSON object");
        }
        self.groups.insert(group.to_string(), encoded);
        Ok(())
    }

    pub fn set_field(&mut self, group: &str, field: &str, value: Value) -> Result<()> {
        let stored = self
            .groups
            .get_mut(group)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| anyhow!("property group '{group}' not registered"))?;
        if !stored.contains_key(field) {
            bail!("property group '{group}' has no field '{field}'");
        }
        stored.insert(field.to_string(), value);
        Ok(())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.groups.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn insert_raw(&mut self, group: String, value: Value) {
        let value = if value.is_object() { value } else { Value::Object(Map::new()) };
        self.groups.insert(group, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        path: String,
        count: u32,
    }

    #[test]
    fn ensure_group_keeps_stored_values() {
        let def = PropertyGroupDef::new::<Sample>("sample").expect("def");
        let mut store = PropertyStore::new();
        store.insert_raw("sample".to_string(), json!({ "path": "//points.json" }));
        store.ensure_group(&def);
        let sample: Sample = store.get("sample").expect("decode");
        assert_eq!(sample, Sample { path: "//points.json".to_string(), count: 0 });
    }

    #[test]
    fn set_field_rejects_unknown_fields() {
        let def = PropertyGroupDef::new::<Sample>("sample").expect("def");
        let mut store = PropertyStore::new();
        store.ensure_group(&def);
        store.set_field("sample", "count", json!(3)).expect("known field");
        assert!(store.set_field("sample", "colour", json!("red")).is_err());
        assert!(store.set_field("other", "count", json!(1)).is_err());
        assert_eq!(store.get::<Sample>("sample").expect("decode").count, 3);
    }

    #[test]
    fn truthiness_matches_attribute_checks() {
        assert!(PropertyValue::Bool(true).is_truthy());
        assert!(!PropertyValue::Int(0).is_truthy());
        assert!(PropertyValue::String("yes".into()).is_truthy());
        assert!(!PropertyValue::Float(0.0).is_truthy());
    }
}
