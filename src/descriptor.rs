//! Declarative description of a detection model's tunable parameters
//!
//! Hosts render configuration forms from a [`ConfigDescriptor`] and check
//! stored configuration against it before handing it to a model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// UI widget / value shape of one configuration component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    /// Number on a logarithmic slider, bounded by `min`/`max` properties
    LogSlider,
    /// One of the keys of the `options` property
    Enum,
    /// `{enabled, inclusive, value}` bound specification
    NumberBound,
    /// Plain boolean
    Switch,
}

/// One tunable parameter of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTemplate {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub default_value: Value,
    #[serde(default)]
    pub properties: Value,
}

impl ComponentTemplate {
    pub fn new(
        name: &str,
        title: &str,
        description: &str,
        kind: ComponentType,
        default_value: Value,
        properties: Value,
    ) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            kind,
            default_value,
            properties,
        }
    }

    /// Check a single configured value against this component
    fn check(&self, value: &Value) -> Result<(), String> {
        match self.kind {
            ComponentType::LogSlider => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("'{}' must be a number, got {}", self.name, value))?;
                let min = self.properties.get("min").and_then(Value::as_f64);
                let max = self.properties.get("max").and_then(Value::as_f64);
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(format!(
                        "'{}' = {} is outside [{}, {}]",
                        self.name,
                        n,
                        min.map_or("-inf".to_string(), |v| v.to_string()),
                        max.map_or("inf".to_string(), |v| v.to_string()),
                    ));
                }
                Ok(())
            }
            ComponentType::Enum => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("'{}' must be a string, got {}", self.name, value))?;
                let options = self.properties.get("options").and_then(Value::as_object);
                match options {
                    Some(options) if !options.contains_key(s) => Err(format!(
                        "'{}' = '{}' is not one of: {}",
                        self.name,
                        s,
                        options.keys().cloned().collect::<Vec<_>>().join(", ")
                    )),
                    _ => Ok(()),
                }
            }
            ComponentType::NumberBound => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| format!("'{}' must be an object, got {}", self.name, value))?;
                for flag in ["enabled", "inclusive"] {
                    if obj.get(flag).is_some_and(|v| !v.is_boolean()) {
                        return Err(format!("'{}.{}' must be a boolean", self.name, flag));
                    }
                }
                if obj.get("value").is_some_and(|v| !v.is_number()) {
                    return Err(format!("'{}.value' must be a number", self.name));
                }
                Ok(())
            }
            ComponentType::Switch => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be a boolean, got {}", self.name, value))
                }
            }
        }
    }
}

/// Configuration schema of one detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDescriptor {
    /// Model identifier
    pub name: String,
    pub title: String,
    pub description: String,
    pub components: Vec<ComponentTemplate>,
}

impl ConfigDescriptor {
    /// Default configuration object assembled from component defaults
    pub fn defaults(&self) -> Value {
        let map: Map<String, Value> = self
            .components
            .iter()
            .map(|c| (c.name.clone(), c.default_value.clone()))
            .collect();
        Value::Object(map)
    }

    /// Validate a stored configuration object
    ///
    /// Missing components are fine (the model falls back to defaults);
    /// unknown keys and mistyped or out-of-range values are rejected.
    pub fn validate(&self, config: &Value) -> Result<(), String> {
        let obj = match config {
            Value::Object(obj) => obj,
            Value::Null => return Ok(()),
            other => return Err(format!("configuration must be an object, got {}", other)),
        };

        for (key, value) in obj {
            let component = self
                .components
                .iter()
                .find(|c| &c.name == key)
                .ok_or_else(|| format!("unknown configuration key '{}' for {}", key, self.name))?;
            component.check(value)?;
        }

        Ok(())
    }
}

/// Shorthand for the `{enabled, inclusive, value}` default of a bound
pub(crate) fn disabled_bound() -> Value {
    json!({ "enabled": false, "inclusive": true, "value": 0 })
}
